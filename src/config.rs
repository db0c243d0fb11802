//! Exporter configuration
//!
//! Settings for one export source, loadable from YAML and overridable from
//! the command line.
//!
//! ```yaml
//! source: jira_audit
//! endpoint: https://example.atlassian.net
//! credentials:
//!   email: me@example.com
//!   api_token: secret
//! page_size: 1000
//! checkpoint_path: audit_state.json
//! ```

use crate::engine::{ExportSettings, DEFAULT_LOOKBACK_DAYS, DEFAULT_PAGE_SIZE};
use crate::error::{Error, Result};
use crate::http::{
    AdminEventsFetcher, BackoffPolicy, Credentials, HttpClient, HttpClientConfig,
    JiraAuditFetcher, PageFetcher,
};
use crate::output::{JsonLinesEmitter, LogEmitter, RecordEmitter};
use crate::pagination::PaginationStyle;
use crate::state::CheckpointStore;
use crate::types::{OutputFormat, Timestamp};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default checkpoint file name
pub const DEFAULT_CHECKPOINT_PATH: &str = "audit_state.json";

// ============================================================================
// Source Kind
// ============================================================================

/// Which audit API to export from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Jira audit records, offset pagination
    #[default]
    JiraAudit,
    /// Organization admin events, cursor pagination
    AdminEvents,
}

impl SourceKind {
    /// Pagination style spoken by this API
    pub fn pagination_style(self) -> PaginationStyle {
        match self {
            SourceKind::JiraAudit => PaginationStyle::Offset,
            SourceKind::AdminEvents => PaginationStyle::Cursor,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::JiraAudit => write!(f, "jira_audit"),
            SourceKind::AdminEvents => write!(f, "admin_events"),
        }
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Credential fields as written in the config file
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Account email (basic auth username)
    #[serde(default)]
    pub email: Option<String>,

    /// API token (basic auth password)
    #[serde(default)]
    pub api_token: Option<String>,

    /// Organization API key (bearer token)
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("email", &self.email)
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl CredentialsConfig {
    /// Resolve to request credentials.
    ///
    /// A bearer token wins over basic credentials; basic auth needs both
    /// the email and the token.
    pub fn resolve(&self) -> Result<Credentials> {
        if let Some(token) = non_empty(&self.bearer_token) {
            return Ok(Credentials::Bearer {
                token: token.to_string(),
            });
        }

        match (non_empty(&self.email), non_empty(&self.api_token)) {
            (Some(email), Some(token)) => Ok(Credentials::Basic {
                username: email.to_string(),
                password: token.to_string(),
            }),
            (None, _) if self.api_token.is_some() => Err(Error::missing_field("credentials.email")),
            (Some(_), None) => Err(Error::missing_field("credentials.api_token")),
            _ => Err(Error::missing_field("credentials")),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

// ============================================================================
// Exporter Config
// ============================================================================

/// Complete exporter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// API to export from
    #[serde(default)]
    pub source: SourceKind,

    /// Base URL of the API (e.g. `https://example.atlassian.net`)
    #[serde(default)]
    pub endpoint: String,

    /// Organization id, required for admin events
    #[serde(default)]
    pub org_id: Option<String>,

    /// Authentication
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Free-text filter passed to the API
    #[serde(default)]
    pub filter: String,

    /// Records per page (Jira audit only; the admin API sizes its own pages)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Pause between successful pages, in milliseconds
    #[serde(default = "default_sleep_ms")]
    pub sleep_ms: u64,

    /// Wait after a throttle without `Retry-After`, in seconds
    #[serde(default = "default_throttle_fallback_secs")]
    pub throttle_fallback_secs: u64,

    /// Ceiling on any single throttle wait, in seconds
    #[serde(default)]
    pub max_throttle_delay_secs: Option<u64>,

    /// Consecutive throttles tolerated on one page before giving up
    #[serde(default)]
    pub max_throttles: Option<u32>,

    /// How far back the very first run reaches, in days
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Explicit window start; ignores the stored checkpoint
    #[serde(default)]
    pub from: Option<Timestamp>,

    /// Checkpoint file
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: PathBuf,

    /// Record output
    #[serde(default)]
    pub output: OutputFormat,

    /// HTTP request timeout, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_sleep_ms() -> u64 {
    200
}

fn default_throttle_fallback_secs() -> u64 {
    50
}

fn default_lookback_days() -> u32 {
    DEFAULT_LOOKBACK_DAYS as u32
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from(DEFAULT_CHECKPOINT_PATH)
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            endpoint: String::new(),
            org_id: None,
            credentials: CredentialsConfig::default(),
            filter: String::new(),
            page_size: default_page_size(),
            sleep_ms: default_sleep_ms(),
            throttle_fallback_secs: default_throttle_fallback_secs(),
            max_throttle_delay_secs: None,
            max_throttles: None,
            lookback_days: default_lookback_days(),
            from: None,
            checkpoint_path: default_checkpoint_path(),
            output: OutputFormat::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ExporterConfig {
    /// Parse a config from YAML. Does not validate.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a config file. Does not validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Check that the config describes a runnable export
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::missing_field("endpoint"));
        }
        url::Url::parse(&self.endpoint)
            .map_err(|e| Error::invalid_value("endpoint", e.to_string()))?;

        self.credentials.resolve()?;

        if self.page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be greater than 0"));
        }

        if self.source == SourceKind::AdminEvents && non_empty(&self.org_id).is_none() {
            return Err(Error::missing_field("org_id"));
        }

        if self.timeout_secs == 0 {
            return Err(Error::invalid_value("timeout_secs", "must be greater than 0"));
        }

        Ok(())
    }

    /// Pagination style of the configured source
    pub fn pagination_style(&self) -> PaginationStyle {
        self.source.pagination_style()
    }

    /// Build the HTTP client
    pub fn http_client(&self) -> Result<HttpClient> {
        let config = HttpClientConfig::new(self.endpoint.trim_end_matches('/'))
            .timeout(Duration::from_secs(self.timeout_secs))
            .credentials(self.credentials.resolve()?);
        HttpClient::with_config(config)
    }

    /// Build the page fetcher for the configured source
    pub fn fetcher(&self) -> Result<Arc<dyn PageFetcher>> {
        let client = self.http_client()?;
        let fetcher: Arc<dyn PageFetcher> = match self.source {
            SourceKind::JiraAudit => Arc::new(JiraAuditFetcher::new(client)),
            SourceKind::AdminEvents => {
                let org_id =
                    non_empty(&self.org_id).ok_or_else(|| Error::missing_field("org_id"))?;
                Arc::new(AdminEventsFetcher::new(client, org_id))
            }
        };
        Ok(fetcher)
    }

    /// Throttle and pacing policy
    pub fn backoff(&self) -> BackoffPolicy {
        let mut policy = BackoffPolicy::new()
            .fallback(Duration::from_secs(self.throttle_fallback_secs))
            .inter_page_delay(Duration::from_millis(self.sleep_ms));
        if let Some(max) = self.max_throttle_delay_secs {
            policy = policy.max_delay(Duration::from_secs(max));
        }
        if let Some(max) = self.max_throttles {
            policy = policy.max_throttles(max);
        }
        policy
    }

    /// Run settings for the driver
    pub fn settings(&self) -> ExportSettings {
        let mut settings = ExportSettings::new()
            .with_page_size(self.page_size)
            .with_filter(self.filter.clone())
            .with_lookback(chrono::Duration::days(i64::from(self.lookback_days)));
        if let Some(from) = self.from {
            settings = settings.with_from(from);
        }
        settings
    }

    /// Checkpoint store at the configured path
    pub fn checkpoint_store(&self) -> CheckpointStore {
        CheckpointStore::new(&self.checkpoint_path)
    }

    /// Record sink for the configured output format
    pub fn emitter(&self) -> Arc<dyn RecordEmitter> {
        match self.output {
            OutputFormat::Log => Arc::new(LogEmitter::new()),
            OutputFormat::JsonLines => Arc::new(JsonLinesEmitter::stdout()),
        }
    }
}
