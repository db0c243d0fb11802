//! CLI arguments

use crate::config::SourceKind;
use crate::types::{parse_timestamp, OutputFormat, Timestamp};
use clap::Parser;
use std::path::PathBuf;

/// Incremental exporter for Atlassian audit logs
#[derive(Parser, Debug, Default)]
#[command(name = "audit-export")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML); flags and environment override it
    #[arg(short, long, env = "AUDIT_EXPORT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Audit API to export from
    #[arg(long, env = "AUDIT_EXPORT_SOURCE")]
    pub source: Option<SourceArg>,

    /// API base URL
    #[arg(long = "endpoint", alias = "jira-api-endpoint", env = "JIRA_API_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Account email for basic auth
    #[arg(long = "email", alias = "jira-api-email", env = "JIRA_API_EMAIL")]
    pub email: Option<String>,

    /// API token for basic auth
    #[arg(
        long = "api-token",
        alias = "jira-api-token",
        env = "JIRA_API_TOKEN",
        hide_env_values = true
    )]
    pub api_token: Option<String>,

    /// Organization API key (bearer auth)
    #[arg(long, env = "ATLASSIAN_API_KEY", hide_env_values = true)]
    pub bearer_token: Option<String>,

    /// Organization id (admin events only)
    #[arg(long, env = "ATLASSIAN_ORG_ID")]
    pub org_id: Option<String>,

    /// Free-text filter passed to the API
    #[arg(long)]
    pub filter: Option<String>,

    /// Records per page (jira_audit only)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Pause between pages in milliseconds
    #[arg(long)]
    pub sleep_ms: Option<u64>,

    /// Wait after a throttle without Retry-After, in seconds
    #[arg(long)]
    pub throttle_fallback_secs: Option<u64>,

    /// Ceiling on a single throttle wait, in seconds
    #[arg(long)]
    pub max_throttle_delay_secs: Option<u64>,

    /// Give up after this many consecutive throttles
    #[arg(long)]
    pub max_throttles: Option<u32>,

    /// First-run lookback in days
    #[arg(long)]
    pub lookback_days: Option<u32>,

    /// Start the window here instead of at the stored checkpoint
    #[arg(long, value_parser = parse_from)]
    pub from: Option<Timestamp>,

    /// Checkpoint file
    #[arg(short, long, env = "AUDIT_EXPORT_STATE")]
    pub state: Option<PathBuf>,

    /// Record output format
    #[arg(short, long)]
    pub output: Option<FormatArg>,

    /// Log format
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

fn parse_from(raw: &str) -> std::result::Result<Timestamp, String> {
    parse_timestamp(raw).ok_or_else(|| format!("'{raw}' is not an RFC 3339 timestamp"))
}

/// Audit API
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceArg {
    /// Jira audit records
    JiraAudit,
    /// Organization admin events
    AdminEvents,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::JiraAudit => SourceKind::JiraAudit,
            SourceArg::AdminEvents => SourceKind::AdminEvents,
        }
    }
}

/// Record output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FormatArg {
    /// One log event per record
    Log,
    /// One JSON object per line on stdout
    JsonLines,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Log => OutputFormat::Log,
            FormatArg::JsonLines => OutputFormat::JsonLines,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}
