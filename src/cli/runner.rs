//! CLI runner - assembles and runs the exporter

use crate::cli::commands::Cli;
use crate::config::ExporterConfig;
use crate::engine::{ExportStats, Exporter};
use crate::error::Result;
use crate::output::RecordEmitter;
use crate::types::now_millis;
use std::sync::Arc;
use tracing::{debug, info};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run one export
    pub async fn run(&self) -> Result<ExportStats> {
        let config = self.load_config()?;
        config.validate()?;

        info!(
            source = %config.source,
            endpoint = %config.endpoint,
            checkpoint = %config.checkpoint_path.display(),
            "Starting export"
        );

        let exporter = Self::build_exporter(&config, config.emitter())?;
        exporter.run(now_millis()).await
    }

    /// Load the config file, if any, and apply command-line overrides
    pub fn load_config(&self) -> Result<ExporterConfig> {
        let mut config = match &self.cli.config {
            Some(path) => {
                debug!(path = %path.display(), "Loading config file");
                ExporterConfig::load(path)?
            }
            None => ExporterConfig::default(),
        };

        self.apply_overrides(&mut config);
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut ExporterConfig) {
        let cli = &self.cli;

        if let Some(source) = cli.source {
            config.source = source.into();
        }
        if let Some(endpoint) = &cli.endpoint {
            config.endpoint.clone_from(endpoint);
        }
        if let Some(email) = &cli.email {
            config.credentials.email = Some(email.clone());
        }
        if let Some(token) = &cli.api_token {
            config.credentials.api_token = Some(token.clone());
        }
        if let Some(token) = &cli.bearer_token {
            config.credentials.bearer_token = Some(token.clone());
        }
        if let Some(org_id) = &cli.org_id {
            config.org_id = Some(org_id.clone());
        }
        if let Some(filter) = &cli.filter {
            config.filter.clone_from(filter);
        }
        if let Some(page_size) = cli.page_size {
            config.page_size = page_size;
        }
        if let Some(sleep_ms) = cli.sleep_ms {
            config.sleep_ms = sleep_ms;
        }
        if let Some(secs) = cli.throttle_fallback_secs {
            config.throttle_fallback_secs = secs;
        }
        if let Some(secs) = cli.max_throttle_delay_secs {
            config.max_throttle_delay_secs = Some(secs);
        }
        if let Some(max) = cli.max_throttles {
            config.max_throttles = Some(max);
        }
        if let Some(days) = cli.lookback_days {
            config.lookback_days = days;
        }
        if let Some(from) = cli.from {
            config.from = Some(from);
        }
        if let Some(state) = &cli.state {
            config.checkpoint_path.clone_from(state);
        }
        if let Some(output) = cli.output {
            config.output = output.into();
        }
    }

    /// Wire an exporter for `config` writing to `emitter`
    pub fn build_exporter(
        config: &ExporterConfig,
        emitter: Arc<dyn RecordEmitter>,
    ) -> Result<Exporter> {
        Ok(Exporter::new(
            config.fetcher()?,
            emitter,
            config.checkpoint_store(),
            config.pagination_style(),
        )
        .with_settings(config.settings())
        .with_backoff(config.backoff()))
    }
}
