use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use crate::config::{Config, DEFAULT_CONFIG_PATH, UpdatePolicy};
use crate::dns::cloudflare::Cloudflare;
use crate::error::ReconcileResult;
use crate::reconcile::Reconciler;
use crate::report::ReconcileReport;

#[derive(Parser, Debug)]
#[command(name = "tunnel-dns", version)]
#[command(about = "Point every configured subdomain at a tunnel via Cloudflare CNAME records")]
pub struct Cli {
    /// Desired-state file
    #[arg(long, short, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Look up records but make no changes
    #[arg(long)]
    pub dry_run: bool,

    /// Skip updates for records that already match
    #[arg(long)]
    pub diff_aware: bool,

    /// Zones to reconcile at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Load the config file and apply command-line overrides.
    pub fn load_config(&self) -> ReconcileResult<Config> {
        let mut config = Config::load(&self.config)?;
        if self.diff_aware {
            config.update = UpdatePolicy::WhenChanged;
        }
        if let Some(concurrency) = self.concurrency {
            config.zone_concurrency = concurrency;
        }
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, check credentials, then reconcile.
    ///
    /// The credential is checked before any network call.
    pub async fn execute(&self) -> ReconcileResult<ReconcileReport> {
        let config = self.load_config()?;
        let api = Cloudflare::from_env(&config.api)?;

        info!(
            config = %self.config.display(),
            target = %config.target,
            entries = config.entry_count(),
            dry_run = self.dry_run,
            "reconciling"
        );

        Reconciler::new(&api, &config)
            .dry_run(self.dry_run)
            .run()
            .await
    }
}
