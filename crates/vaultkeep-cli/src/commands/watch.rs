//! Watch command - continuous synchronization
//!
//! Runs an initial full pass, then watches the vault root and feeds change
//! events through the capture stage until Ctrl-C. A final dirty-set flush
//! runs on shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::info;

use vaultkeep_core::config::Config;
use vaultkeep_engine::capture::ChangeCapture;
use vaultkeep_engine::watcher::VaultWatcher;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Skip the initial full reconciliation pass
    #[arg(long)]
    pub no_initial_sync: bool,
}

impl WatchCommand {
    pub async fn execute(&self, format: OutputFormat, config: &Config) -> Result<()> {
        let formatter = get_formatter(format);
        let engine = super::build_engine(config)?;

        let cancel = CancellationToken::new();
        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
                signal_cancel.cancel();
            }
        });

        if !self.no_initial_sync {
            formatter.info("Initial reconciliation...");
            let report = engine.full_sync(&cancel).await?;
            formatter.info(&format!(
                "initial pass: {} up, {} down, {} diverged, {} skipped",
                report.uploaded(),
                report.downloaded(),
                report.diverged(),
                report.skipped(),
            ));
        }

        if cancel.is_cancelled() {
            return Ok(());
        }

        let (mut watcher, events) = VaultWatcher::new(&config.vault.root)?;
        watcher.start()?;
        formatter.success(&format!(
            "Watching {} (flush every {}s, Ctrl-C to stop)",
            config.vault.root.display(),
            config.sync.flush_interval_secs,
        ));

        let capture = ChangeCapture::new(
            engine,
            Duration::from_secs(config.sync.flush_interval_secs),
        );
        capture.run(events, cancel).await;

        let _ = watcher.stop();
        formatter.success("Watch stopped");
        Ok(())
    }
}
