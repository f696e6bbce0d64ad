//! Sync command - one full reconciliation pass
//!
//! Wires the engine to the configured adapters, runs `full_sync`, and
//! displays the per-alias outcome summary. Ctrl-C cancels the pass
//! cooperatively between aliases.

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::info;

use vaultkeep_core::config::Config;
use vaultkeep_engine::reconcile::ItemOutcome;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct SyncCommand {}

impl SyncCommand {
    pub async fn execute(&self, format: OutputFormat, config: &Config) -> Result<()> {
        let formatter = get_formatter(format);
        let engine = super::build_engine(config)?;

        let cancel = CancellationToken::new();
        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, finishing current alias");
                signal_cancel.cancel();
            }
        });

        formatter.info("Starting reconciliation...");
        let report = engine.full_sync(&cancel).await?;

        if format.is_json() {
            let outcomes: Vec<serde_json::Value> = report
                .outcomes
                .iter()
                .map(|(alias, outcome)| {
                    serde_json::json!({
                        "alias": alias.as_str(),
                        "outcome": outcome.to_string(),
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({
                "uploaded": report.uploaded(),
                "downloaded": report.downloaded(),
                "diverged": report.diverged(),
                "deleted": report.deleted(),
                "unchanged": report.unchanged(),
                "skipped": report.skipped(),
                "cancelled": report.cancelled,
                "duration_ms": report.duration_ms,
                "outcomes": outcomes,
            }));
            return Ok(());
        }

        let duration = if report.duration_ms >= 1000 {
            format!("{:.1}s", report.duration_ms as f64 / 1000.0)
        } else {
            format!("{}ms", report.duration_ms)
        };

        if report.cancelled {
            formatter.error(&format!("Sync cancelled after {duration}"));
        } else if report.is_quiet() && report.skipped() == 0 && report.deleted() == 0 {
            formatter.success("Already up to date");
        } else {
            formatter.success(&format!("Sync completed in {duration}"));
        }

        let counts = [
            ("Uploaded", report.uploaded()),
            ("Downloaded", report.downloaded()),
            ("Diverged", report.diverged()),
            ("Deleted", report.deleted()),
        ];
        for (label, count) in counts {
            if count > 0 {
                formatter.info(&format!(
                    "{label}: {count} file{}",
                    if count == 1 { "" } else { "s" }
                ));
            }
        }

        // Divergences and skips deserve per-file detail
        for (alias, outcome) in &report.outcomes {
            match outcome {
                ItemOutcome::Diverged { copy } => {
                    formatter.info(&format!("conflict copy: {copy}"));
                }
                ItemOutcome::Skipped { reason } => {
                    formatter.info(&format!("skipped {alias}: {reason}"));
                }
                _ => {}
            }
        }

        Ok(())
    }
}
