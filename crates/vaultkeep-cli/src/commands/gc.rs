//! Gc command - prune old remote versions

use anyhow::{Context, Result};
use clap::Args;

use vaultkeep_core::config::Config;
use vaultkeep_engine::retention::RetentionPolicy;
use vaultkeep_store::DirObjectStore;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct GcCommand {
    /// Versions to keep per file (overrides the configured value)
    #[arg(long)]
    pub keep: Option<usize>,
}

impl GcCommand {
    pub async fn execute(&self, format: OutputFormat, config: &Config) -> Result<()> {
        let formatter = get_formatter(format);
        super::ensure_valid(config)?;

        let keep = self.keep.unwrap_or(config.retention.keep_versions);
        let policy = RetentionPolicy::new(keep)?;
        let store =
            DirObjectStore::new(&config.store.endpoint).context("failed to open remote store")?;

        let report = policy.run(&store).await?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "keep": keep,
                "chains_total": report.chains_total,
                "chains_pruned": report.chains_pruned,
                "versions_removed": report.versions_removed,
            }));
            return Ok(());
        }

        if report.versions_removed == 0 {
            formatter.success(&format!(
                "Nothing to prune ({} chains within the {keep}-version bound)",
                report.chains_total
            ));
        } else {
            formatter.success(&format!(
                "Pruned {} version{} across {} chain{}",
                report.versions_removed,
                if report.versions_removed == 1 { "" } else { "s" },
                report.chains_pruned,
                if report.chains_pruned == 1 { "" } else { "s" },
            ));
        }
        Ok(())
    }
}
