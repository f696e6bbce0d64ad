//! Config command - view and validate configuration

use std::path::Path;

use anyhow::Result;
use clap::Subcommand;

use vaultkeep_core::config::Config;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Write a starter configuration file
    Init,
    /// Print the configuration file path
    Path,
    /// Check the configuration for problems
    Validate,
}

impl ConfigCommand {
    pub async fn execute(
        &self,
        format: OutputFormat,
        config: &Config,
        path: &Path,
    ) -> Result<()> {
        let formatter = get_formatter(format);

        match self {
            ConfigCommand::Show => {
                if format.is_json() {
                    formatter.print_json(&serde_json::to_value(config)?);
                } else {
                    print!("{}", serde_yaml::to_string(config)?);
                }
            }
            ConfigCommand::Init => {
                if path.exists() {
                    formatter.error(&format!("{} already exists", path.display()));
                    return Ok(());
                }
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, serde_yaml::to_string(&Config::default())?)?;
                formatter.success(&format!("Wrote {}", path.display()));
                formatter.info("Set vault.root and store.endpoint before syncing");
            }
            ConfigCommand::Path => {
                if format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "path": path.display().to_string(),
                        "exists": path.exists(),
                    }));
                } else {
                    println!("{}", path.display());
                }
            }
            ConfigCommand::Validate => {
                let problems = config.validate();
                if format.is_json() {
                    let problems: Vec<serde_json::Value> = problems
                        .iter()
                        .map(|p| {
                            serde_json::json!({"field": p.field, "message": p.message})
                        })
                        .collect();
                    formatter.print_json(&serde_json::json!({
                        "valid": problems.is_empty(),
                        "problems": problems,
                    }));
                } else if problems.is_empty() {
                    formatter.success("Configuration is valid");
                } else {
                    for problem in &problems {
                        formatter.error(&problem.to_string());
                    }
                    anyhow::bail!("configuration has {} problem(s)", problems.len());
                }
            }
        }
        Ok(())
    }
}
