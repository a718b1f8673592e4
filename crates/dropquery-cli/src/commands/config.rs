//! Config command implementation.

use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::cli::ConfigAction;
use crate::config::Config;

pub fn cmd_config(action: ConfigAction, config: &Config, path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
            print!("{}", content);
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "Config already exists at {}. Use --force to overwrite",
                    path.display()
                );
            }
            Config::default().save(path)?;
            println!("Wrote default config to {}", path.display());
        }
        ConfigAction::Validate => {
            let errors = config.validate();
            if !errors.is_empty() {
                for error in &errors {
                    eprintln!("  {}", error);
                }
                bail!("Config has {} invalid value(s)", errors.len());
            }
            println!("Config is valid.");
        }
    }
    Ok(())
}
