//! Configuration view and scaffolding: `wpfleet config`.

use anyhow::{Context, Result, bail};
use std::path::Path;

use wpfleet::config::{Config, DEFAULT_CONFIG_FILE, default_toml};

use super::super::ConfigCommands;

pub fn cmd_config(config_path: Option<&Path>, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            let shown = config_path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
            if shown.exists() {
                println!("# Config file: {}", shown.display());
            } else {
                println!("# No {} found; showing defaults", shown.display());
            }
            println!("# Effective values (file + environment, secrets masked)");
            println!();

            let config = Config::load(config_path)?;
            let rendered = toml::to_string_pretty(&config.redacted())
                .context("Failed to render configuration")?;
            println!("{}", rendered);
        }
        Some(ConfigCommands::Init { force }) => {
            let target = config_path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
            if target.exists() && !force {
                bail!(
                    "{} already exists. Use --force to overwrite.",
                    target.display()
                );
            }
            if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(target, default_toml())
                .with_context(|| format!("Failed to write {}", target.display()))?;
            println!("Created {}", target.display());
        }
    }
    Ok(())
}
