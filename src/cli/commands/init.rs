//! Init and Config commands.

use anyhow::{Result, anyhow};
use console::style;

use crate::config::Settings;

/// Run init command - create configuration file.
pub fn run_init(force: bool) -> Result<()> {
    let path = Settings::init_config_file(force).map_err(|e| anyhow!("{e}"))?;

    println!(
        "{} configuration file at: {}",
        style(if force { "Wrote" } else { "Created" }).green().bold(),
        path.display()
    );
    println!("Edit this file to customize your settings.");
    Ok(())
}

/// Run config command - display current configuration.
pub fn run_config(config: &Settings) -> Result<()> {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    let toml_str = toml::to_string_pretty(config).map_err(|e| anyhow!(e))?;
    println!("{toml_str}");
    Ok(())
}
