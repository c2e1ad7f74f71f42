//! Config command handlers.

use anyhow::{Context, Result};
use errwise_core::config::{Config, paths};

pub fn path() -> Result<()> {
    println!("{}", paths::config_path().display());
    Ok(())
}

pub fn show() -> Result<()> {
    let config = Config::load().context("load config")?;
    let toml = toml::to_string_pretty(&config).context("serialize config")?;
    print!("{toml}");
    Ok(())
}
