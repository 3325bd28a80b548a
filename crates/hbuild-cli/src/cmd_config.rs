use std::path::Path;

use clap::Subcommand;

use hbuild_client::config::{parse_value, read_map, write_map};
use hbuild_client::ClientConfig;

use crate::context::Context;

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value
    Set {
        /// Config key (e.g. server_url, status_interval_ms)
        key: String,
        /// Config value (true/false/number/string)
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Print the config file location
    Path,
}

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, ctx: &Context) -> anyhow::Result<()> {
    let path = ctx.config_path.as_path();
    match cmd {
        ConfigCmd::Set { key, value } => set(path, &key, &value),
        ConfigCmd::Get { key } => get(path, &key),
        ConfigCmd::List => list(path),
        ConfigCmd::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

// ── Command Implementations ──

/// `hbctl config set <key> <value>`
///
/// The edited file must still load as a [`ClientConfig`], so a typo in a
/// value never leaves a config the next command cannot read.
pub fn set(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let mut config = read_map(path)?;
    config.insert(key.to_string(), parse_value(value));
    let check: Result<ClientConfig, _> =
        serde_json::from_value(serde_json::Value::Object(config.clone()));
    if let Err(e) = check {
        anyhow::bail!("invalid value for {key}: {e}");
    }
    write_map(path, &config)?;
    println!("{key} = {value}");
    Ok(())
}

/// `hbctl config get <key>`
pub fn get(path: &Path, key: &str) -> anyhow::Result<()> {
    let config = read_map(path)?;
    match config.get(key) {
        Some(val) => println!("{val}"),
        None => println!("(not set)"),
    }
    Ok(())
}

/// `hbctl config list`
pub fn list(path: &Path) -> anyhow::Result<()> {
    let config = read_map(path)?;
    if config.is_empty() {
        println!("(no config set)");
    } else {
        for (k, v) in &config {
            println!("{k} = {v}");
        }
    }
    Ok(())
}
