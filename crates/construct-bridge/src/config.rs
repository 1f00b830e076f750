//! Bridge configuration
//!
//! Settings come from an optional TOML file, then command-line flags on top.
//! Anything neither sets keeps its default.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Duration;
use clap::Parser;
use construct_kv::KvConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "construct-bridge")]
#[command(version, about = "JSON-RPC bridge between the Construct palette and the add-in")]
pub struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Service name reported by `describe`
    #[arg(long)]
    pub name: Option<String>,

    /// Endpoint URL reported by `describe`
    #[arg(long)]
    pub url: Option<String>,

    /// JSON snapshot file for the key-value store
    #[arg(long)]
    pub data_file: Option<PathBuf>,

    /// Seconds between cache eviction sweeps
    #[arg(long)]
    pub sweep_interval_secs: Option<u64>,

    /// Days a cache entry may go unread before it is evicted
    #[arg(long)]
    pub max_idle_days: Option<i64>,

    /// Print the service manifest as JSON and exit
    #[arg(long)]
    pub describe: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub data_file: Option<PathBuf>,
    pub sweep_interval_secs: u64,
    pub max_idle_days: i64,
    pub max_entries: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            name: "Construct".to_string(),
            description: Some("Bridge between the Construct palette and the CAD add-in.".to_string()),
            url: None,
            data_file: None,
            sweep_interval_secs: 60,
            max_idle_days: 30,
            max_entries: KvConfig::default().max_entries,
        }
    }
}

impl BridgeConfig {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text).context("invalid bridge configuration")?;
        config.max_idle()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Resolve the effective configuration for `args`
    pub fn resolve(args: &Args) -> anyhow::Result<Self> {
        let base = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.merge_args(args);
        config.max_idle()?;
        Ok(config)
    }

    /// Overlay the flags that were given on the command line
    pub fn merge_args(mut self, args: &Args) -> Self {
        if let Some(name) = &args.name {
            self.name = name.clone();
        }
        if let Some(url) = &args.url {
            self.url = Some(url.clone());
        }
        if let Some(data_file) = &args.data_file {
            self.data_file = Some(data_file.clone());
        }
        if let Some(secs) = args.sweep_interval_secs {
            self.sweep_interval_secs = secs;
        }
        if let Some(days) = args.max_idle_days {
            self.max_idle_days = days;
        }
        self
    }

    pub fn kv_config(&self) -> anyhow::Result<KvConfig> {
        Ok(KvConfig {
            max_idle: self.max_idle()?,
            max_entries: self.max_entries,
            ..KvConfig::default()
        })
    }

    fn max_idle(&self) -> anyhow::Result<Duration> {
        anyhow::ensure!(
            self.max_idle_days >= 0,
            "max_idle_days must not be negative, got {}",
            self.max_idle_days
        );
        Duration::try_days(self.max_idle_days)
            .with_context(|| format!("max_idle_days {} is out of range", self.max_idle_days))
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        // A zero period would make the interval timer panic
        std::time::Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}
