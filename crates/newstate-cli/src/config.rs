//! `newstate.toml` loading and command-line overrides.
//!
//! ```toml
//! [bridge]
//! open_libs = true
//! memory_limit = 16777216
//! max_depth = 64
//! ```

use std::path::Path;

use anyhow::Context;
use clap::Args;
use newstate::BridgeOptions;
use serde::Deserialize;

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "newstate.toml";

/// Contents of a config file. Every table is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub bridge: BridgeOptions,
}

impl CliConfig {
    /// Parse config from TOML text
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: CliConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Read and parse a config file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Load `explicit` if given, else `newstate.toml` in `dir` when it exists.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let default = dir.join(DEFAULT_CONFIG_FILE);
        if default.is_file() {
            tracing::debug!("using {}", default.display());
            return Self::from_file(&default);
        }
        Ok(Self::default())
    }
}

/// Flags that override the `[bridge]` table
#[derive(Debug, Default, Args)]
pub struct BridgeFlags {
    /// Create child states without the standard library
    #[arg(long, global = true)]
    pub no_libs: bool,
    /// Memory cap per child state, in bytes
    #[arg(long, global = true)]
    pub memory_limit: Option<usize>,
    /// Deepest table nesting copied between states
    #[arg(long, global = true)]
    pub max_depth: Option<usize>,
}

impl BridgeFlags {
    /// Apply these overrides on top of `options`
    pub fn apply(&self, mut options: BridgeOptions) -> BridgeOptions {
        if self.no_libs {
            options.open_libs = false;
        }
        if let Some(limit) = self.memory_limit {
            options.memory_limit = Some(limit);
        }
        if let Some(depth) = self.max_depth {
            options.max_depth = depth;
        }
        options
    }
}
