//! Demo configuration.

use std::str::FromStr;

use anyhow::bail;

/// Which store the walkthrough runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// [`ddbkit_memory::MemoryStore`], seeded with the widget table.
    #[default]
    Memory,
    /// [`ddbkit_aws::AwsStore`]; the widget table must already exist.
    Aws,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "aws" | "dynamodb" => Ok(Self::Aws),
            other => bail!("unknown backend: {other} (expected memory or aws)"),
        }
    }
}

/// Demo configuration, driven by environment variables.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Store backend.
    pub backend: Backend,
    /// Log level.
    pub log_level: String,
    /// Widgets saved by the walkthrough.
    pub widget_count: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Memory,
            log_level: "info".to_owned(),
            widget_count: 5,
        }
    }
}

impl DemoConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("DDBKIT_BACKEND") {
            config.backend = v.parse()?;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(v) = std::env::var("DDBKIT_WIDGETS") {
            config.widget_count = v.parse()?;
        }

        Ok(config)
    }
}
