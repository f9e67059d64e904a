use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

/// Runtime settings loaded from environment variables
#[derive(Debug, Clone)]
pub struct Settings {
    /// Overrides the profile's user agent when set
    pub user_agent: Option<String>,
    /// Overrides the profile's request timeout when set
    pub timeout_secs: Option<u64>,
    pub output_dir: PathBuf,
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            user_agent: env::var("HARVEST_USER_AGENT").ok().filter(|s| !s.trim().is_empty()),
            timeout_secs: env::var("HARVEST_TIMEOUT_SECS")
                .ok()
                .map(|raw| raw.parse::<u64>())
                .transpose()
                .context("HARVEST_TIMEOUT_SECS must be a whole number of seconds")?,
            output_dir: env::var("HARVEST_OUTPUT_DIR")
                .unwrap_or_else(|_| "output".to_string())
                .into(),
        })
    }
}
