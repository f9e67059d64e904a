//! Feed profiles: everything needed to harvest one feed, as JSON.

use anyhow::{Context, Result};
use feed_harvest::sources::{HttpPagedSource, HttpSourceConfig};
use feed_harvest::{CollectConfig, DateWindow, RecordBuilder, RecordSchema};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::settings::Settings;

/// A harvestable feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedProfile {
    /// Used to name output files
    #[serde(default)]
    pub name: Option<String>,

    pub source: HttpSourceConfig,

    pub schema: RecordSchema,

    #[serde(default)]
    pub collect: CollectConfig,
}

impl FeedProfile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile {}", path.display()))?;
        let mut profile: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse profile {}", path.display()))?;

        if profile.name.is_none() {
            profile.name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_string);
        }
        Ok(profile)
    }

    /// Apply environment overrides.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        if let Some(user_agent) = &settings.user_agent {
            self.source.user_agent = user_agent.clone();
        }
        if let Some(timeout_secs) = settings.timeout_secs {
            self.source.timeout_secs = timeout_secs;
        }
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("feed")
    }

    /// Check the schema and source config without touching the network.
    pub fn validate(&self) -> Result<()> {
        RecordBuilder::new(self.schema.clone()).context("Invalid schema")?;
        self.source_for(None).map(|_| ())
    }

    /// Build the source, filling `{start}`/`{end}` from the window if given.
    pub fn source_for(&self, window: Option<&DateWindow>) -> Result<HttpPagedSource> {
        let mut config = self.source.clone();
        if let Some(window) = window {
            config.start_url = window.fill(&config.start_url);
        }
        HttpPagedSource::new(config).context("Invalid source configuration")
    }

    /// Whether the start URL expects a date window.
    pub fn is_windowed(&self) -> bool {
        self.source.start_url.contains("{start}") || self.source.start_url.contains("{end}")
    }
}
