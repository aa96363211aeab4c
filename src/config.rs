use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::model::CategorySet;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";
const DEFAULT_HEATMAP_BUCKET: usize = 10;

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    bind_addr: Option<String>,
    database_url: Option<String>,
    backend: Option<BackendConfigFile>,
    analysis: Option<AnalysisConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct BackendConfigFile {
    url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct AnalysisConfigFile {
    track_neutral: Option<bool>,
    heatmap_bucket: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub backend_url: String,
    pub database_url: String,
    pub track_neutral: bool,
    pub heatmap_bucket: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_file(ConfigFile::default())
    }
}

impl AppConfig {
    /// Optional TOML file, then env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => ConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ConfigFile) -> Self {
        let analysis = file.analysis.unwrap_or_default();
        Self {
            bind_addr: file.bind_addr.unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            backend_url: file
                .backend
                .and_then(|backend| backend.url)
                .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
            database_url: file
                .database_url
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            track_neutral: analysis.track_neutral.unwrap_or(false),
            heatmap_bucket: analysis.heatmap_bucket.unwrap_or(DEFAULT_HEATMAP_BUCKET),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(addr) = non_empty_env("ENGAGEMENT_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(url) = non_empty_env("ENGAGEMENT_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Some(url) = non_empty_env("ENGAGEMENT_DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(flag) = non_empty_env("ENGAGEMENT_TRACK_NEUTRAL") {
            self.track_neutral = parse_bool(&flag)
                .ok_or_else(|| anyhow!("ENGAGEMENT_TRACK_NEUTRAL must be true or false"))?;
        }
        if let Some(bucket) = non_empty_env("ENGAGEMENT_HEATMAP_BUCKET") {
            self.heatmap_bucket = bucket
                .parse()
                .map_err(|_| anyhow!("ENGAGEMENT_HEATMAP_BUCKET must be a positive integer"))?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.heatmap_bucket == 0 {
            return Err(anyhow!("heatmap bucket must be greater than zero"));
        }
        if !self.backend_url.starts_with("http://") && !self.backend_url.starts_with("https://") {
            return Err(anyhow!("backend url must be http(s): {}", self.backend_url));
        }
        self.backend_url = self.backend_url.trim_end_matches('/').to_string();
        Ok(())
    }

    pub fn categories(&self) -> CategorySet {
        CategorySet::from_flag(self.track_neutral)
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
