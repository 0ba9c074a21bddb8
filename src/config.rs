use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "https://api.opendota.com/api";
pub const DEFAULT_DB_PATH: &str = "dota.db";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub api_url: String,
    pub db_path: PathBuf,
    pub timeout_secs: u64,
    pub log_level: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl IngestConfig {
    /// Reads `.env.local` then `.env` before looking at the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(url) = non_empty(lookup("OPENDOTA_API_URL")) {
            cfg.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(path) = non_empty(lookup("DOTA_DB_PATH")) {
            cfg.db_path = PathBuf::from(path);
        }
        if let Some(raw) = non_empty(lookup("OPENDOTA_TIMEOUT_SECS"))
            && let Ok(secs) = raw.parse::<u64>()
        {
            cfg.timeout_secs = secs;
        }
        if let Some(level) = non_empty(lookup("DOTA_INGEST_LOG")) {
            cfg.log_level = level;
        }
        cfg
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
