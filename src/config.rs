//! Environment-variable configuration (§6). No CLI/file configuration
//! surface is in scope for the core; everything is read once at startup,
//! in the style of nika's own `config.rs` (a typed struct with documented
//! defaults), but sourced from the process environment rather than a TOML
//! file.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::WeaverError;

#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute path to the vault root. Required.
    pub vault_path: PathBuf,
    /// Path to the shadow cache / workflow store file. Defaults to
    /// `<vault_path>/.weaver-data/cache`.
    pub cache_path: PathBuf,
    /// `tracing_subscriber::EnvFilter` directive, e.g. "info", "debug".
    pub log_level: String,
    /// Debounce window for the file watcher (I4, default 300ms per §4.3).
    pub debounce: Duration,
    /// Maximum number of workflow runs in flight at once.
    pub max_inflight_runs: usize,
    /// How many days a completed workflow run is retained before GC.
    pub step_retention_days: u32,
    /// File extensions (no leading dot) treated as vault documents. `.md`
    /// is conventional but any text extension is acceptable (§6).
    pub vault_extensions: Vec<String>,
}

impl Config {
    pub const WEAVER_DATA_DIR: &'static str = ".weaver-data";

    pub fn from_env() -> Result<Self, WeaverError> {
        let vault_path = std::env::var("VAULT_PATH")
            .map_err(|_| WeaverError::Config("VAULT_PATH is required".into()))?;
        let vault_path = PathBuf::from(vault_path);
        if !vault_path.is_dir() {
            return Err(WeaverError::Config(format!(
                "VAULT_PATH {} is not a directory",
                vault_path.display()
            )));
        }

        let cache_path = std::env::var("CACHE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| vault_path.join(Self::WEAVER_DATA_DIR).join("cache"));

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let debounce_ms = parse_env_u64("DEBOUNCE_MS", 300)?;
        let max_inflight_runs = parse_env_u64("MAX_INFLIGHT_RUNS", 16)? as usize;
        let step_retention_days = parse_env_u64("STEP_RETENTION_DAYS", 14)? as u32;

        let vault_extensions = std::env::var("VAULT_EXTENSIONS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().trim_start_matches('.').to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| vec!["md".to_string()]);

        Ok(Self {
            vault_path,
            cache_path,
            log_level,
            debounce: Duration::from_millis(debounce_ms),
            max_inflight_runs,
            step_retention_days,
            vault_extensions,
        })
    }

    /// The directory the watcher must never descend into or report on.
    pub fn weaver_data_dir(&self) -> PathBuf {
        self.vault_path.join(Self::WEAVER_DATA_DIR)
    }
}

fn parse_env_u64(key: &str, default: u64) -> Result<u64, WeaverError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|_| WeaverError::Config(format!("{key} must be a non-negative integer"))),
        Err(_) => Ok(default),
    }
}
