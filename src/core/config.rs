//! Configuration system: TOML file + env var overrides + defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{CwError, Result};
use crate::view::ProcessSortColumn;

/// Full connwatch configuration model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub refresh: RefreshConfig,
    pub changes: ChangesConfig,
    pub dns: DnsConfig,
    pub docker: DockerConfig,
    pub update: UpdateConfig,
    pub view: ViewConfig,
    pub logging: LoggingConfig,
    /// File this config was loaded from (or would have been).
    #[serde(skip)]
    pub source_path: PathBuf,
}

/// Tick cadence and collection deadlines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_ms: u64,
    /// Deadline for snapshot and NetIO collection.
    pub collect_timeout_ms: u64,
    pub start_paused: bool,
}

/// How long transient highlights and status lines stay visible.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChangesConfig {
    pub highlight_ttl_ms: u64,
    pub status_ttl_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DnsConfig {
    pub enabled: bool,
    pub lookup_timeout_ms: u64,
    pub max_lookups_per_tick: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DockerConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UpdateConfig {
    pub version_check: bool,
}

/// Initial state of the root frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ViewConfig {
    pub process_sort: ProcessSortColumn,
    pub ascending: bool,
    /// Pinned exact-port filter, applied on top of interactive search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_filter: Option<u16>,
}

/// Structured activity log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub jsonl_path: PathBuf,
    pub fallback_path: PathBuf,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            collect_timeout_ms: 5_000,
            start_paused: false,
        }
    }
}

impl Default for ChangesConfig {
    fn default() -> Self {
        Self {
            highlight_ttl_ms: 3_000,
            status_ttl_ms: 3_000,
        }
    }
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lookup_timeout_ms: 2_000,
            max_lookups_per_tick: crate::enrich::dns::DEFAULT_MAX_LOOKUPS_PER_TICK,
        }
    }
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            version_check: true,
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            process_sort: ProcessSortColumn::Name,
            ascending: true,
            port_filter: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let data = home_dir().join(".local").join("share").join("connwatch");
        Self {
            enabled: false,
            jsonl_path: data.join("activity.jsonl"),
            fallback_path: env::temp_dir().join("connwatch-activity.jsonl"),
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

impl RefreshConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    #[must_use]
    pub fn collect_timeout(&self) -> Duration {
        Duration::from_millis(self.collect_timeout_ms)
    }
}

impl ChangesConfig {
    #[must_use]
    pub fn highlight_ttl(&self) -> Duration {
        Duration::from_millis(self.highlight_ttl_ms)
    }

    #[must_use]
    pub fn status_ttl(&self) -> Duration {
        Duration::from_millis(self.status_ttl_ms)
    }
}

impl DnsConfig {
    #[must_use]
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from)
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        home_dir()
            .join(".config")
            .join("connwatch")
            .join("config.toml")
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// A missing file at the default path yields defaults; a missing
    /// explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, env_var)
    }

    /// [`Self::load`] with an injectable environment lookup.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw =
                fs::read_to_string(&path_buf).map_err(|source| CwError::io(&path_buf, source))?;
            toml::from_str::<Self>(&raw)?
        } else if path.is_some() {
            return Err(CwError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.source_path = path_buf;
        cfg.apply_env_overrides_from(lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for the activity log.
    ///
    /// FNV-1a over canonical JSON, stable across processes and toolchains.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Effective configuration rendered as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CwError::Serialization {
            context: "config",
            details: e.to_string(),
        })
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut get = |name: &str| lookup(name).filter(|raw| !raw.trim().is_empty());

        // refresh
        if let Some(raw) = get("CW_REFRESH_INTERVAL_MS") {
            self.refresh.interval_ms = parse_env("CW_REFRESH_INTERVAL_MS", &raw)?;
        }
        if let Some(raw) = get("CW_REFRESH_COLLECT_TIMEOUT_MS") {
            self.refresh.collect_timeout_ms = parse_env("CW_REFRESH_COLLECT_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = get("CW_REFRESH_START_PAUSED") {
            self.refresh.start_paused = parse_env("CW_REFRESH_START_PAUSED", &raw)?;
        }

        // changes
        if let Some(raw) = get("CW_CHANGES_HIGHLIGHT_TTL_MS") {
            self.changes.highlight_ttl_ms = parse_env("CW_CHANGES_HIGHLIGHT_TTL_MS", &raw)?;
        }
        if let Some(raw) = get("CW_CHANGES_STATUS_TTL_MS") {
            self.changes.status_ttl_ms = parse_env("CW_CHANGES_STATUS_TTL_MS", &raw)?;
        }

        // dns
        if let Some(raw) = get("CW_DNS_ENABLED") {
            self.dns.enabled = parse_env("CW_DNS_ENABLED", &raw)?;
        }
        if let Some(raw) = get("CW_DNS_LOOKUP_TIMEOUT_MS") {
            self.dns.lookup_timeout_ms = parse_env("CW_DNS_LOOKUP_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = get("CW_DNS_MAX_LOOKUPS_PER_TICK") {
            self.dns.max_lookups_per_tick = parse_env("CW_DNS_MAX_LOOKUPS_PER_TICK", &raw)?;
        }

        // docker / update
        if let Some(raw) = get("CW_DOCKER_ENABLED") {
            self.docker.enabled = parse_env("CW_DOCKER_ENABLED", &raw)?;
        }
        if let Some(raw) = get("CW_UPDATE_VERSION_CHECK") {
            self.update.version_check = parse_env("CW_UPDATE_VERSION_CHECK", &raw)?;
        }

        // view
        if let Some(raw) = get("CW_VIEW_PROCESS_SORT") {
            self.view.process_sort = parse_env("CW_VIEW_PROCESS_SORT", &raw)?;
        }
        if let Some(raw) = get("CW_VIEW_ASCENDING") {
            self.view.ascending = parse_env("CW_VIEW_ASCENDING", &raw)?;
        }
        if let Some(raw) = get("CW_VIEW_PORT_FILTER") {
            self.view.port_filter = Some(parse_env("CW_VIEW_PORT_FILTER", &raw)?);
        }

        // logging
        if let Some(raw) = get("CW_LOGGING_ENABLED") {
            self.logging.enabled = parse_env("CW_LOGGING_ENABLED", &raw)?;
        }
        if let Some(raw) = get("CW_LOGGING_JSONL_PATH") {
            self.logging.jsonl_path = PathBuf::from(raw);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(100..=60_000).contains(&self.refresh.interval_ms) {
            return Err(invalid(format!(
                "refresh.interval_ms must be in [100, 60000], got {}",
                self.refresh.interval_ms
            )));
        }

        for (name, value) in [
            ("refresh.collect_timeout_ms", self.refresh.collect_timeout_ms),
            ("changes.highlight_ttl_ms", self.changes.highlight_ttl_ms),
            ("changes.status_ttl_ms", self.changes.status_ttl_ms),
            ("dns.lookup_timeout_ms", self.dns.lookup_timeout_ms),
        ] {
            if value == 0 {
                return Err(invalid(format!("{name} must be > 0")));
            }
        }

        if !(1..=256).contains(&self.dns.max_lookups_per_tick) {
            return Err(invalid(format!(
                "dns.max_lookups_per_tick must be in [1, 256], got {}",
                self.dns.max_lookups_per_tick
            )));
        }

        if self.view.port_filter == Some(0) {
            return Err(invalid("view.port_filter must be a port in [1, 65535]".into()));
        }

        if self.logging.enabled {
            if self.logging.max_size_bytes < 4_096 {
                return Err(invalid(format!(
                    "logging.max_size_bytes must be >= 4096, got {}",
                    self.logging.max_size_bytes
                )));
            }
            if self.logging.jsonl_path.as_os_str().is_empty() {
                return Err(invalid("logging.jsonl_path must be set when logging is enabled".into()));
            }
        }

        Ok(())
    }
}

fn invalid(details: String) -> CwError {
    CwError::InvalidConfig { details }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| CwError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
