//! Shared configuration for RRCS tools.
//!
//! TOML profiles layered with environment overrides, and translation to
//! `rrcs_core::ControllerConfig`. The CLI adds flag-aware wrappers on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rrcs_core::{ControllerConfig, DEFAULT_LOCAL_PORT, DEFAULT_RRCS_PORT, LinkConfig};

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "RRCS_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{0}' not found")]
    UnknownProfile(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, p)| (k.as_str(), p))
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    5
}

/// One server endpoint plus where it should push notifications.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Endpoint {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Address announced to the server for notifications.
    pub local_host: Option<String>,

    pub local_port: Option<u16>,
}

fn default_port() -> u16 {
    DEFAULT_RRCS_PORT
}

impl Endpoint {
    fn to_link(&self, default_local_port: u16) -> LinkConfig {
        LinkConfig::new(self.host.clone(), self.port).with_local(
            self.local_host.clone().unwrap_or_default(),
            self.local_port.unwrap_or(default_local_port),
        )
    }
}

/// A named server profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    pub primary: Endpoint,

    /// Standby server, used only with `redundant = true`.
    pub secondary: Option<Endpoint>,

    #[serde(default)]
    pub redundant: bool,

    #[serde(default)]
    pub verbose: bool,

    /// Register for pushed notifications (long-running mode only).
    #[serde(default = "default_true")]
    pub notifications: bool,

    /// Override the global timeout, in seconds.
    pub timeout: Option<u64>,

    /// Keepalive period in seconds. 0 disables the monitor.
    pub keepalive: Option<u64>,

    /// Minimum spacing between calls, in milliseconds.
    pub min_call_interval_ms: Option<u64>,
}

fn default_true() -> bool {
    true
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `$RRCS_CONFIG`, else the platform
/// config dir.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "rrcs", "rrcs").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("rrcs");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the default path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` layered with `RRCS_*` environment variables.
/// Nested keys use `__`, e.g. `RRCS_PROFILES__STUDIO__HOST`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("RRCS_").ignore(&["CONFIG"]).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `ControllerConfig` from a profile, with no CLI overrides.
///
/// The secondary listener defaults to the port after the primary's.
pub fn profile_to_controller_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    if profile.redundant && profile.secondary.is_none() {
        return Err(ConfigError::Validation {
            field: "secondary".into(),
            reason: "redundant profiles need a [secondary] endpoint".into(),
        });
    }

    let primary = profile.primary.to_link(DEFAULT_LOCAL_PORT);
    let secondary_local = primary.local_port.saturating_add(1);
    let secondary = profile
        .secondary
        .as_ref()
        .map(|ep| ep.to_link(secondary_local));

    let base = ControllerConfig::default();
    Ok(ControllerConfig {
        primary,
        secondary,
        redundant: profile.redundant,
        verbose: profile.verbose,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        keepalive_interval: profile
            .keepalive
            .map_or(base.keepalive_interval, Duration::from_secs),
        min_call_interval: profile
            .min_call_interval_ms
            .map_or(base.min_call_interval, Duration::from_millis),
        notifications: profile.notifications,
        ..base
    })
}
