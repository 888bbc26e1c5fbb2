//! CLI configuration: thin wrapper around `rrcs_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--host, --port, --timeout).

use std::time::Duration;

use rrcs_core::{ControllerConfig, DEFAULT_RRCS_PORT, LinkConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use rrcs_config::{Config, config_path, load_config, profile_to_controller_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `ControllerConfig` from the config file, profile, and flags.
///
/// Flags beat the profile. With no profile, `--host` alone is enough;
/// notifications stay off because no local address is known.
pub fn build_controller_config(global: &GlobalOpts) -> Result<ControllerConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let mut controller = if let Some(profile) = cfg.profiles.get(&profile_name) {
        profile_to_controller_config(profile, &cfg.defaults)?
    } else if global.host.is_some() {
        ControllerConfig {
            primary: LinkConfig::new(String::new(), DEFAULT_RRCS_PORT),
            notifications: false,
            timeout: Duration::from_secs(cfg.defaults.timeout),
            ..ControllerConfig::default()
        }
    } else if global.profile.is_some() {
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: available_profiles(&cfg),
        });
    } else {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    };

    if let Some(ref host) = global.host {
        controller.primary.host.clone_from(host);
    }
    if let Some(port) = global.port {
        controller.primary.port = port;
    }
    if let Some(secs) = global.timeout {
        controller.timeout = Duration::from_secs(secs);
    }
    if global.verbose >= 2 {
        controller.verbose = true;
    }
    Ok(controller)
}

fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
