// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./guiche.toml` > `~/.config/guiche/guiche.toml` > `/etc/guiche/guiche.toml`
//! with environment variable overrides via `GUICHE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::GuicheConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/guiche/guiche.toml` (system-wide)
/// 3. `~/.config/guiche/guiche.toml` (user XDG config)
/// 4. `./guiche.toml` (local directory)
/// 5. `GUICHE_*` environment variables
pub fn load_config() -> Result<GuicheConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GuicheConfig::default()))
        .merge(Toml::file("/etc/guiche/guiche.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("guiche/guiche.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("guiche.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<GuicheConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GuicheConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<GuicheConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GuicheConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// CRITICAL: Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `GUICHE_COUNTERS_DAILY_CAP` must
/// map to `counters.daily_cap`, not `counters.daily.cap`.
fn env_provider() -> Env {
    Env::prefixed("GUICHE_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: GUICHE_COUNTERS_DAILY_CAP -> "counters_daily_cap"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("counters_", "counters.", 1)
            .replacen("gateway_", "gateway.", 1);
        mapped.into()
    })
}
