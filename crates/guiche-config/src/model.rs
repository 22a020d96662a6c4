// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Guiche ticket service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::HashMap;

use guiche_core::types::{Origin, RateScope};
use guiche_core::GuicheError;
use serde::{Deserialize, Serialize};

/// Top-level Guiche configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GuicheConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Ticket ledger storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Queue classes, rate caps, and batch limits.
    #[serde(default)]
    pub counters: CountersConfig,

    /// HTTP/WebSocket gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Operator-to-station assignments, keyed by operator id.
    #[serde(default)]
    pub stations: HashMap<String, StationConfig>,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service instance.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "guiche".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Ticket ledger storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    "guiche.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Queue class, rate cap, and batch limit configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CountersConfig {
    /// Enabled ticket origins. Both tiers exist for every enabled origin.
    #[serde(default = "default_origins")]
    pub origins: Vec<String>,

    /// Normal-tier tickets allowed per day within the rate scope.
    #[serde(default = "default_daily_cap")]
    pub daily_cap: u32,

    /// Normal-tier tickets allowed per shift (before/after local noon).
    #[serde(default = "default_shift_cap")]
    pub shift_cap: u32,

    /// Largest number of tickets a single range request may cover.
    #[serde(default = "default_max_batch")]
    pub max_batch: u32,

    /// Rate cap population: "global" or "per-origin".
    #[serde(default = "default_rate_scope")]
    pub rate_scope: String,
}

impl CountersConfig {
    /// Enabled origins parsed into domain values.
    pub fn origin_list(&self) -> Result<Vec<Origin>, GuicheError> {
        self.origins
            .iter()
            .map(|name| {
                name.parse::<Origin>().map_err(|_| {
                    GuicheError::Config(format!("counters.origins has unknown origin `{name}`"))
                })
            })
            .collect()
    }

    /// The configured rate scope parsed into its domain value.
    pub fn scope(&self) -> Result<RateScope, GuicheError> {
        self.rate_scope.parse::<RateScope>().map_err(|_| {
            GuicheError::Config(format!(
                "counters.rate_scope must be `global` or `per-origin`, got `{}`",
                self.rate_scope
            ))
        })
    }
}

impl Default for CountersConfig {
    fn default() -> Self {
        Self {
            origins: default_origins(),
            daily_cap: default_daily_cap(),
            shift_cap: default_shift_cap(),
            max_batch: default_max_batch(),
            rate_scope: default_rate_scope(),
        }
    }
}

fn default_origins() -> Vec<String> {
    vec!["estadual".to_string(), "municipal".to_string()]
}

fn default_daily_cap() -> u32 {
    400
}

fn default_shift_cap() -> u32 {
    200
}

fn default_max_batch() -> u32 {
    500
}

fn default_rate_scope() -> String {
    "global".to_string()
}

/// HTTP/WebSocket gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Enable the HTTP/WS gateway.
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    /// Address to bind the server to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind the server to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Capacity of the call-event broadcast channel.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,

    /// Seconds an unclaimed print job stays retrievable.
    #[serde(default = "default_receipt_ttl_secs")]
    pub receipt_ttl_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_host(),
            port: default_port(),
            bus_capacity: default_bus_capacity(),
            receipt_ttl_secs: default_receipt_ttl_secs(),
        }
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_bus_capacity() -> usize {
    256
}

fn default_receipt_ttl_secs() -> u64 {
    300
}

/// One operator's station assignment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StationConfig {
    /// Room shown on wall displays.
    pub room: String,

    /// Desk shown on wall displays.
    pub desk: String,
}
