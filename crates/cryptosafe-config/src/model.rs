// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the CryptoSafe vault.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level CryptoSafe configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CryptosafeConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Database settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Key derivation settings.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Event bus settings.
    #[serde(default)]
    pub bus: BusConfig,
}

impl Default for CryptosafeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            storage: StorageConfig::default(),
            vault: VaultConfig::default(),
            bus: BusConfig::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Number of pooled connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            pool_size: default_pool_size(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("cryptosafe").join("vault.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("vault.db"))
        .display()
        .to_string()
}

fn default_pool_size() -> usize {
    4
}

/// Master-password key derivation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// PBKDF2-HMAC-SHA256 iteration count used when a key is first set up.
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Length in bytes of freshly generated salts.
    #[serde(default = "default_salt_length")]
    pub salt_length: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            kdf_iterations: default_kdf_iterations(),
            salt_length: default_salt_length(),
        }
    }
}

fn default_kdf_iterations() -> u32 {
    200_000
}

fn default_salt_length() -> usize {
    16
}

/// Event bus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    /// Worker tasks for asynchronous event delivery.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = CryptosafeConfig::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.storage.pool_size, 4);
        assert!(config.storage.database_path.ends_with("vault.db"));
        assert_eq!(config.vault.kdf_iterations, 200_000);
        assert_eq!(config.vault.salt_length, 16);
        assert_eq!(config.bus.workers, 2);
    }
}
