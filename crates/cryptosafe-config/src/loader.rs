// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./cryptosafe.toml` > `~/.config/cryptosafe/cryptosafe.toml`
//! > `/etc/cryptosafe/cryptosafe.toml` with environment variable overrides via
//! the `CRYPTOSAFE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CryptosafeConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/cryptosafe/cryptosafe.toml`
/// 3. `~/.config/cryptosafe/cryptosafe.toml`
/// 4. `./cryptosafe.toml`
/// 5. `CRYPTOSAFE_*` environment variables
pub fn load_config() -> Result<CryptosafeConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
pub fn load_config_from_str(toml_content: &str) -> Result<CryptosafeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CryptosafeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CryptosafeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CryptosafeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment without extracting it.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CryptosafeConfig::default()))
        .merge(Toml::file("/etc/cryptosafe/cryptosafe.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("cryptosafe/cryptosafe.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("cryptosafe.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `CRYPTOSAFE_STORAGE_DATABASE_PATH` must become
/// `storage.database_path`, not `storage.database.path`. Keys arrive in
/// their original case, so they are lowercased before mapping.
fn env_provider() -> Env {
    Env::prefixed("CRYPTOSAFE_").map(|key| {
        let mapped = key
            .as_str()
            .to_ascii_lowercase()
            .replacen("storage_", "storage.", 1)
            .replacen("vault_", "vault.", 1)
            .replacen("bus_", "bus.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_database_path() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("CRYPTOSAFE_STORAGE_DATABASE_PATH", "/tmp/override.db");
            jail.set_env("CRYPTOSAFE_VAULT_KDF_ITERATIONS", "300000");
            let config = load_config().expect("config should load");
            assert_eq!(config.storage.database_path, "/tmp/override.db");
            assert_eq!(config.vault.kdf_iterations, 300_000);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_top_level_and_bus_keys() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("CRYPTOSAFE_LOG_LEVEL", "trace");
            jail.set_env("CRYPTOSAFE_BUS_WORKERS", "5");
            let config = load_config().expect("config should load");
            assert_eq!(config.log_level, "trace");
            assert_eq!(config.bus.workers, 5);
            Ok(())
        });
    }

    #[test]
    fn local_file_is_merged() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "cryptosafe.toml",
                r#"
log_level = "debug"

[bus]
workers = 3
"#,
            )?;
            let config = load_config().expect("config should load");
            assert_eq!(config.log_level, "debug");
            assert_eq!(config.bus.workers, 3);
            assert_eq!(config.storage.pool_size, 4);
            Ok(())
        });
    }
}
