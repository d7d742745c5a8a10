// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::CryptosafeConfig;

/// Lowest iteration count accepted for new master keys.
pub const MIN_KDF_ITERATIONS: u32 = 50_000;

/// Shortest salt accepted by the key manager.
pub const MIN_SALT_LENGTH: usize = 8;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CryptosafeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.storage.pool_size == 0 {
        errors.push(ConfigError::Validation {
            message: "storage.pool_size must be at least 1".to_string(),
        });
    }

    if config.vault.kdf_iterations < MIN_KDF_ITERATIONS {
        errors.push(ConfigError::Validation {
            message: format!(
                "vault.kdf_iterations must be at least {MIN_KDF_ITERATIONS}, got {}",
                config.vault.kdf_iterations
            ),
        });
    }

    if config.vault.salt_length < MIN_SALT_LENGTH {
        errors.push(ConfigError::Validation {
            message: format!(
                "vault.salt_length must be at least {MIN_SALT_LENGTH}, got {}",
                config.vault.salt_length
            ),
        });
    }

    if config.bus.workers == 0 {
        errors.push(ConfigError::Validation {
            message: "bus.workers must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&CryptosafeConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_failure() {
        let mut config = CryptosafeConfig::default();
        config.storage.database_path = "  ".to_string();
        config.storage.pool_size = 0;
        config.vault.kdf_iterations = 1000;
        config.vault.salt_length = 4;
        config.bus.workers = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
    }
}
