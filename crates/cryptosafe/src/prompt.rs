// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secret acquisition via environment variable or interactive TTY prompt.

use cryptosafe_core::SafeError;
use secrecy::SecretString;

/// Supplies the master password non-interactively.
pub const MASTER_PASSWORD_ENV_VAR: &str = "CRYPTOSAFE_MASTER_PASSWORD";

/// Supplies an entry password non-interactively for `add` and `update`.
pub const ENTRY_PASSWORD_ENV_VAR: &str = "CRYPTOSAFE_ENTRY_PASSWORD";

/// Read a secret from `env_var`, falling back to a hidden TTY prompt.
///
/// Empty values are rejected from either source.
pub fn read_secret(env_var: &str, label: &str) -> Result<SecretString, SafeError> {
    if let Ok(value) = std::env::var(env_var)
        && !value.is_empty()
    {
        return Ok(SecretString::from(value));
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        eprint!("{label}: ");
        let value = rpassword::read_password()
            .map_err(|e| SafeError::Internal(format!("failed to read {label}: {e}")))?;
        if value.is_empty() {
            return Err(SafeError::invalid(format!("{label} must not be empty")));
        }
        return Ok(SecretString::from(value));
    }

    Err(SafeError::invalid(format!(
        "no {label} provided -- set {env_var} or run interactively"
    )))
}

/// Like [`read_secret`], but an interactive prompt asks twice and requires
/// both answers to match.
pub fn read_new_secret(env_var: &str, label: &str) -> Result<SecretString, SafeError> {
    if let Ok(value) = std::env::var(env_var)
        && !value.is_empty()
    {
        return Ok(SecretString::from(value));
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        eprint!("New {label}: ");
        let first = rpassword::read_password()
            .map_err(|e| SafeError::Internal(format!("failed to read {label}: {e}")))?;
        eprint!("Confirm {label}: ");
        let second = rpassword::read_password()
            .map_err(|e| SafeError::Internal(format!("failed to read {label}: {e}")))?;
        if first != second {
            return Err(SafeError::invalid(format!("{label}s do not match")));
        }
        if first.is_empty() {
            return Err(SafeError::invalid(format!("{label} must not be empty")));
        }
        return Ok(SecretString::from(first));
    }

    Err(SafeError::invalid(format!(
        "no {label} provided -- set {env_var} or run interactively"
    )))
}
