// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CryptoSafe - a local encrypted credential vault.
//!
//! This is the binary entry point.

mod app;
mod commands;
mod prompt;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cryptosafe_config::CryptosafeConfig;
use cryptosafe_core::SafeError;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::commands::EntryArgs;

/// CryptoSafe - a local encrypted credential vault.
#[derive(Parser, Debug)]
#[command(name = "cryptosafe", version, about, long_about = None)]
struct Cli {
    /// Load this config file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Name recorded with login/logout events (defaults to $USER).
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the master password.
    Init {
        /// Replace an existing master key.
        #[arg(long)]
        force: bool,
    },
    /// Add an entry. The password comes from CRYPTOSAFE_ENTRY_PASSWORD or a prompt.
    Add(EntryArgs),
    /// List entries, most recently updated first.
    List,
    /// Show one entry.
    Show {
        id: i64,
        /// Print the password and notes in clear text.
        #[arg(long)]
        reveal: bool,
    },
    /// Replace every field of an entry.
    Update {
        id: i64,
        #[command(flatten)]
        entry: EntryArgs,
    },
    /// Delete an entry.
    Rm { id: i64 },
    /// Show recent audit records.
    Audit {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Store a setting.
    Set {
        key: String,
        value: String,
        /// Store the value encrypted.
        #[arg(long)]
        encrypt: bool,
    },
    /// Read a setting.
    Get {
        key: String,
        /// Printed when the setting is absent.
        #[arg(long)]
        default: Option<String>,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => cryptosafe_config::load_and_validate_path(path),
        None => cryptosafe_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            cryptosafe_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log_level);

    if let Err(e) = run(cli, &config).await {
        eprintln!("error: {e}");
        std::process::exit(if e.is_locked() { 2 } else { 1 });
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over `log_level`.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cryptosafe={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

fn resolve_user(explicit: Option<String>) -> String {
    explicit
        .or_else(|| std::env::var("USER").ok())
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| "owner".to_string())
}

async fn run(cli: Cli, config: &CryptosafeConfig) -> Result<(), SafeError> {
    if let Commands::Config = cli.command {
        let rendered = toml::to_string_pretty(config)
            .map_err(|e| SafeError::Config(format!("failed to render config: {e}")))?;
        print!("{rendered}");
        return Ok(());
    }

    let user = resolve_user(cli.user);
    let app = App::open(config).await?;
    let result = dispatch(&app, &user, cli.command).await;
    let closed = app.close().await;
    result.and(closed)
}

async fn dispatch(app: &App, user: &str, command: Commands) -> Result<(), SafeError> {
    if let Commands::Init { force } = command {
        return commands::init(app, user, force).await;
    }

    commands::unlock(app, user).await?;
    match command {
        Commands::Add(entry) => commands::add(app, entry).await,
        Commands::List => commands::list(app).await,
        Commands::Show { id, reveal } => commands::show(app, id, reveal).await,
        Commands::Update { id, entry } => commands::update(app, id, entry).await,
        Commands::Rm { id } => commands::remove(app, id).await,
        Commands::Audit { limit } => commands::audit(app, limit).await,
        Commands::Set { key, value, encrypt } => {
            commands::set_setting(app, &key, &value, encrypt).await
        }
        Commands::Get { key, default } => {
            commands::get_setting(app, &key, default.as_deref()).await
        }
        Commands::Init { .. } | Commands::Config => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_add_with_tags() {
        let cli = Cli::try_parse_from([
            "cryptosafe",
            "add",
            "GitHub",
            "--username",
            "nak",
            "--url",
            "https://github.com",
            "--tags",
            "dev,work",
        ])
        .unwrap();
        match cli.command {
            Commands::Add(entry) => {
                assert_eq!(entry.title, "GitHub");
                assert_eq!(entry.username, "nak");
                assert_eq!(entry.tags, vec!["dev", "work"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn explicit_user_wins() {
        assert_eq!(resolve_user(Some("nak".into())), "nak");
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = cryptosafe_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.bus.workers, 2);
    }
}
