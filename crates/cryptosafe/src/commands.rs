// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand handlers. Output goes to stdout; logs go to stderr.

use cryptosafe_core::SafeError;
use cryptosafe_vault::{EntryInput, EntrySummary};
use secrecy::{ExposeSecret, SecretString};

use crate::app::App;
use crate::prompt::{self, ENTRY_PASSWORD_ENV_VAR, MASTER_PASSWORD_ENV_VAR};

/// Entry fields as given on the command line.
#[derive(Debug, Clone, clap::Args)]
pub struct EntryArgs {
    /// Entry title.
    pub title: String,
    /// Account name for the entry.
    #[arg(long, default_value = "")]
    pub username: String,
    #[arg(long, default_value = "")]
    pub url: String,
    /// Free-form notes, stored encrypted.
    #[arg(long)]
    pub notes: Option<String>,
    /// Comma-separated tags.
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
}

impl EntryArgs {
    fn into_input(self, password: SecretString) -> EntryInput {
        let mut input = EntryInput::new(self.title, password)
            .username(self.username)
            .url(self.url)
            .tags(self.tags);
        if let Some(notes) = self.notes {
            input = input.notes(SecretString::from(notes));
        }
        input
    }
}

/// Create the master key. Refuses to replace an existing one unless `force`.
pub async fn init(app: &App, user: &str, force: bool) -> Result<(), SafeError> {
    if app.access.is_initialized().await? && !force {
        return Err(SafeError::invalid(
            "vault already initialized -- pass --force to replace the master key \
             (existing entries become unreadable)",
        ));
    }
    let password = prompt::read_new_secret(MASTER_PASSWORD_ENV_VAR, "master password")?;
    app.access.setup(user, &password).await?;
    println!("Vault initialized for {user}.");
    Ok(())
}

/// Prompt for the master password and unlock the session.
pub async fn unlock(app: &App, user: &str) -> Result<(), SafeError> {
    let password = prompt::read_secret(MASTER_PASSWORD_ENV_VAR, "master password")?;
    app.access.unlock(user, &password).await
}

pub async fn add(app: &App, entry: EntryArgs) -> Result<(), SafeError> {
    let password = prompt::read_secret(ENTRY_PASSWORD_ENV_VAR, "entry password")?;
    let id = app.entries.add(entry.into_input(password)).await?;
    println!("Added entry {id}.");
    Ok(())
}

pub async fn list(app: &App) -> Result<(), SafeError> {
    let entries = app.entries.list().await?;
    if entries.is_empty() {
        println!("No entries.");
        return Ok(());
    }
    for line in format_summaries(&entries) {
        println!("{line}");
    }
    Ok(())
}

pub async fn show(app: &App, id: i64, reveal: bool) -> Result<(), SafeError> {
    let entry = app.entries.get_by_id(id).await?;
    let password = if reveal {
        entry.password.expose_secret().to_string()
    } else {
        "********".to_string()
    };
    println!("id:       {}", entry.id);
    println!("title:    {}", entry.title);
    println!("username: {}", entry.username);
    println!("password: {password}");
    println!("url:      {}", entry.url);
    if reveal && !entry.notes.expose_secret().is_empty() {
        println!("notes:    {}", entry.notes.expose_secret());
    }
    println!("tags:     {}", entry.tags.join(", "));
    println!("created:  {}", entry.created_at);
    println!("updated:  {}", entry.updated_at);
    Ok(())
}

pub async fn update(app: &App, id: i64, entry: EntryArgs) -> Result<(), SafeError> {
    let password = prompt::read_secret(ENTRY_PASSWORD_ENV_VAR, "entry password")?;
    app.entries.update(id, entry.into_input(password)).await?;
    println!("Updated entry {id}.");
    Ok(())
}

pub async fn remove(app: &App, id: i64) -> Result<(), SafeError> {
    if app.entries.delete(id).await? {
        println!("Deleted entry {id}.");
    } else {
        println!("No entry {id}.");
    }
    Ok(())
}

pub async fn audit(app: &App, limit: usize) -> Result<(), SafeError> {
    for record in app.audit.last(limit).await? {
        let entry = record
            .entry_id
            .map(|id| format!(" entry={id}"))
            .unwrap_or_default();
        println!(
            "{:>5}  {}  {:<14}{entry}  {}",
            record.id, record.timestamp, record.action, record.details
        );
    }
    Ok(())
}

pub async fn set_setting(app: &App, key: &str, value: &str, encrypt: bool) -> Result<(), SafeError> {
    app.settings.set(key, value, encrypt).await?;
    println!("Set {key}.");
    Ok(())
}

pub async fn get_setting(app: &App, key: &str, default: Option<&str>) -> Result<(), SafeError> {
    match app.settings.get(key, default).await? {
        Some(value) => println!("{value}"),
        None => return Err(SafeError::not_found(format!("setting `{key}`"))),
    }
    Ok(())
}

fn format_summaries(entries: &[EntrySummary]) -> Vec<String> {
    let title_width = entries
        .iter()
        .map(|e| e.title.chars().count())
        .max()
        .unwrap_or(0)
        .max("TITLE".len());
    let mut lines = vec![format!(
        "{:>5}  {:<title_width$}  {:<20}  UPDATED",
        "ID", "TITLE", "USERNAME"
    )];
    lines.extend(entries.iter().map(|e| {
        format!(
            "{:>5}  {:<title_width$}  {:<20}  {}",
            e.id, e.title, e.username, e.updated_at
        )
    }));
    lines
}
