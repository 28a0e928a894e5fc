// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use clap::{ArgMatches, Command, arg};
use colored::{ColoredString, Colorize};
use davsync_core::{CollectionRecord, Config, LocalDb, PendingChanges, ResourceKind, SyncState};

#[derive(Debug, Default, Clone, Copy)]
pub struct CmdStatus {
    pub prune: bool,
}

impl CmdStatus {
    pub const NAME: &str = "status";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Show the local state of every synchronized collection")
            .arg(arg!(--prune "Forget collections that are no longer configured"))
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            prune: matches.get_flag("prune"),
        }
    }

    /// Print pending changes and the last change token of each collection.
    pub async fn run(self, config: &Config, db: &LocalDb) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "listing collections...");

        let records = db.list_collections().await?;
        if records.is_empty() {
            println!("No collections synchronized yet");
            return Ok(());
        }

        for record in records {
            let configured = is_configured(config, &record.url);
            if self.prune && !configured {
                db.remove_collection(&record.url).await?;
                println!("{} {}", "Forgot".yellow(), record.url);
                continue;
            }

            let Some(kind) = ResourceKind::from_tag(&record.kind) else {
                tracing::warn!(url = record.url, kind = record.kind, "unknown collection kind");
                continue;
            };
            let pending = db
                .collection(&record.url, kind, record.display_name.as_deref())
                .await?
                .pending()
                .await?;

            print_collection(&record, kind, &pending, configured);
        }
        Ok(())
    }
}

fn is_configured(config: &Config, url: &str) -> bool {
    config
        .accounts
        .iter()
        .flat_map(|a| a.collections.iter())
        .any(|c| c.url == url)
}

fn print_collection(
    record: &CollectionRecord,
    kind: ResourceKind,
    pending: &PendingChanges,
    configured: bool,
) {
    let name = record.display_name.as_deref().unwrap_or(&record.url);
    print!("{} {} ({kind})", bullet(record.color.as_deref()), name.bold());
    if !configured {
        print!(" {}", "not configured".dimmed());
    }
    println!();
    println!("    {}", record.url.dimmed());

    let state = match record.change_token.as_deref().map(SyncState::decode) {
        Some(state) => format!("synchronized at {}", state.value()).normal(),
        None => "never synchronized".yellow(),
    };
    let changes = match pending.dirty + pending.deleted {
        0 => "no local changes".normal(),
        _ => format!(
            "{} modified, {} deleted locally",
            pending.dirty, pending.deleted
        )
        .yellow(),
    };
    println!("    {} resources, {changes}, {state}", pending.resources);
}

fn bullet(color: Option<&str>) -> ColoredString {
    match color.and_then(parse_hex_color) {
        Some((r, g, b)) => "●".truecolor(r, g, b),
        None => "●".normal(),
    }
}

/// Parses a `#RRGGBB` color.
fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}
