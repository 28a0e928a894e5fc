// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use std::sync::Arc;

use clap::{ArgMatches, Command, arg};
use colored::Colorize;
use davsync_core::{
    AccountConfig, CollectionConfig, Config, LocalDb, SqliteCollection, SyncManager, SyncOutcome,
    SyncReport, SyncWorker,
};
use davsync_dav::{DavCollection, HttpClient};

type Job<'a> = (
    &'a AccountConfig,
    &'a CollectionConfig,
    SyncManager<SqliteCollection, DavCollection>,
);

#[derive(Debug, Clone, Default)]
pub struct CmdSync {
    pub account: Option<String>,
    pub collection: Option<String>,
}

impl CmdSync {
    pub const NAME: &str = "sync";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Synchronize the configured collections with their servers")
            .arg(arg!(-a --account [ACCOUNT] "Only synchronize the collections of this account"))
            .arg(arg!(--collection [URL] "Only synchronize the collection at this URL"))
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            account: matches.get_one("account").cloned(),
            collection: matches.get_one("collection").cloned(),
        }
    }

    /// Run one pass for every selected collection, all accounts concurrently.
    pub async fn run(self, config: &Config, db: &LocalDb) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "synchronizing...");

        let worker = SyncWorker::new();
        let jobs: Vec<_> = self
            .prepare(config, db)
            .await?
            .into_iter()
            .map(|(account, collection, manager)| {
                (account, collection, worker.spawn(Arc::new(manager)))
            })
            .collect();

        let tokens: Vec<_> = jobs
            .iter()
            .map(|(_, _, handle)| handle.cancellation_token())
            .collect();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling synchronization");
                for token in tokens {
                    token.cancel();
                }
            }
        });

        let mut failed = 0;
        for (account, collection, handle) in jobs {
            let name = collection
                .display_name
                .as_deref()
                .unwrap_or(&collection.url);
            match handle.await {
                Ok(report) => print_report(&account.name, name, &report),
                Err(e) => {
                    failed += 1;
                    let hint = match e.is_retryable() {
                        true => " (will retry next time)",
                        false => "",
                    };
                    println!("{} {} {}: {}{}", "✗".red(), account.name.bold(), name, e, hint);
                }
            }
        }
        interrupt.abort();

        match failed {
            0 => Ok(()),
            1 => Err("1 collection failed to synchronize".into()),
            n => Err(format!("{n} collections failed to synchronize").into()),
        }
    }

    /// Opens every selected collection. Nothing is spawned or stored unless
    /// all of them are valid.
    async fn prepare<'a>(
        &self,
        config: &'a Config,
        db: &LocalDb,
    ) -> Result<Vec<Job<'a>>, Box<dyn Error>> {
        let mut remotes = Vec::new();
        for account in self.accounts(config)? {
            let http = Arc::new(HttpClient::new(&account.dav_config())?);
            for collection in account.collections.iter().filter(|c| self.selects(c)) {
                let remote = DavCollection::with_http(
                    Arc::clone(&http),
                    &collection.url,
                    collection.kind.collection_type(),
                )
                .map_err(|e| format!("{} {}: {e}", account.name, collection.url))?;
                remotes.push((account, collection, remote));
            }
        }

        if remotes.is_empty() {
            return Err("No collection to synchronize".into());
        }

        let mut jobs = Vec::with_capacity(remotes.len());
        for (account, collection, remote) in remotes {
            let local = db
                .collection(
                    &collection.url,
                    collection.kind,
                    collection.display_name.as_deref(),
                )
                .await?;
            jobs.push((account, collection, SyncManager::new(local, remote)));
        }
        Ok(jobs)
    }

    fn accounts<'a>(&self, config: &'a Config) -> Result<Vec<&'a AccountConfig>, Box<dyn Error>> {
        match &self.account {
            Some(name) => match config.account(name) {
                Some(account) => Ok(vec![account]),
                None => Err(format!("No account named {name}").into()),
            },
            None if config.accounts.is_empty() => Err("No accounts configured".into()),
            None => Ok(config.accounts.iter().collect()),
        }
    }

    fn selects(&self, collection: &CollectionConfig) -> bool {
        self.collection
            .as_ref()
            .is_none_or(|url| *url == collection.url)
    }
}

fn print_report(account: &str, collection: &str, report: &SyncReport) {
    let mark = match report.is_clean() {
        true => "✓".green(),
        false => "!".yellow(),
    };
    let summary = match report.outcome {
        SyncOutcome::Unchanged if report.stats == Default::default() => "up to date".to_string(),
        _ => report.stats.to_string(),
    };
    println!("{} {} {}: {}", mark, account.bold(), collection, summary);

    for error in &report.errors {
        println!("    {} {}: {}", "-".yellow(), error.href, error.error);
    }
}
