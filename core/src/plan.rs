// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Comparison of local and remote state into the work of a pass.

use std::collections::{BTreeMap, HashMap, HashSet};

use davsync_dav::{Href, Precondition, RemoteChanges, RemoteEntry};

use crate::local::LocalResource;

/// What the pass learned about the remote members.
#[derive(Debug, Clone)]
pub enum Listing {
    /// The collection was unchanged, nothing was listed.
    Skipped,
    /// Every member, from a full listing.
    Complete(Vec<RemoteEntry>),
    /// Changes since the stored sync-token.
    Incremental(RemoteChanges),
}

impl Listing {
    /// Entries that may need a download.
    fn entries(&self) -> &[RemoteEntry] {
        match self {
            Self::Skipped => &[],
            Self::Complete(entries) => entries,
            Self::Incremental(changes) => &changes.changed,
        }
    }
}

/// A local change to push.
#[derive(Debug, Clone)]
pub struct Upload {
    /// The dirty resource.
    pub resource: LocalResource,
    /// Its file name.
    pub file_name: String,
    /// Condition attached to the PUT.
    pub precondition: Precondition,
}

/// A local deletion to push.
#[derive(Debug, Clone)]
pub struct Deletion {
    /// The deleted resource.
    pub resource: LocalResource,
    /// Its file name.
    pub file_name: String,
}

/// The work of one pass.
#[derive(Debug, Default)]
pub struct SyncPlan {
    /// Remote deletions, run first.
    pub deletions: Vec<Deletion>,
    /// Deleted resources that never reached the server; removed locally only.
    pub discards: Vec<LocalResource>,
    /// Uploads of dirty resources.
    pub uploads: Vec<Upload>,
    /// Members to download, by file name.
    pub downloads: BTreeMap<String, Href>,
    /// Local resources gone from the server.
    pub orphans: Vec<LocalResource>,
}

/// Builds the plan of a pass.
///
/// `all` must reflect the store after unnamed resources got their names; it
/// is only consulted when something was listed.
pub fn compare(
    deleted: Vec<LocalResource>,
    dirty: Vec<LocalResource>,
    all: &[LocalResource],
    listing: &Listing,
) -> SyncPlan {
    let mut plan = SyncPlan::default();

    let by_name: HashMap<&str, &LocalResource> = all
        .iter()
        .filter_map(|r| r.file_name.as_deref().map(|name| (name, r)))
        .collect();

    let (listed, removed): (HashSet<&str>, HashSet<&str>) = match listing {
        Listing::Skipped => (HashSet::new(), HashSet::new()),
        Listing::Complete(entries) => (
            entries.iter().map(|e| e.href.file_name()).collect(),
            HashSet::new(),
        ),
        Listing::Incremental(changes) => (
            changes.changed.iter().map(|e| e.href.file_name()).collect(),
            changes.removed.iter().map(Href::file_name).collect(),
        ),
    };

    let mut deleted_names = HashSet::new();
    for resource in deleted {
        match resource.file_name.clone() {
            Some(file_name) => {
                deleted_names.insert(file_name.clone());
                plan.deletions.push(Deletion {
                    resource,
                    file_name,
                });
            }
            None => plan.discards.push(resource),
        }
    }

    for resource in dirty {
        if resource.deleted {
            continue;
        }
        let Some(file_name) = resource.file_name.clone() else {
            continue;
        };

        let present = match listing {
            Listing::Skipped => resource.is_remotely_present(),
            Listing::Complete(_) => listed.contains(file_name.as_str()),
            Listing::Incremental(_) => {
                !removed.contains(file_name.as_str())
                    && (resource.is_remotely_present() || listed.contains(file_name.as_str()))
            }
        };
        let precondition = match (&resource.etag, present) {
            (Some(etag), true) => Precondition::IfMatch(etag.clone()),
            _ => Precondition::IfNoneMatch,
        };

        plan.uploads.push(Upload {
            resource,
            file_name,
            precondition,
        });
    }

    for entry in listing.entries() {
        let name = entry.href.file_name();
        if deleted_names.contains(name) {
            continue;
        }

        let changed = by_name
            .get(name)
            .is_none_or(|local| local.etag.as_ref() != Some(&entry.etag));
        if changed {
            plan.downloads.insert(name.to_string(), entry.href.clone());
        }
    }

    plan.orphans = match listing {
        Listing::Skipped => Vec::new(),
        Listing::Complete(_) => all
            .iter()
            .filter(|r| !r.dirty && !r.deleted)
            .filter(|r| {
                r.file_name
                    .as_deref()
                    .is_some_and(|name| !listed.contains(name))
            })
            .cloned()
            .collect(),
        Listing::Incremental(_) => removed
            .iter()
            .filter_map(|name| by_name.get(name))
            .filter(|r| !r.dirty && !r.deleted)
            .map(|r| (*r).clone())
            .collect(),
    };

    plan
}
