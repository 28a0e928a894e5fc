// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Synchronization of local contacts, events and tasks with `CalDAV` and
//! `CardDAV` collections.
//!
//! A [`SyncManager`] reconciles one [`LocalCollection`] with one
//! [`RemoteCollection`]: it pushes local deletions and edits, downloads what
//! changed on the server, removes what disappeared there, and stores the
//! collection's change token once everything succeeded.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_debug_implementations,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
#![allow(clippy::missing_errors_doc, clippy::match_bool)]

mod config;
mod error;
mod kind;
mod local;
mod localdb;
mod manager;
mod plan;
mod remote;
mod report;
mod state;
mod worker;

pub use crate::config::{APP_NAME, AccountConfig, CollectionConfig, Config};
pub use crate::error::{StorageError, SyncError};
pub use crate::kind::{Entity, ParseError, ResourceKind};
pub use crate::local::{FLAG_REMOTELY_PRESENT, LocalCollection, LocalResource, ResourceId};
pub use crate::localdb::{CollectionRecord, LocalDb, PendingChanges, SqliteCollection};
pub use crate::manager::{MAX_MULTIGET_RESOURCES, SyncManager, SyncPhase};
pub use crate::plan::{Deletion, Listing, SyncPlan, Upload, compare};
pub use crate::remote::RemoteCollection;
pub use crate::report::{ResourceError, SyncOutcome, SyncReport, SyncStats};
pub use crate::state::SyncState;
pub use crate::worker::{SyncHandle, SyncWorker};
