// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! `WebDAV` collection client for `CalDAV` (RFC 4791) and `CardDAV` (RFC 6352) servers.
//!
//! The client works on a single collection URL and exposes the requests a
//! synchronization pass needs: change token discovery, listing, bulk and
//! single retrieval, conditional upload, and deletion.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(
    clippy::option_option,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::match_bool
)]

mod client;
mod config;
mod error;
mod http;
mod request;
mod response;
mod types;
mod xml;

pub use crate::client::{DavCollection, FetchedResource};
pub use crate::config::{AuthMethod, DavConfig};
pub use crate::error::DavError;
pub use crate::http::{HttpClient, Precondition};
pub use crate::request::{
    AddressbookQueryRequest, CalendarQueryRequest, MultiGetRequest, Prop, PropFindRequest,
    SyncCollectionRequest,
};
pub use crate::response::{MultiStatusResponse, PropStat, Properties, ResponseItem};
pub use crate::types::{
    CollectionTokens, CollectionType, ETag, Href, RemoteChanges, RemoteEntry,
};
pub use reqwest::Url;
