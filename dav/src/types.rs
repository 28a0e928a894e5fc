// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::ops::Deref;

/// Resource href (path).
///
/// A `Href` represents the path to a resource on a `WebDAV` server,
/// such as `/calendars/user/tasks/event1.ics`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Href(String);

impl Href {
    /// Creates a new `Href` from a string.
    #[must_use]
    pub const fn new(href: String) -> Self {
        Self(href)
    }

    /// Returns the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the last non-empty path segment, the name a resource is stored
    /// under locally.
    ///
    /// ```
    /// use davsync_dav::Href;
    ///
    /// assert_eq!(Href::from("/dav/tasks/foo.ics").file_name(), "foo.ics");
    /// assert_eq!(Href::from("/dav/tasks/").file_name(), "tasks");
    /// ```
    #[must_use]
    pub fn file_name(&self) -> &str {
        let path = self.0.split(['?', '#']).next().unwrap_or_default();
        path.trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }
}

impl Deref for Href {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Href {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Href {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Href {
    fn from(href: String) -> Self {
        Self(href)
    }
}

impl From<&str> for Href {
    fn from(href: &str) -> Self {
        Self(href.to_string())
    }
}

/// Entity tag for change detection.
///
/// An `ETag` represents an entity tag returned by the server, used for
/// optimistic concurrency control and change detection. Weak validators
/// (`W/"..."`) are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ETag(String);

impl ETag {
    /// Creates a new `ETag` from a string.
    #[must_use]
    pub const fn new(etag: String) -> Self {
        Self(etag)
    }

    /// Returns the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for ETag {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for ETag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ETag {
    fn from(etag: String) -> Self {
        Self(etag)
    }
}

impl From<&str> for ETag {
    fn from(etag: &str) -> Self {
        Self(etag.to_string())
    }
}

/// Kind of `WebDAV` collection, which decides namespaces, report names and
/// media types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionType {
    /// `CalDAV` calendar collection (events, tasks).
    Calendar,
    /// `CardDAV` address book collection (contacts).
    AddressBook,
}

impl CollectionType {
    /// Media type used for uploads.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Calendar => "text/calendar; charset=utf-8",
            Self::AddressBook => "text/vcard; charset=utf-8",
        }
    }

    /// Media type accepted on downloads.
    #[must_use]
    pub const fn accept(self) -> &'static str {
        match self {
            Self::Calendar => "text/calendar",
            Self::AddressBook => "text/vcard",
        }
    }
}

/// One member of a remote collection listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// The href of the resource.
    pub href: Href,
    /// The entity tag of the resource.
    pub etag: ETag,
}

impl RemoteEntry {
    /// Creates a new `RemoteEntry`.
    #[must_use]
    pub const fn new(href: Href, etag: ETag) -> Self {
        Self { href, etag }
    }
}

/// Change tokens reported for a collection by a depth-0 PROPFIND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionTokens {
    /// `CalendarServer` `getctag`.
    pub ctag: Option<String>,
    /// RFC 6578 `sync-token`.
    pub sync_token: Option<String>,
}

/// Result of a `sync-collection` REPORT.
#[derive(Debug, Clone, Default)]
pub struct RemoteChanges {
    /// Members added or modified since the requested token.
    pub changed: Vec<RemoteEntry>,
    /// Members removed since the requested token.
    pub removed: Vec<Href>,
    /// Token describing the collection state after these changes.
    pub sync_token: Option<String>,
}
