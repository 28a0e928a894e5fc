// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Resource kinds and their body handling.

use std::collections::HashSet;
use std::fmt;

use davsync_dav::CollectionType;
use icalendar::parser::{read_calendar, unfold};

/// One item stored in a local resource: its UID and the serialized body
/// (iCalendar or vCard text).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// The UID of the item, if the body carries one.
    pub uid: Option<String>,
    /// The body as exchanged with the server.
    pub body: String,
}

impl Entity {
    /// Creates an entity from a body, without parsing it.
    pub fn new(uid: Option<String>, body: impl Into<String>) -> Self {
        Self {
            uid,
            body: body.into(),
        }
    }
}

/// A body the kind's parser rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ParseError(String);

/// Kind of resources a collection holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// `VTODO` components in a `CalDAV` calendar.
    Tasks,
    /// `VEVENT` components in a `CalDAV` calendar.
    Events,
    /// vCards in a `CardDAV` address book.
    Contacts,
}

impl ResourceKind {
    /// Parses the collection type tag stored with a collection.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "tasks" => Some(Self::Tasks),
            "events" => Some(Self::Events),
            "contacts" => Some(Self::Contacts),
            _ => None,
        }
    }

    /// The collection type tag.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Events => "events",
            Self::Contacts => "contacts",
        }
    }

    /// The `WebDAV` collection type holding this kind.
    #[must_use]
    pub const fn collection_type(self) -> CollectionType {
        match self {
            Self::Tasks | Self::Events => CollectionType::Calendar,
            Self::Contacts => CollectionType::AddressBook,
        }
    }

    /// Extension of generated file names.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Tasks | Self::Events => "ics",
            Self::Contacts => "vcf",
        }
    }

    /// Media type of uploads.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        self.collection_type().content_type()
    }

    /// Calendar component a listing is restricted to.
    #[must_use]
    pub const fn component(self) -> Option<&'static str> {
        match self {
            Self::Tasks => Some("VTODO"),
            Self::Events => Some("VEVENT"),
            Self::Contacts => None,
        }
    }

    /// Whether this kind stores calendar data.
    #[must_use]
    pub const fn is_calendar(self) -> bool {
        matches!(self, Self::Tasks | Self::Events)
    }

    /// Generates a fresh file name for a resource that was never uploaded.
    #[must_use]
    pub fn new_file_name(self) -> String {
        format!("{}.{}", uuid::Uuid::new_v4(), self.extension())
    }

    /// Serializes an entity for upload.
    ///
    /// Bodies are stored in wire form, so uploading and downloading again
    /// yields the same bytes.
    #[must_use]
    pub fn serialize(self, entity: &Entity) -> String {
        entity.body.clone()
    }

    /// Parses a downloaded body into the entities it contains.
    ///
    /// Tasks count `VTODO` components. Events count distinct UIDs among
    /// `VEVENT` components, so a recurring event with its overrides is one
    /// entity. Contacts count vCards.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid iCalendar or vCard data.
    pub fn parse(self, body: &str) -> Result<Vec<Entity>, ParseError> {
        match self {
            Self::Tasks | Self::Events => parse_calendar(self, body),
            Self::Contacts => parse_vcards(body),
        }
    }

    /// Returns `entity` with `uid` written into its body if it has none.
    #[must_use]
    pub fn assign_uid(self, entity: &Entity, uid: &str) -> Entity {
        let existing = entity.uid.clone().or_else(|| {
            entity.body.lines().find_map(|line| {
                let (name, value) = line.trim_end().split_once(':')?;
                (name.eq_ignore_ascii_case("UID") && !value.is_empty()).then(|| value.to_string())
            })
        });
        if let Some(existing) = existing {
            return Entity::new(Some(existing), entity.body.clone());
        }

        let begin = match self {
            Self::Tasks => "BEGIN:VTODO",
            Self::Events => "BEGIN:VEVENT",
            Self::Contacts => "BEGIN:VCARD",
        };

        let newline = if entity.body.contains("\r\n") { "\r\n" } else { "\n" };
        let mut body = String::with_capacity(entity.body.len() + uid.len() + 8);
        let mut inserted = false;
        for line in entity.body.split_inclusive('\n') {
            body.push_str(line);
            if !inserted && line.trim_end().eq_ignore_ascii_case(begin) {
                if !line.ends_with('\n') {
                    body.push_str(newline);
                }
                body.push_str("UID:");
                body.push_str(uid);
                body.push_str(newline);
                inserted = true;
            }
        }

        if !inserted {
            tracing::warn!(kind = %self, "no component to carry the UID");
        }
        Entity::new(Some(uid.to_string()), body)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

fn parse_calendar(kind: ResourceKind, body: &str) -> Result<Vec<Entity>, ParseError> {
    let unfolded = unfold(body);
    if !unfolded
        .lines()
        .any(|line| line.trim().eq_ignore_ascii_case("BEGIN:VCALENDAR"))
    {
        return Err(ParseError("missing VCALENDAR".to_string()));
    }

    let calendar = read_calendar(&unfolded).map_err(ParseError)?;
    let component = kind.component().unwrap_or_default();
    let uids = calendar
        .components
        .iter()
        .filter(|c| c.name == component)
        .map(|c| c.find_prop("UID").map(|p| p.val.to_string()));

    let uids: Vec<Option<String>> = match kind {
        ResourceKind::Events => {
            let mut seen = HashSet::new();
            uids.filter(|uid| uid.as_ref().is_none_or(|uid| seen.insert(uid.clone())))
                .collect()
        }
        _ => uids.collect(),
    };

    Ok(uids
        .into_iter()
        .map(|uid| Entity::new(uid, body))
        .collect())
}

fn parse_vcards(body: &str) -> Result<Vec<Entity>, ParseError> {
    let unfolded = unfold(body);
    let mut entities = Vec::new();
    let mut current: Option<(Option<String>, String)> = None;

    for line in unfolded.lines() {
        let trimmed = line.trim_end_matches('\r');
        if trimmed.eq_ignore_ascii_case("BEGIN:VCARD") {
            if current.is_some() {
                return Err(ParseError("nested BEGIN:VCARD".to_string()));
            }
            current = Some((None, String::new()));
        }

        let Some((uid, card)) = current.as_mut() else {
            if !trimmed.trim().is_empty() {
                return Err(ParseError(format!("content outside of a vCard: {trimmed}")));
            }
            continue;
        };

        card.push_str(trimmed);
        card.push_str("\r\n");
        if let Some(value) = property_value(trimmed, "UID") {
            *uid = Some(value.to_string());
        }

        if trimmed.eq_ignore_ascii_case("END:VCARD") {
            if let Some((uid, card)) = current.take() {
                entities.push(Entity::new(uid, card));
            }
        }
    }

    if current.is_some() {
        return Err(ParseError("unterminated vCard".to_string()));
    }
    if entities.is_empty() {
        return Err(ParseError("missing BEGIN:VCARD".to_string()));
    }

    // A single card keeps the body exactly as the server sent it
    if let [entity] = entities.as_mut_slice() {
        entity.body = body.to_string();
    }
    Ok(entities)
}

/// Value of a content line named `name`, ignoring parameters.
fn property_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let (head, value) = line.split_once(':')?;
    let prop = head.split(';').next()?;
    prop.eq_ignore_ascii_case(name).then_some(value.trim())
}
