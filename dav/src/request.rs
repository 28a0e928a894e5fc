// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Request builders for `WebDAV` operations.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::error::DavError;
use crate::types::CollectionType;
use crate::xml::ns;

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// PROPFIND request builder.
#[derive(Debug)]
pub struct PropFindRequest {
    props: Vec<Prop>,
}

/// Properties to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prop {
    /// Resource type.
    ResourceType,
    /// `ETag`.
    GetETag,
    /// Collection tag (`CalendarServer` extension).
    GetCTag,
    /// Collection sync token (RFC 6578).
    SyncToken,
    /// Calendar data.
    CalendarData,
    /// Address data.
    AddressData,
}

impl Prop {
    const fn name(self) -> &'static str {
        match self {
            Self::ResourceType => "resourcetype",
            Self::GetETag => "getetag",
            Self::GetCTag => "getctag",
            Self::SyncToken => "sync-token",
            Self::CalendarData => "calendar-data",
            Self::AddressData => "address-data",
        }
    }

    /// Namespace prefix the property is written with.
    const fn prefix(self) -> &'static str {
        match self {
            Self::ResourceType | Self::GetETag | Self::SyncToken => "D",
            Self::GetCTag => "CS",
            Self::CalendarData => "C",
            Self::AddressData => "CR",
        }
    }

    /// The property carrying resource bodies in a collection of this type.
    #[must_use]
    pub const fn data_for(collection: CollectionType) -> Self {
        match collection {
            CollectionType::Calendar => Self::CalendarData,
            CollectionType::AddressBook => Self::AddressData,
        }
    }
}

impl PropFindRequest {
    /// Creates a new PROPFIND request.
    #[must_use]
    pub fn new() -> Self {
        Self { props: Vec::new() }
    }

    /// Adds a property to the request.
    pub fn add_property(&mut self, prop: Prop) -> &mut Self {
        self.props.push(prop);
        self
    }

    /// Builds the XML body for the PROPFIND request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, DavError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        // <D:propfind xmlns:D="DAV:" ...>
        let mut propfind = BytesStart::new("D:propfind");
        push_namespaces(&mut propfind, &self.props);
        writer.write_event(Event::Start(propfind))?;

        write_prop(&mut writer, &self.props)?;

        // </D:propfind>
        writer.write_event(Event::End(BytesEnd::new("D:propfind")))?;

        finish(writer)
    }
}

impl Default for PropFindRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Calendar query request builder.
#[derive(Debug)]
pub struct CalendarQueryRequest {
    component: Option<String>,
    include_data: bool,
}

impl CalendarQueryRequest {
    /// Creates a new calendar query request that returns `ETag`s only.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            component: None,
            include_data: false,
        }
    }

    /// Sets the component filter (VEVENT, VTODO, etc.).
    #[must_use]
    pub fn component(mut self, component: String) -> Self {
        self.component = Some(component);
        self
    }

    /// Also requests the calendar data of every match.
    #[must_use]
    pub const fn include_data(mut self) -> Self {
        self.include_data = true;
        self
    }

    /// Builds the XML body for the calendar query request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, DavError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        // <C:calendar-query xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
        let mut calendar_query = BytesStart::new("C:calendar-query");
        calendar_query.push_attribute(("xmlns:D", ns::DAV));
        calendar_query.push_attribute(("xmlns:C", ns::CALDAV));
        writer.write_event(Event::Start(calendar_query))?;

        if self.include_data {
            write_prop(&mut writer, &[Prop::GetETag, Prop::CalendarData])?;
        } else {
            write_prop(&mut writer, &[Prop::GetETag])?;
        }

        // <C:filter>
        writer.write_event(Event::Start(BytesStart::new("C:filter")))?;

        // <C:comp-filter name="VCALENDAR">
        let mut comp_filter = BytesStart::new("C:comp-filter");
        comp_filter.push_attribute(("name", "VCALENDAR"));

        if let Some(component) = &self.component {
            writer.write_event(Event::Start(comp_filter))?;

            let mut comp_filter_inner = BytesStart::new("C:comp-filter");
            comp_filter_inner.push_attribute(("name", component.as_str()));
            writer.write_event(Event::Empty(comp_filter_inner))?;

            writer.write_event(Event::End(BytesEnd::new("C:comp-filter")))?;
        } else {
            writer.write_event(Event::Empty(comp_filter))?;
        }

        // </C:filter>
        writer.write_event(Event::End(BytesEnd::new("C:filter")))?;

        // </C:calendar-query>
        writer.write_event(Event::End(BytesEnd::new("C:calendar-query")))?;

        finish(writer)
    }
}

impl Default for CalendarQueryRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Address book query request builder, listing every vCard with its `ETag`.
#[derive(Debug, Default)]
pub struct AddressbookQueryRequest;

impl AddressbookQueryRequest {
    /// Creates a new address book query request.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Builds the XML body for the address book query request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, DavError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        // <CR:addressbook-query xmlns:D="DAV:" xmlns:CR="urn:ietf:params:xml:ns:carddav">
        let mut query = BytesStart::new("CR:addressbook-query");
        query.push_attribute(("xmlns:D", ns::DAV));
        query.push_attribute(("xmlns:CR", ns::CARDDAV));
        writer.write_event(Event::Start(query))?;

        write_prop(&mut writer, &[Prop::GetETag])?;

        // <CR:filter/> matches every vCard
        writer.write_event(Event::Empty(BytesStart::new("CR:filter")))?;

        writer.write_event(Event::End(BytesEnd::new("CR:addressbook-query")))?;

        finish(writer)
    }
}

/// `calendar-multiget` / `addressbook-multiget` request builder.
#[derive(Debug)]
pub struct MultiGetRequest {
    collection: CollectionType,
    hrefs: Vec<String>,
}

impl MultiGetRequest {
    /// Creates a new multiget request for a collection of the given type.
    #[must_use]
    pub const fn new(collection: CollectionType) -> Self {
        Self {
            collection,
            hrefs: Vec::new(),
        }
    }

    /// Adds an href to the request.
    pub fn add_href(&mut self, href: String) -> &mut Self {
        self.hrefs.push(href);
        self
    }

    /// Builds the XML body for the multiget request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, DavError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        let root = match self.collection {
            CollectionType::Calendar => "C:calendar-multiget",
            CollectionType::AddressBook => "CR:addressbook-multiget",
        };
        let props = [Prop::GetETag, Prop::data_for(self.collection)];

        let mut multiget = BytesStart::new(root);
        push_namespaces(&mut multiget, &props);
        writer.write_event(Event::Start(multiget))?;

        write_prop(&mut writer, &props)?;

        // <D:href> for each href
        for href in &self.hrefs {
            writer.write_event(Event::Start(BytesStart::new("D:href")))?;
            writer.write_event(Event::Text(BytesText::new(href.as_str())))?;
            writer.write_event(Event::End(BytesEnd::new("D:href")))?;
        }

        writer.write_event(Event::End(BytesEnd::new(root)))?;

        finish(writer)
    }
}

/// `sync-collection` REPORT builder (RFC 6578).
#[derive(Debug)]
pub struct SyncCollectionRequest {
    sync_token: Option<String>,
}

impl SyncCollectionRequest {
    /// Creates a request for the changes since `sync_token`, or for every
    /// member when `None`.
    #[must_use]
    pub const fn new(sync_token: Option<String>) -> Self {
        Self { sync_token }
    }

    /// Builds the XML body for the sync-collection request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, DavError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        let mut sync_collection = BytesStart::new("D:sync-collection");
        sync_collection.push_attribute(("xmlns:D", ns::DAV));
        writer.write_event(Event::Start(sync_collection))?;

        match &self.sync_token {
            Some(token) => {
                writer.write_event(Event::Start(BytesStart::new("D:sync-token")))?;
                writer.write_event(Event::Text(BytesText::new(token.as_str())))?;
                writer.write_event(Event::End(BytesEnd::new("D:sync-token")))?;
            }
            None => writer.write_event(Event::Empty(BytesStart::new("D:sync-token")))?,
        }

        writer.write_event(Event::Start(BytesStart::new("D:sync-level")))?;
        writer.write_event(Event::Text(BytesText::new("1")))?;
        writer.write_event(Event::End(BytesEnd::new("D:sync-level")))?;

        // Child collections are reported too and must be told apart
        write_prop(&mut writer, &[Prop::GetETag, Prop::ResourceType])?;

        writer.write_event(Event::End(BytesEnd::new("D:sync-collection")))?;

        finish(writer)
    }
}

/// Declares the namespaces used by `props` on the root element.
fn push_namespaces(root: &mut BytesStart<'_>, props: &[Prop]) {
    root.push_attribute(("xmlns:D", ns::DAV));
    let mut declared: Vec<&str> = vec!["D"];
    for prop in props {
        let prefix = prop.prefix();
        if declared.contains(&prefix) {
            continue;
        }
        declared.push(prefix);
        let uri = match prefix {
            "C" => ns::CALDAV,
            "CR" => ns::CARDDAV,
            _ => ns::CALSERVER,
        };
        root.push_attribute((format!("xmlns:{prefix}").as_str(), uri));
    }
}

/// Writes `<D:prop>` with one empty element per property.
fn write_prop(writer: &mut XmlWriter, props: &[Prop]) -> Result<(), DavError> {
    writer.write_event(Event::Start(BytesStart::new("D:prop")))?;
    for prop in props {
        let name = format!("{}:{}", prop.prefix(), prop.name());
        writer.write_event(Event::Empty(BytesStart::new(name)))?;
    }
    writer.write_event(Event::End(BytesEnd::new("D:prop")))?;
    Ok(())
}

fn finish(writer: XmlWriter) -> Result<String, DavError> {
    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| DavError::Xml(format!("UTF-8 error: {e}")))
}
