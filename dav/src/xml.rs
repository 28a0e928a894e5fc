// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! XML utilities for WebDAV/CalDAV/CardDAV processing.

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};

use crate::error::DavError;

/// XML namespaces used in `WebDAV` requests, with the prefixes this crate
/// writes them under.
pub mod ns {
    /// `WebDAV` namespace.
    pub const DAV: &str = "DAV:";

    /// `CalDAV` namespace.
    pub const CALDAV: &str = "urn:ietf:params:xml:ns:caldav";

    /// `CardDAV` namespace.
    pub const CARDDAV: &str = "urn:ietf:params:xml:ns:carddav";

    /// `CalendarServer` namespace (`getctag`).
    pub const CALSERVER: &str = "http://calendarserver.org/ns/";
}

/// Reads the text content of the element whose start tag was just consumed,
/// up to and including its end tag.
///
/// Text of nested elements is concatenated; entity and character references
/// are resolved.
///
/// # Errors
///
/// Returns an error if XML parsing fails or the document ends early.
pub fn read_text(reader: &mut Reader<&[u8]>) -> Result<String, DavError> {
    let mut text = String::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let decoded = e.decode().map_err(|e| DavError::Xml(e.to_string()))?;
                text.push_str(&decoded);
            }
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(&e)),
            Event::GeneralRef(e) => push_reference(&mut text, &e)?,
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Eof => return Err(DavError::Xml("Unexpected EOF".to_string())),
            _ => {}
        }
    }

    Ok(text)
}

/// Collects the local names of the child elements of the element whose start
/// tag was just consumed, up to and including its end tag.
///
/// Used for `resourcetype` and `supported-calendar-component-set`, where the
/// value is a set of (usually empty) child elements. For elements carrying a
/// `name` attribute, such as `<C:comp name="VTODO"/>`, the attribute value is
/// collected instead.
///
/// # Errors
///
/// Returns an error if XML parsing fails or the document ends early.
pub fn read_child_names(reader: &mut Reader<&[u8]>) -> Result<Vec<String>, DavError> {
    let mut names = Vec::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Empty(e) if depth == 0 => names.push(child_name(&e)),
            Event::Start(e) if depth == 0 => {
                names.push(child_name(&e));
                depth += 1;
            }
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Eof => return Err(DavError::Xml("Unexpected EOF".to_string())),
            _ => {}
        }
    }

    Ok(names)
}

/// Parses the numeric code out of a status line such as `HTTP/1.1 200 OK`.
pub fn status_code(status: &str) -> Option<u16> {
    status.split_whitespace().nth(1)?.parse().ok()
}

fn child_name(e: &BytesStart<'_>) -> String {
    match e.try_get_attribute("name") {
        Ok(Some(attr)) => String::from_utf8_lossy(&attr.value).into_owned(),
        _ => String::from_utf8_lossy(e.name().local_name().into_inner()).into_owned(),
    }
}

fn push_reference(text: &mut String, e: &BytesRef<'_>) -> Result<(), DavError> {
    if let Some(ch) = e
        .resolve_char_ref()
        .map_err(|e| DavError::Xml(e.to_string()))?
    {
        text.push(ch);
        return Ok(());
    }

    let name = e.decode().map_err(|e| DavError::Xml(e.to_string()))?;
    match resolve_predefined_entity(&name) {
        Some(resolved) => text.push_str(resolved),
        None => {
            text.push('&');
            text.push_str(&name);
            text.push(';');
        }
    }
    Ok(())
}
