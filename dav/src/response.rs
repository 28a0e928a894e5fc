// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Response parsers for `WebDAV` multistatus bodies.

use quick_xml::events::Event;

use crate::client::FetchedResource;
use crate::error::DavError;
use crate::types::{CollectionTokens, ETag, Href, RemoteChanges, RemoteEntry};
use crate::xml::{read_child_names, read_text, status_code};

/// `WebDAV` multistatus response.
#[derive(Debug, Clone, Default)]
pub struct MultiStatusResponse {
    /// The response items.
    pub responses: Vec<ResponseItem>,
    /// Top-level `sync-token` of a `sync-collection` report.
    pub sync_token: Option<String>,
}

/// Individual response in multistatus.
#[derive(Debug, Clone, Default)]
pub struct ResponseItem {
    /// The href the response describes.
    pub href: Href,
    /// Property groups, one per status.
    pub prop_stats: Vec<PropStat>,
    /// Response-level status, used for members without properties (e.g. removed ones).
    pub status: Option<String>,
}

/// Property stat with status and value.
#[derive(Debug, Clone, Default)]
pub struct PropStat {
    /// The properties.
    pub props: Properties,
    /// Status line, e.g. `HTTP/1.1 200 OK`.
    pub status: String,
}

/// `WebDAV` properties this crate understands.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    /// Local names of the `resourcetype` children.
    pub resource_type: Vec<String>,
    /// `getetag`.
    pub get_etag: Option<ETag>,
    /// `getctag`.
    pub get_ctag: Option<String>,
    /// `sync-token`.
    pub sync_token: Option<String>,
    /// `calendar-data` or `address-data`.
    pub data: Option<String>,
}

impl PropStat {
    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        status_code(&self.status).is_some_and(|code| (200..300).contains(&code))
    }
}

impl ResponseItem {
    /// Whether the member was found: a 2xx response status, or (without
    /// one) at least one 2xx propstat.
    #[must_use]
    pub fn is_success(&self) -> bool {
        match self.status.as_deref().and_then(status_code) {
            Some(code) => (200..300).contains(&code),
            None => self.prop_stats.iter().any(PropStat::is_success),
        }
    }

    /// Whether the server reports the member as gone (404).
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.status.as_deref().and_then(status_code) == Some(404)
    }

    /// Properties of the first successful propstat.
    #[must_use]
    pub fn props(&self) -> Option<&Properties> {
        self.prop_stats
            .iter()
            .find(|p| p.is_success())
            .map(|p| &p.props)
    }

    fn is_collection(&self) -> bool {
        self.props()
            .is_some_and(|p| p.resource_type.iter().any(|t| t == "collection"))
    }
}

impl MultiStatusResponse {
    /// Parses multistatus response from XML.
    ///
    /// # Errors
    ///
    /// Returns an error if XML parsing fails.
    pub fn from_xml(xml: &str) -> Result<Self, DavError> {
        let mut reader = quick_xml::Reader::from_str(xml);
        reader.config_mut().check_end_names = true;

        let mut multistatus = Self::default();
        let mut current_response: Option<ResponseItem> = None;
        let mut current_props: Option<Properties> = None;
        let mut propstat_status = String::new();

        loop {
            match reader.read_event()? {
                Event::Eof => break,

                Event::Start(ref e) => match e.name().local_name().into_inner() {
                    b"response" => current_response = Some(ResponseItem::default()),
                    b"propstat" if current_response.is_some() => {
                        current_props = Some(Properties::default());
                        propstat_status.clear();
                    }
                    name => {
                        let name = name.to_vec();
                        Self::read_element(
                            &mut reader,
                            &name,
                            &mut multistatus,
                            current_response.as_mut(),
                            current_props.as_mut(),
                            &mut propstat_status,
                        )?;
                    }
                },

                Event::End(ref e) => match e.name().local_name().into_inner() {
                    b"propstat" => {
                        if let (Some(resp), Some(props)) =
                            (current_response.as_mut(), current_props.take())
                        {
                            resp.prop_stats.push(PropStat {
                                props,
                                status: std::mem::take(&mut propstat_status),
                            });
                        }
                    }
                    b"response" => {
                        if let Some(resp) = current_response.take() {
                            multistatus.responses.push(resp);
                        }
                    }
                    _ => {}
                },

                _ => {}
            }
        }

        Ok(multistatus)
    }

    /// Handles an element whose start tag was just read. Elements this parser
    /// does not know are left for the main loop to skip.
    fn read_element(
        reader: &mut quick_xml::Reader<&[u8]>,
        name: &[u8],
        multistatus: &mut Self,
        response: Option<&mut ResponseItem>,
        props: Option<&mut Properties>,
        propstat_status: &mut String,
    ) -> Result<(), DavError> {
        match (name, response, props) {
            // Inside <D:prop>
            (b"getetag", _, Some(props)) => {
                let etag = read_text(reader)?;
                let etag = etag.trim();
                if !etag.is_empty() {
                    props.get_etag = Some(ETag::from(etag));
                }
            }
            (b"getctag", _, Some(props)) => props.get_ctag = non_empty(&read_text(reader)?),
            (b"sync-token", _, Some(props)) => props.sync_token = non_empty(&read_text(reader)?),
            (b"calendar-data" | b"address-data", _, Some(props)) => {
                props.data = Some(read_text(reader)?);
            }
            (b"resourcetype", _, Some(props)) => props.resource_type = read_child_names(reader)?,
            (b"status", _, Some(_)) => *propstat_status = read_text(reader)?.trim().to_string(),

            // Directly inside <D:response>
            (b"href", Some(resp), None) => resp.href = Href::new(read_text(reader)?.trim().into()),
            (b"status", Some(resp), None) => resp.status = Some(read_text(reader)?.trim().into()),

            // Directly inside <D:multistatus>
            (b"sync-token", None, None) => multistatus.sync_token = non_empty(&read_text(reader)?),

            _ => {}
        }
        Ok(())
    }

    /// Converts a listing into its members, skipping the collection itself
    /// and members reported without `ETag`.
    #[must_use]
    pub fn into_entries(self) -> Vec<RemoteEntry> {
        let mut entries = Vec::with_capacity(self.responses.len());
        for response in self.responses {
            if !response.is_success() || response.is_collection() {
                continue;
            }

            match response.props().and_then(|p| p.get_etag.clone()) {
                Some(etag) => entries.push(RemoteEntry::new(response.href, etag)),
                None => tracing::warn!(href = %response.href, "listed member has no ETag, ignoring"),
            }
        }
        entries
    }

    /// Converts a `sync-collection` report into changed and removed members.
    #[must_use]
    pub fn into_changes(self) -> RemoteChanges {
        let mut changes = RemoteChanges {
            sync_token: self.sync_token,
            ..RemoteChanges::default()
        };

        for response in self.responses {
            if response.is_removed() {
                changes.removed.push(response.href);
            } else if response.is_success() && !response.is_collection() {
                match response.props().and_then(|p| p.get_etag.clone()) {
                    Some(etag) => changes.changed.push(RemoteEntry::new(response.href, etag)),
                    None => tracing::warn!(href = %response.href, "changed member has no ETag, ignoring"),
                }
            }
        }
        changes
    }

    /// Converts a multiget report into fetched resources. Entries are kept
    /// even when unsuccessful or incomplete so callers can report them.
    #[must_use]
    pub fn into_fetched(self) -> Vec<FetchedResource> {
        self.responses
            .into_iter()
            .map(|response| {
                let success = response.is_success();
                let (etag, data) = response
                    .props()
                    .map(|p| (p.get_etag.clone(), p.data.clone()))
                    .unwrap_or_default();
                FetchedResource {
                    href: response.href,
                    etag,
                    data,
                    success,
                }
            })
            .collect()
    }

    /// Extracts the change tokens of the first successful response.
    #[must_use]
    pub fn into_tokens(self) -> CollectionTokens {
        self.responses
            .iter()
            .find_map(ResponseItem::props)
            .map(|p| CollectionTokens {
                ctag: p.get_ctag.clone(),
                sync_token: p.sync_token.clone(),
            })
            .unwrap_or_default()
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
