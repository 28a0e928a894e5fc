// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! `WebDAV` client bound to one collection.

use std::sync::Arc;

use reqwest::{Method, StatusCode, Url};

use crate::config::DavConfig;
use crate::error::DavError;
use crate::http::{HttpClient, Precondition};
use crate::request::{
    AddressbookQueryRequest, CalendarQueryRequest, MultiGetRequest, Prop, PropFindRequest,
    SyncCollectionRequest,
};
use crate::response::MultiStatusResponse;
use crate::types::{CollectionTokens, CollectionType, ETag, Href, RemoteChanges, RemoteEntry};

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// `WebDAV` client for one calendar or address book collection.
///
/// # Example
///
/// ```ignore
/// use davsync_dav::{AuthMethod, CollectionType, DavCollection, DavConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = DavConfig {
///     auth: AuthMethod::Basic {
///         username: "user".to_string(),
///         password: "pass".to_string(),
///     },
///     ..Default::default()
/// };
///
/// let tasks = DavCollection::new(
///     &config,
///     "https://dav.example.com/calendars/user/tasks/",
///     CollectionType::Calendar,
/// )?;
/// let members = tasks.list(Some("VTODO")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DavCollection {
    http: Arc<HttpClient>,
    url: Url,
    collection: CollectionType,
}

/// A resource body retrieved by GET or multiget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResource {
    /// The href of the resource.
    pub href: Href,
    /// The entity tag, if the server sent one.
    pub etag: Option<ETag>,
    /// The resource body, if the server sent one.
    pub data: Option<String>,
    /// Whether the server reported the member as found.
    pub success: bool,
}

impl DavCollection {
    /// Creates a client for the collection at `url` with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or HTTP client initialization fails.
    pub fn new(config: &DavConfig, url: &str, collection: CollectionType) -> Result<Self, DavError> {
        let http = HttpClient::new(config)?;
        Self::with_http(Arc::new(http), url, collection)
    }

    /// Creates a client for the collection at `url` sharing an HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not an absolute http(s) URL.
    pub fn with_http(
        http: Arc<HttpClient>,
        url: &str,
        collection: CollectionType,
    ) -> Result<Self, DavError> {
        let mut url =
            Url::parse(url).map_err(|e| DavError::Config(format!("Invalid URL {url}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DavError::Config(format!(
                "Unsupported URL scheme: {}",
                url.scheme()
            )));
        }

        // Member hrefs are resolved relative to the collection
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(Self {
            http,
            url,
            collection,
        })
    }

    /// The collection URL, always with a trailing slash.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// The collection type.
    #[must_use]
    pub const fn collection_type(&self) -> CollectionType {
        self.collection
    }

    /// Href of the member stored under `file_name`.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::InvalidHref`] if the name is empty or contains a
    /// path, query or fragment separator.
    pub fn member_href(&self, file_name: &str) -> Result<Href, DavError> {
        if file_name.is_empty() || file_name.contains(['/', '?', '#']) {
            return Err(DavError::InvalidHref(file_name.to_string()));
        }

        // A leading "./" keeps a colon in the name from parsing as a scheme
        let url = self.resolve(&format!("./{file_name}"))?;
        Ok(Href::new(url.path().to_string()))
    }

    /// Fetches the collection's `getctag` and `sync-token` (PROPFIND, depth 0).
    ///
    /// # Errors
    ///
    /// Returns an error if PROPFIND fails.
    pub async fn query_tokens(&self) -> Result<CollectionTokens, DavError> {
        let mut propfind = PropFindRequest::new();
        propfind.add_property(Prop::GetCTag);
        propfind.add_property(Prop::SyncToken);

        let multistatus = self
            .report("PROPFIND", self.url.clone(), propfind.build()?, "0")
            .await?;
        Ok(multistatus.into_tokens())
    }

    /// Lists every member with its `ETag`.
    ///
    /// For calendars, `component` restricts the listing to objects containing
    /// that component (e.g. `VTODO`).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(&self, component: Option<&str>) -> Result<Vec<RemoteEntry>, DavError> {
        let body = match self.collection {
            CollectionType::Calendar => {
                let mut request = CalendarQueryRequest::new();
                if let Some(component) = component {
                    request = request.component(component.to_string());
                }
                request.build()?
            }
            CollectionType::AddressBook => AddressbookQueryRequest::new().build()?,
        };

        let multistatus = self.report("REPORT", self.url.clone(), body, "1").await?;
        Ok(multistatus.into_entries())
    }

    /// Lists the members changed or removed since `sync_token`
    /// (`sync-collection`, RFC 6578).
    ///
    /// # Errors
    ///
    /// Returns [`DavError::InvalidSyncToken`] if the server no longer accepts
    /// the token, or another error if the report fails.
    pub async fn sync_collection(&self, sync_token: Option<&str>) -> Result<RemoteChanges, DavError> {
        let body = SyncCollectionRequest::new(sync_token.map(str::to_string)).build()?;
        let target = Href::new(self.url.path().to_string());

        let resp = self
            .http
            .send(
                self.http
                    .build_dav_request("REPORT", self.url.clone())?
                    .header("Content-Type", XML_CONTENT_TYPE)
                    .header("Depth", "0")
                    .body(body),
            )
            .await?;

        let status = resp.status();
        if matches!(
            status,
            StatusCode::FORBIDDEN | StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED
        ) {
            let text = resp.text().await.unwrap_or_default();
            if status != StatusCode::FORBIDDEN || text.contains("valid-sync-token") {
                tracing::info!(%target, %status, "server rejected sync token");
                return Err(DavError::InvalidSyncToken);
            }
            return Err(DavError::Status {
                href: target,
                status,
                message: text,
            });
        }

        let resp = HttpClient::check_status(resp, &target).await?;
        let xml = resp.text().await?;
        Ok(MultiStatusResponse::from_xml(&xml)?.into_changes())
    }

    /// Retrieves one member with GET.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response carries no
    /// `ETag` header.
    pub async fn get(&self, href: &Href) -> Result<FetchedResource, DavError> {
        let url = self.resolve(href)?;
        let resp = self
            .http
            .execute(
                self.http
                    .build_request(Method::GET, url)
                    .header("Accept", self.collection.accept()),
                href,
            )
            .await?;

        let etag = HttpClient::extract_etag(&resp, href)?;
        let data = resp.text().await?;

        Ok(FetchedResource {
            href: href.clone(),
            etag: Some(etag),
            data: Some(data),
            success: true,
        })
    }

    /// Retrieves several members with one `calendar-multiget` or
    /// `addressbook-multiget` report.
    ///
    /// # Errors
    ///
    /// Returns an error if the report fails.
    pub async fn multiget(&self, hrefs: &[Href]) -> Result<Vec<FetchedResource>, DavError> {
        if hrefs.is_empty() {
            return Ok(Vec::new());
        }

        let mut multiget = MultiGetRequest::new(self.collection);
        for href in hrefs {
            multiget.add_href(href.as_str().to_string());
        }

        let multistatus = self
            .report("REPORT", self.url.clone(), multiget.build()?, "1")
            .await?;
        Ok(multistatus.into_fetched())
    }

    /// Uploads a member body.
    ///
    /// Returns the new `ETag` if the server sent one.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::PreconditionFailed`] or [`DavError::Conflict`] if the
    /// precondition does not hold, or another error if the upload fails.
    pub async fn put(
        &self,
        href: &Href,
        body: String,
        precondition: &Precondition,
    ) -> Result<Option<ETag>, DavError> {
        let url = self.resolve(href)?;
        let req = self
            .http
            .build_request(Method::PUT, url)
            .header("Content-Type", self.collection.content_type())
            .body(body);

        let resp = self
            .http
            .execute(HttpClient::precondition(req, precondition), href)
            .await?;
        Ok(HttpClient::etag(&resp))
    }

    /// Deletes a member, conditionally on `etag` when given.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    pub async fn delete(&self, href: &Href, etag: Option<&ETag>) -> Result<(), DavError> {
        let url = self.resolve(href)?;
        let mut req = self.http.build_request(Method::DELETE, url);
        if let Some(etag) = etag {
            req = HttpClient::if_match(req, etag);
        }

        self.http.execute(req, href).await?;
        Ok(())
    }

    async fn report(
        &self,
        method: &str,
        url: Url,
        body: String,
        depth: &str,
    ) -> Result<MultiStatusResponse, DavError> {
        let target = Href::new(url.path().to_string());
        let resp = self
            .http
            .execute(
                self.http
                    .build_dav_request(method, url)?
                    .header("Content-Type", XML_CONTENT_TYPE)
                    .header("Depth", depth)
                    .body(body),
                &target,
            )
            .await?;

        let xml = resp.text().await?;
        MultiStatusResponse::from_xml(&xml)
    }

    /// Builds a full URL from an href or a bare file name.
    fn resolve(&self, href: &str) -> Result<Url, DavError> {
        self.url
            .join(href)
            .map_err(|e| DavError::InvalidHref(format!("{href}: {e}")))
    }
}
