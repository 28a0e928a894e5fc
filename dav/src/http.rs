// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP client wrapper with authentication and `ETag` handling.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};

use crate::config::{AuthMethod, DavConfig};
use crate::error::DavError;
use crate::types::{ETag, Href};

/// Conditional header attached to an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// Unconditional write.
    None,
    /// `If-Match: <etag>`: only overwrite the version we last saw.
    IfMatch(ETag),
    /// `If-None-Match: *`: only create, never overwrite.
    IfNoneMatch,
}

/// HTTP client for `WebDAV` operations.
///
/// One instance is meant to be shared (through `Arc`) by all collections of
/// an account, so connections are pooled.
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    auth: AuthMethod,
}

impl HttpClient {
    /// Creates a new HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client creation fails.
    pub fn new(config: &DavConfig) -> Result<Self, DavError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self {
            client,
            auth: config.auth.clone(),
        })
    }

    /// Builds a request with authentication headers.
    pub fn build_request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut req = self.client.request(method, url);

        match &self.auth {
            AuthMethod::Basic { username, password } => {
                req = req.basic_auth(username, Some(password));
            }
            AuthMethod::Bearer { token } => {
                req = req.bearer_auth(token);
            }
            AuthMethod::None => {}
        }

        req
    }

    /// Builds a request with a `WebDAV` extension method such as PROPFIND.
    ///
    /// # Errors
    ///
    /// Returns an error if the method name is invalid.
    pub fn build_dav_request(&self, method: &str, url: Url) -> Result<RequestBuilder, DavError> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| DavError::Config(format!("Invalid method: {e}")))?;
        Ok(self.build_request(method, url))
    }

    /// Sends a request without interpreting the status code.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent.
    pub async fn send(&self, req: RequestBuilder) -> Result<Response, DavError> {
        Ok(req.send().await?)
    }

    /// Executes a request and checks for HTTP errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or returns an error status code.
    pub async fn execute(&self, req: RequestBuilder, target: &Href) -> Result<Response, DavError> {
        let resp = self.send(req).await?;
        Self::check_status(resp, target).await
    }

    /// Maps unsuccessful status codes to errors.
    ///
    /// # Errors
    ///
    /// Returns an error for every non-2xx status code.
    pub async fn check_status(resp: Response, target: &Href) -> Result<Response, DavError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        tracing::debug!(%target, %status, "request rejected");
        match status {
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(DavError::NotFound(target.clone())),
            StatusCode::PRECONDITION_FAILED => Err(DavError::PreconditionFailed(target.clone())),
            StatusCode::CONFLICT => Err(DavError::Conflict(target.clone())),
            status => {
                let message = resp
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read response".to_string());
                Err(DavError::Status {
                    href: target.clone(),
                    status,
                    message,
                })
            }
        }
    }

    /// Adds the conditional header for an upload.
    pub fn precondition(req: RequestBuilder, precondition: &Precondition) -> RequestBuilder {
        match precondition {
            Precondition::None => req,
            Precondition::IfMatch(etag) => Self::if_match(req, etag),
            Precondition::IfNoneMatch => req.header("If-None-Match", "*"),
        }
    }

    /// Adds If-Match header for conditional updates.
    pub fn if_match(req: RequestBuilder, etag: &ETag) -> RequestBuilder {
        req.header("If-Match", etag.as_str())
    }

    /// Extracts `ETag` from response headers, if present.
    pub fn etag(resp: &Response) -> Option<ETag> {
        resp.headers()
            .get("ETag")
            .and_then(|v| v.to_str().ok())
            .map(|s| ETag::new(s.to_string()))
    }

    /// Extracts `ETag` from response headers.
    ///
    /// # Errors
    ///
    /// Returns an error if the `ETag` header is missing.
    pub fn extract_etag(resp: &Response, target: &Href) -> Result<ETag, DavError> {
        Self::etag(resp).ok_or_else(|| DavError::MissingETag(target.clone()))
    }
}
