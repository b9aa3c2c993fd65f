//! HTTP request execution with effective-request capture.
//!
//! Resolves method, URL, headers, query parameters, and body through the
//! template resolver, issues the call, and records the request actually sent
//! (final URL including query string, headers, body) for result reporting.
//! A non-JSON response body is replaced with an empty object so downstream
//! validation always sees JSON.

use crate::config::HttpMethod;
use crate::template;
use crate::variables::VariableStore;
use indexmap::IndexMap;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    #[error("failed to build request: {0}")]
    Build(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Send {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} timed out after {timeout:?}")]
    TimedOut { url: String, timeout: Duration },
}

/// Snapshot of the request actually sent.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    /// Fully qualified URL including any query string.
    pub url: String,
    pub headers: IndexMap<String, String>,
    pub body: Option<Value>,
}

/// Response paired with the captured request that produced it.
#[derive(Debug, Clone)]
pub struct HttpExchange {
    pub status: u16,
    pub body: Value,
    pub request: CapturedRequest,
}

/// Issues HTTP calls against a base URL with template resolution applied to
/// every request component.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    client: reqwest::Client,
    base_url: Url,
}

impl RequestExecutor {
    /// Build an executor for `base_url`, optionally attaching a raw `Cookie`
    /// header to every request. Environment proxies are ignored.
    pub fn new(base_url: Url, cookie: Option<&str>) -> Result<Self, RequestError> {
        let mut default_headers = HeaderMap::new();
        if let Some(cookie) = cookie {
            let value = HeaderValue::from_str(cookie).map_err(|e| RequestError::InvalidHeader {
                name: "Cookie".to_string(),
                reason: e.to_string(),
            })?;
            default_headers.insert(reqwest::header::COOKIE, value);
        }
        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .no_proxy()
            .build()
            .map_err(RequestError::ClientBuild)?;
        Ok(RequestExecutor { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Same client, different base URL (suite-level `base_url` override).
    pub fn with_base_url(&self, base_url: Url) -> Self {
        RequestExecutor {
            client: self.client.clone(),
            base_url,
        }
    }

    /// Resolve a (possibly templated) relative URL against the base URL.
    /// Non-slash-prefixed relative URLs are normalized to start with `/`.
    pub fn resolve_url(
        &self,
        url: &str,
        variables: &VariableStore,
    ) -> Result<Url, RequestError> {
        let mut resolved = template::stringify(&template::resolve_str(url, variables));
        if has_scheme(&resolved) {
            return Url::parse(&resolved).map_err(|source| RequestError::InvalidUrl {
                url: resolved.clone(),
                source,
            });
        }
        if !resolved.is_empty() && !resolved.starts_with('/') {
            resolved.insert(0, '/');
        }
        self.base_url
            .join(&resolved)
            .map_err(|source| RequestError::InvalidUrl {
                url: resolved.clone(),
                source,
            })
    }

    /// Resolve all request components and perform the call.
    pub async fn execute(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &IndexMap<String, Value>,
        params: &IndexMap<String, Value>,
        body: Option<&Value>,
        variables: &VariableStore,
        timeout: Duration,
    ) -> Result<HttpExchange, RequestError> {
        let target = self.resolve_url(url, variables)?;

        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let resolved = template::stringify(&template::resolve_value(value, variables));
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| RequestError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(&resolved).map_err(|e| RequestError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            header_map.insert(header_name, header_value);
        }

        let query: Vec<(String, String)> = params
            .iter()
            .map(|(name, value)| {
                (
                    name.clone(),
                    template::stringify(&template::resolve_value(value, variables)),
                )
            })
            .collect();

        let resolved_body = body.map(|b| template::resolve_value(b, variables));

        let mut builder = self
            .client
            .request(method.as_reqwest(), target)
            .headers(header_map)
            .timeout(timeout);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(json_body) = &resolved_body {
            builder = builder.json(json_body);
        }

        let request = builder.build().map_err(RequestError::Build)?;
        let captured = CapturedRequest {
            url: request.url().to_string(),
            headers: request
                .headers()
                .iter()
                .map(|(k, v)| {
                    (
                        k.as_str().to_string(),
                        v.to_str().unwrap_or_default().to_string(),
                    )
                })
                .collect(),
            body: resolved_body,
        };
        debug!(method = %request.method(), url = %captured.url, "sending request");

        let response = self.client.execute(request).await.map_err(|source| {
            if source.is_timeout() {
                RequestError::TimedOut {
                    url: captured.url.clone(),
                    timeout,
                }
            } else {
                RequestError::Send {
                    url: captured.url.clone(),
                    source,
                }
            }
        })?;

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text)
            .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        Ok(HttpExchange {
            status,
            body,
            request: captured,
        })
    }
}

/// True only when the string starts with a URI scheme (`http://...`). A
/// `://` appearing later, e.g. inside a query-string value, does not make a
/// path-relative URL absolute.
fn has_scheme(url: &str) -> bool {
    let Some(pos) = url.find("://") else {
        return false;
    };
    let scheme = &url[..pos];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}
