//! The HTTP seam. [`Transport`] sends one request and returns the raw status
//! and body; it never interprets either. [`ReqwestTransport`] is the
//! production implementation.

use std::future::Future;
use std::time::Duration;

use agrilink_core::AppConfig;
use reqwest::{Client, Url};
use serde_json::Value;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A request relative to the API base URL. Path segments are percent-encoded
/// by the transport, so ids can be passed through verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRequest {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RawRequest {
    #[must_use]
    pub fn new(method: Method, segments: &[&str]) -> Self {
        Self {
            method,
            segments: segments.iter().map(|s| (*s).to_owned()).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// `/listings/abc`, used as the log and tracing key.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

/// Status and body of any completed exchange, success or not.
///
/// Non-JSON bodies arrive as [`Value::String`]; empty bodies as
/// [`Value::Null`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
}

impl RawResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait Transport: Send + Sync {
    /// Sends `request`. Only failures to complete the exchange are errors;
    /// a 4xx/5xx response is an `Ok` [`RawResponse`].
    fn send(
        &self,
        request: RawRequest,
    ) -> impl Future<Output = Result<RawResponse, ApiError>> + Send;

    fn get(
        &self,
        segments: &[&str],
        query: Vec<(String, String)>,
    ) -> impl Future<Output = Result<RawResponse, ApiError>> + Send {
        self.send(RawRequest::new(Method::Get, segments).with_query(query))
    }

    fn post(
        &self,
        segments: &[&str],
        body: Value,
    ) -> impl Future<Output = Result<RawResponse, ApiError>> + Send {
        self.send(RawRequest::new(Method::Post, segments).with_body(body))
    }

    fn put(
        &self,
        segments: &[&str],
        body: Value,
    ) -> impl Future<Output = Result<RawResponse, ApiError>> + Send {
        self.send(RawRequest::new(Method::Put, segments).with_body(body))
    }

    fn delete(&self, segments: &[&str]) -> impl Future<Output = Result<RawResponse, ApiError>> + Send {
        self.send(RawRequest::new(Method::Delete, segments))
    }
}

/// [`Transport`] over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ReqwestTransport {
    /// Builds a transport rooted at `base_url`, authenticating with `token`
    /// as a bearer token when given.
    ///
    /// # Errors
    ///
    /// - [`ApiError::InvalidBaseUrl`] if `base_url` is not an absolute
    ///   `http(s)` URL that can carry a path.
    /// - [`ApiError::Transport`] if the `reqwest::Client` cannot be built.
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ApiError> {
        let parsed = Url::parse(base_url).map_err(|e| ApiError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl {
                base_url: base_url.to_owned(),
                reason: "expected an http(s) URL".to_owned(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: parsed,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// # Errors
    ///
    /// See [`ReqwestTransport::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, ApiError> {
        Self::new(
            &config.api_base_url,
            config.api_token.clone(),
            config.request_timeout_secs,
            &config.user_agent,
        )
    }

    fn url_for(&self, request: &RawRequest) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: "URL cannot carry a path".to_owned(),
            })?
            .pop_if_empty()
            .extend(&request.segments);
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: RawRequest) -> Result<RawResponse, ApiError> {
        let url = self.url_for(&request)?;

        let mut builder = self
            .client
            .request(request.method.into(), url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok(RawResponse {
            status,
            body: parse_body(text),
        })
    }
}

fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
