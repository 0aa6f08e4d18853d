// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::FetchError;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::debug;

pub const JSON_MEDIA_TYPE: &str = "application/json";
const NOT_MODIFIED_MESSAGE: &str = "Not Modified (304) - disable request caching or ensure the server returns 200 with a body.";
const FALLBACK_STATUS_MESSAGE: &str = "Request failed";

/// Request cache directive. There is no local HTTP cache, so the mode only
/// decides which `Cache-Control` header goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    Default,
    #[default]
    NoStore,
    NoCache,
    Reload,
    ForceCache,
}

impl CacheMode {
    const fn cache_control(self) -> Option<&'static str> {
        match self {
            Self::NoStore => Some("no-store"),
            Self::NoCache | Self::Reload => Some("no-cache"),
            Self::Default | Self::ForceCache => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub cache: CacheMode,
    pub body: Option<String>,
}

impl FetchOptions {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn cache(mut self, cache: CacheMode) -> Self {
        self.cache = cache;
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Successful response body: parsed JSON when the server said so, raw text
/// otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Json(_) => None,
            Self::Text(text) => Some(text),
        }
    }

    /// JSON view of the payload; text bodies become a JSON string.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Json(value) => value.clone(),
            Self::Text(text) => Value::String(text.clone()),
        }
    }
}

pub fn fetch_json(
    http: &HttpClient,
    url: &str,
    options: &FetchOptions,
) -> Result<Payload, FetchError> {
    let mut request = http
        .request(options.method.clone(), url)
        .headers(request_headers(options)?);
    if let Some(body) = &options.body {
        request = request.body(body.clone());
    }

    let response = request
        .send()
        .map_err(|error| FetchError::transport(url, &error))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(status_error(status, &body));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    let body = response
        .text()
        .map_err(|error| FetchError::transport(url, &error))?;
    debug!(url, %status, %content_type, bytes = body.len(), "response received");

    if content_type.contains(JSON_MEDIA_TYPE) {
        let value = serde_json::from_str(&body).map_err(|error| FetchError::Decode {
            url: url.to_owned(),
            message: error.to_string(),
        })?;
        return Ok(Payload::Json(value));
    }
    Ok(Payload::Text(body))
}

// Caller headers go in last so an explicit Accept or Cache-Control wins.
fn request_headers(options: &FetchOptions) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));
    if let Some(directive) = options.cache.cache_control() {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static(directive));
    }

    for (name, value) in &options.headers {
        let invalid = || FetchError::InvalidHeader { name: name.clone() };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

fn status_error(status: StatusCode, body: &str) -> FetchError {
    let message = if status == StatusCode::NOT_MODIFIED {
        NOT_MODIFIED_MESSAGE.to_owned()
    } else {
        server_message(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or(FALLBACK_STATUS_MESSAGE)
                .to_owned()
        })
    };
    FetchError::Status {
        status: status.as_u16(),
        message,
    }
}

fn server_message(body: &str) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed
        .get("message")?
        .as_str()
        .filter(|message| !message.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::{CacheMode, FetchOptions, Payload, request_headers, server_message, status_error};
    use crate::FetchError;
    use reqwest::StatusCode;
    use reqwest::header::{ACCEPT, CACHE_CONTROL};
    use serde_json::json;

    #[test]
    fn default_headers_ask_for_json_without_store() -> Result<(), FetchError> {
        let headers = request_headers(&FetchOptions::default())?;
        assert_eq!(headers.get(ACCEPT).map(|v| v.as_bytes()), Some(&b"application/json"[..]));
        assert_eq!(headers.get(CACHE_CONTROL).map(|v| v.as_bytes()), Some(&b"no-store"[..]));
        Ok(())
    }

    #[test]
    fn caller_headers_merge_with_accept() -> Result<(), FetchError> {
        let options = FetchOptions::default()
            .header("Authorization", "Bearer token123")
            .header("X-Custom-Header", "value");
        let headers = request_headers(&options)?;
        assert_eq!(headers.len(), 4);
        assert_eq!(headers.get(ACCEPT).map(|v| v.as_bytes()), Some(&b"application/json"[..]));
        assert_eq!(
            headers.get("authorization").map(|v| v.as_bytes()),
            Some(&b"Bearer token123"[..])
        );
        Ok(())
    }

    #[test]
    fn explicit_accept_replaces_default() -> Result<(), FetchError> {
        let options = FetchOptions::default().header("accept", "text/plain");
        let headers = request_headers(&options)?;
        let accepts = headers.get_all(ACCEPT).iter().collect::<Vec<_>>();
        assert_eq!(accepts.len(), 1);
        assert_eq!(accepts[0].as_bytes(), b"text/plain");
        Ok(())
    }

    #[test]
    fn force_cache_sends_no_cache_control() -> Result<(), FetchError> {
        let options = FetchOptions::default().cache(CacheMode::ForceCache);
        let headers = request_headers(&options)?;
        assert!(headers.get(CACHE_CONTROL).is_none());
        Ok(())
    }

    #[test]
    fn invalid_header_name_is_rejected() {
        let options = FetchOptions::default().header("bad header", "x");
        let error = request_headers(&options).expect_err("space in name should fail");
        assert_eq!(
            error,
            FetchError::InvalidHeader {
                name: "bad header".to_owned()
            }
        );
    }

    #[test]
    fn status_error_prefers_server_message() {
        let body = json!({"message": "Invalid request parameters"}).to_string();
        let error = status_error(StatusCode::BAD_REQUEST, &body);
        assert_eq!(error.to_string(), "400 Invalid request parameters");
    }

    #[test]
    fn status_error_falls_back_to_reason() {
        assert_eq!(
            status_error(StatusCode::NOT_FOUND, "").to_string(),
            "404 Not Found"
        );
        assert_eq!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "{not json").to_string(),
            "500 Internal Server Error"
        );
        assert_eq!(
            status_error(StatusCode::BAD_GATEWAY, r#"{"message": ""}"#).to_string(),
            "502 Bad Gateway"
        );
    }

    #[test]
    fn status_error_without_reason_uses_generic_message() -> Result<(), Box<dyn std::error::Error>> {
        let status = StatusCode::from_u16(599)?;
        assert_eq!(status_error(status, "").to_string(), "599 Request failed");
        Ok(())
    }

    #[test]
    fn not_modified_gets_caching_hint() {
        let message = status_error(StatusCode::NOT_MODIFIED, r#"{"message":"ignored"}"#).to_string();
        assert!(message.starts_with("304 Not Modified"));
        assert!(message.contains("disable request caching"));
    }

    #[test]
    fn server_message_ignores_non_objects() {
        assert_eq!(server_message("[1,2]"), None);
        assert_eq!(server_message(r#"{"message": 5}"#), None);
        assert_eq!(server_message(r#""message""#), None);
    }

    #[test]
    fn text_payload_converts_to_json_string() {
        let payload = Payload::Text("plain".to_owned());
        assert_eq!(payload.to_json(), json!("plain"));
        assert_eq!(payload.as_text(), Some("plain"));
        assert!(payload.as_json().is_none());
    }
}
