use axum::{
    body::{Body, Bytes, to_bytes},
    extract::Request,
    http::{HeaderMap, Uri, header},
};
use std::fmt;

use crate::error::ApiError;

// Bucket shared by every request that carries no key
pub const ANONYMOUS: &str = "anonymous";

// Upper bound on bodies buffered while looking for `api_key`
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

const API_KEY_FIELD: &str = "api_key";

/// Identity used to bucket rate limit counts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    pub fn from_api_key(api_key: Option<String>) -> Self {
        Self(api_key.unwrap_or_else(|| ANONYMOUS.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keys are secrets, so logs only ever see a short prefix
impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == ANONYMOUS {
            return f.write_str(ANONYMOUS);
        }
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "{prefix}***")
    }
}

// Cached in request extensions once the key has been looked up
#[derive(Debug, Clone)]
pub struct ResolvedApiKey(pub Option<String>);

/// The parts of a request a key can be read from.
pub struct RequestSnapshot<'a> {
    pub headers: &'a HeaderMap,
    pub uri: &'a Uri,
    pub content_type: BodyKind,
    pub body: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    Form,
    Other,
}

impl BodyKind {
    fn of(headers: &HeaderMap) -> Self {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if content_type.starts_with("application/json") {
            BodyKind::Json
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            BodyKind::Form
        } else {
            BodyKind::Other
        }
    }
}

/// One place an API key may be carried.
pub trait KeyExtractor: Sync {
    fn extract(&self, req: &RequestSnapshot<'_>) -> Option<String>;
}

pub struct ApiKeyHeader;
pub struct BearerToken;
pub struct QueryParam;
pub struct BodyField;

impl KeyExtractor for ApiKeyHeader {
    fn extract(&self, req: &RequestSnapshot<'_>) -> Option<String> {
        header_value(req.headers, "x-api-key")
    }
}

impl KeyExtractor for BearerToken {
    fn extract(&self, req: &RequestSnapshot<'_>) -> Option<String> {
        let raw = header_value(req.headers, header::AUTHORIZATION.as_str())?;
        let token = raw.strip_prefix("Bearer ").unwrap_or(raw.as_str());
        non_empty(token)
    }
}

impl KeyExtractor for QueryParam {
    fn extract(&self, req: &RequestSnapshot<'_>) -> Option<String> {
        let query = req.uri.query()?;
        form_field(query.as_bytes(), API_KEY_FIELD)
    }
}

impl KeyExtractor for BodyField {
    fn extract(&self, req: &RequestSnapshot<'_>) -> Option<String> {
        match req.content_type {
            BodyKind::Json => {
                let value: serde_json::Value = serde_json::from_slice(req.body).ok()?;
                value.get(API_KEY_FIELD)?.as_str().and_then(non_empty)
            }
            BodyKind::Form => form_field(req.body, API_KEY_FIELD),
            BodyKind::Other => None,
        }
    }
}

// Priority order: first non-empty value wins
static EXTRACTORS: &[&dyn KeyExtractor] = &[&ApiKeyHeader, &BearerToken, &QueryParam, &BodyField];

pub fn extract_api_key(req: &RequestSnapshot<'_>) -> Option<String> {
    EXTRACTORS.iter().find_map(|extractor| extractor.extract(req))
}

/// Look up the API key carried by `req`, buffering its body if needed.
///
/// The body is put back untouched so handlers can still consume it. The
/// result is cached in the request extensions, so stacking the rate limiter
/// and the authenticator reads the body at most once.
pub async fn resolve_api_key(req: Request) -> Result<(Option<String>, Request), ApiError> {
    if let Some(ResolvedApiKey(key)) = req.extensions().get::<ResolvedApiKey>() {
        let key = key.clone();
        return Ok((key, req));
    }

    let (mut parts, body) = req.into_parts();
    let content_type = BodyKind::of(&parts.headers);

    let (bytes, body) = if content_type == BodyKind::Other {
        (Bytes::new(), body)
    } else {
        let bytes = to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|_| ApiError::PayloadTooLarge)?;
        (bytes.clone(), Body::from(bytes))
    };

    let key = extract_api_key(&RequestSnapshot {
        headers: &parts.headers,
        uri: &parts.uri,
        content_type,
        body: &bytes,
    });

    parts.extensions.insert(ResolvedApiKey(key.clone()));
    Ok((key, Request::from_parts(parts, body)))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(non_empty)
}

fn form_field(encoded: &[u8], field: &str) -> Option<String> {
    url::form_urlencoded::parse(encoded)
        .find(|(name, _)| name == field)
        .and_then(|(_, value)| non_empty(&value))
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
