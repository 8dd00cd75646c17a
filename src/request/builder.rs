//! Translation of a [`RequestSpec`] into a transport-ready [`RequestDescriptor`].

use super::query::{encode_fields, flatten_fields, merge_query};
use crate::error::{Error, ErrorContext};
use crate::types::{Encoding, Method, Params, RequestSpec};
use crate::Result;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT,
};
use std::time::Duration;

/// Client identifier sent with GET requests unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("multi-http-batch/", env!("CARGO_PKG_VERSION"));

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
/// Nominal form content type; the multipart encoder appends its boundary on the wire.
pub const FORM_CONTENT_TYPE: &str = "multipart/form-data; charset=utf-8";

/// Encoded request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Empty,
    Text(String),
    /// Flattened text parts for the multipart encoder.
    Multipart(Vec<(String, String)>),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Text(s) => s.is_empty(),
            Body::Multipart(parts) => parts.is_empty(),
        }
    }
}

/// Everything the transport needs to issue one request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Body,
    pub connect_timeout_ms: u64,
    pub timeout_ms: u64,
}

impl RequestDescriptor {
    /// `None` when the spec set no connect limit.
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_ms > 0).then(|| Duration::from_millis(self.connect_timeout_ms))
    }

    /// `None` when the spec set no overall limit.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Stateless spec-to-descriptor translator.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    user_agent: HeaderValue,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            user_agent: HeaderValue::from_static(DEFAULT_USER_AGENT),
        }
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        let user_agent = HeaderValue::from_str(user_agent).map_err(|e| Error::Construction {
            message: format!("invalid user agent '{}': {}", user_agent, e),
            source: None,
        })?;
        Ok(Self { user_agent })
    }

    pub fn user_agent(&self) -> &HeaderValue {
        &self.user_agent
    }

    pub fn build(&self, spec: &RequestSpec) -> Result<RequestDescriptor> {
        match spec.method {
            Method::Get => self.build_get(spec),
            Method::Post => self.build_post(spec),
        }
    }

    /// GET: params merged into the URL query.
    ///
    /// A non-empty caller header also brings a JSON content type along with it,
    /// which callers of the batch API have come to rely on.
    pub fn build_get(&self, spec: &RequestSpec) -> Result<RequestDescriptor> {
        let query = match &spec.params {
            None => String::new(),
            Some(Params::Raw(raw)) => raw.clone(),
            Some(Params::Fields(fields)) => encode_fields(fields),
        };
        let url = merge_query(&spec.url, &query);
        validate_url(&url)?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, self.user_agent.clone());
        if let Some((name, value)) = parse_extra_header(spec.header.as_deref())? {
            headers.append(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
            headers.append(name, value);
        }

        Ok(RequestDescriptor {
            method: Method::Get,
            url,
            headers,
            body: Body::Empty,
            connect_timeout_ms: spec.connect_timeout_ms,
            timeout_ms: spec.timeout_ms,
        })
    }

    pub fn build_post(&self, spec: &RequestSpec) -> Result<RequestDescriptor> {
        let encoding = spec.post_encoding()?;
        validate_url(&spec.url)?;
        let extra = parse_extra_header(spec.header.as_deref())?;

        let mut headers = HeaderMap::new();
        let body = match encoding {
            Encoding::Json => {
                let text = match &spec.params {
                    None => String::new(),
                    Some(Params::Raw(raw)) => raw.clone(),
                    Some(Params::Fields(fields)) => serde_json::to_string(fields)?,
                };
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
                headers.insert(CONTENT_LENGTH, HeaderValue::from(text.len()));
                Body::Text(text)
            }
            Encoding::Form => {
                let fields = match &spec.params {
                    Some(Params::Fields(fields)) => fields,
                    Some(Params::Raw(_)) | None => {
                        return Err(Error::invalid_spec(
                            "form encoding without structured params is not supported",
                            ErrorContext::new()
                                .with_field_path("params")
                                .with_details("form bodies need key/value fields"),
                        ))
                    }
                };
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
                Body::Multipart(flatten_fields(fields))
            }
        };
        if let Some((name, value)) = extra {
            headers.append(name, value);
        }

        Ok(RequestDescriptor {
            method: Method::Post,
            url: spec.url.clone(),
            headers,
            body,
            connect_timeout_ms: spec.connect_timeout_ms,
            timeout_ms: spec.timeout_ms,
        })
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_url(raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw).map_err(|e| {
        Error::invalid_spec(
            format!("URL '{}' could not be parsed: {}", raw, e),
            ErrorContext::new().with_field_path("url"),
        )
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::invalid_spec(
            format!("URL scheme '{}' not supported", other),
            ErrorContext::new()
                .with_field_path("url")
                .with_details("expected http or https"),
        )),
    }
}

/// Parse a raw `Name: value` header line. Blank input means no header.
fn parse_extra_header(raw: Option<&str>) -> Result<Option<(HeaderName, HeaderValue)>> {
    let line = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(line) => line,
    };
    let invalid = |details: String| {
        Error::invalid_spec(
            format!("header '{}' is not a valid header line", line),
            ErrorContext::new()
                .with_field_path("header")
                .with_details(details),
        )
    };
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| invalid("expected 'Name: value'".to_string()))?;
    let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|e| invalid(e.to_string()))?;
    let value = HeaderValue::from_str(value.trim()).map_err(|e| invalid(e.to_string()))?;
    Ok(Some((name, value)))
}
