//! Request specifications as submitted by callers.

use crate::error::{Error, ErrorContext};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// HTTP method of a task. Only GET and POST are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "get", alias = "GET", alias = "Get")]
    Get,
    #[serde(rename = "post", alias = "POST", alias = "Post")]
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Method::Get),
            "post" => Ok(Method::Post),
            other => Err(Error::invalid_spec(
                format!("HTTP method '{}' not supported", other),
                ErrorContext::new()
                    .with_field_path("method")
                    .with_details("expected get or post"),
            )),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        }
    }
}

/// Body serialization mode of a POST task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Json,
    Form,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Json => "json",
            Encoding::Form => "form",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Encoding::Json),
            "form" => Ok(Encoding::Form),
            _ => Err(Error::invalid_spec(
                format!("Request encoding '{}' not supported", s),
                ErrorContext::new()
                    .with_field_path("encoding")
                    .with_details("expected json or form"),
            )),
        }
    }
}

/// Request parameters: either a pre-encoded string used verbatim, or structured
/// fields that each encoder serializes in its own way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Params {
    Raw(String),
    Fields(Map<String, Value>),
}

impl Params {
    pub fn is_empty(&self) -> bool {
        match self {
            Params::Raw(s) => s.is_empty(),
            Params::Fields(m) => m.is_empty(),
        }
    }
}

impl From<&str> for Params {
    fn from(s: &str) -> Self {
        Params::Raw(s.to_string())
    }
}

impl From<String> for Params {
    fn from(s: String) -> Self {
        Params::Raw(s)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(m: Map<String, Value>) -> Self {
        Params::Fields(m)
    }
}

/// Objects become [`Params::Fields`]; strings are taken as raw pre-encoded text and
/// any other JSON value is passed through as its serialized text.
impl From<Value> for Params {
    fn from(v: Value) -> Self {
        match v {
            Value::Object(m) => Params::Fields(m),
            Value::String(s) => Params::Raw(s),
            other => Params::Raw(other.to_string()),
        }
    }
}

/// Declarative description of one task.
///
/// `encoding` is kept as the caller wrote it and is only checked for POST requests,
/// where it must be `json` or `form`. Timeouts of `0` mean "no explicit limit".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    pub url: String,
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    #[serde(default, alias = "pattern", skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(default)]
    pub connect_timeout_ms: u64,
    #[serde(default)]
    pub timeout_ms: u64,
}

impl RequestSpec {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            params: None,
            encoding: None,
            header: None,
            connect_timeout_ms: 0,
            timeout_ms: 0,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn with_params(mut self, params: impl Into<Params>) -> Self {
        self.params = Some(params.into());
        self
    }

    /// Set the body encoding by name. Unknown names are rejected when the task is added.
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn json(self) -> Self {
        self.encoding(Encoding::Json.as_str())
    }

    pub fn form(self) -> Self {
        self.encoding(Encoding::Form.as_str())
    }

    /// Extra raw header line, e.g. `"X-Trace: abc"`.
    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Parsed POST encoding.
    ///
    /// A missing encoding on a POST is rejected the same way as an unknown one.
    pub fn post_encoding(&self) -> Result<Encoding> {
        match self.encoding.as_deref() {
            Some(e) => e.parse(),
            None => Err(Error::invalid_spec(
                "POST request without an encoding is not supported",
                ErrorContext::new()
                    .with_field_path("encoding")
                    .with_details("expected json or form"),
            )),
        }
    }
}
