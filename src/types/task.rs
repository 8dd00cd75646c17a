//! Task identifiers and per-task execution results.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// Identifier of a task within one registry.
///
/// Caller-chosen names and registry surrogates live in separate variants, so a
/// surrogate never collides with a name that happens to look like a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskId {
    Auto(u64),
    Named(String),
}

impl TaskId {
    pub fn is_auto(&self) -> bool {
        matches!(self, TaskId::Auto(_))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Auto(n) => write!(f, "{}", n),
            TaskId::Named(s) => f.write_str(s),
        }
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId::Named(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        TaskId::Named(s)
    }
}

impl From<u64> for TaskId {
    fn from(n: u64) -> Self {
        TaskId::Auto(n)
    }
}

impl From<&TaskId> for TaskId {
    fn from(id: &TaskId) -> Self {
        id.clone()
    }
}

/// Coarse classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Connect,
    Redirect,
    Builder,
    Request,
    Body,
    Decode,
    Other,
}

/// A task that did not complete its HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// Transfer metadata of one task, populated once per execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    /// URL as built from the spec (query merged).
    pub url: String,
    /// URL of the final response, after any followed redirects.
    pub effective_url: String,
    /// HTTP status, `None` when no response was received.
    pub status: Option<u16>,
    pub http_version: Option<String>,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub remote_addr: Option<SocketAddr>,
    /// Bytes of response body received.
    pub size_download: u64,
    /// Body exceeded the configured limit and was cut.
    #[serde(default)]
    pub truncated: bool,
    /// Seconds until response headers arrived.
    pub starttransfer_time: f64,
    /// Seconds until the body was fully read or the task failed.
    pub total_time: f64,
    pub error: Option<TransportFailure>,
}

impl TaskInfo {
    pub(crate) fn pending(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            effective_url: url.clone(),
            url,
            status: None,
            http_version: None,
            content_type: None,
            headers: Vec::new(),
            remote_addr: None,
            size_download: 0,
            truncated: false,
            starttransfer_time: 0.0,
            total_time: 0.0,
            error: None,
        }
    }

    /// Response received with a 2xx status.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && matches!(self.status, Some(s) if (200..300).contains(&s))
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Body and metadata of one completed task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult {
    pub body: Bytes,
    pub info: TaskInfo,
}

impl TaskResult {
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
