//! 类型模块：任务标识、请求规格与执行结果的核心数据类型。
//!
//! # Types Module
//!
//! Core data types shared by the registry, the request builder and the batch
//! controller.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TaskId`] | Caller-supplied name or registry-assigned surrogate |
//! | [`RequestSpec`] | Declarative description of one HTTP request |
//! | [`Params`] | Raw pre-encoded string or structured fields |
//! | [`Method`] | Supported HTTP methods (GET, POST) |
//! | [`Encoding`] | POST body encodings (JSON, form) |
//! | [`TaskResult`] | Body and metadata of one completed task |
//! | [`TaskInfo`] | Transfer metadata (status, URL, timing, failure) |
//!
//! ## Example
//!
//! ```rust
//! use multi_http_batch::types::{RequestSpec, TaskId};
//!
//! let spec = RequestSpec::post("http://backend.local/orders")
//!     .with_params(serde_json::json!({"seller_uid": 97947, "count": 1}))
//!     .json()
//!     .timeout_ms(1500);
//!
//! assert_eq!(TaskId::from("orders").to_string(), "orders");
//! assert_eq!(spec.timeout_ms, 1500);
//! ```

pub mod spec;
pub mod task;

pub use spec::{Encoding, Method, Params, RequestSpec};
pub use task::{FailureKind, TaskId, TaskInfo, TaskResult, TransportFailure};
