//! 请求构建模块：将任务规格转换为可直接发送的请求描述。
//!
//! # Request Building Module
//!
//! Pure translation of a [`crate::types::RequestSpec`] into a [`RequestDescriptor`]:
//! method, merged URL, headers, encoded body and timeouts. Nothing here touches the
//! network, so the same builder validates specs when they are added and prepares
//! them again when a batch executes.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`RequestBuilder`] | Spec-to-descriptor translator (GET query merge, JSON and form bodies) |
//! | [`RequestDescriptor`] | Transport-ready request |
//! | [`Body`] | Encoded body variants |
//! | [`query`] | Form-style flattening and URL query merging |

mod builder;
pub mod query;

pub use builder::{
    Body, RequestBuilder, RequestDescriptor, DEFAULT_USER_AGENT, FORM_CONTENT_TYPE,
    JSON_CONTENT_TYPE,
};
