//! 传输模块：基于 reqwest 的请求句柄与单线程就绪事件循环。
//!
//! # Transport Module
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`HttpTransport`] | Builds per-handle reqwest clients/requests and runs one transfer |
//! | [`TransportConfig`] | Proxy, redirect and body-size settings (env-overridable) |
//! | [`Multiplexer`] | Owns the event loop and drives a batch of handles to completion |
//! | [`RequestHandle`] | In-flight state of one task during a single execution |

mod http;
mod multiplexer;

pub use http::{HttpTransport, TransportConfig, TransportError};
pub use multiplexer::{Completion, ExecutorState, Multiplexer, RequestHandle};
