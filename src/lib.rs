//! # multi-http-batch
//!
//! 在一次阻塞调用中并发执行多个独立的 HTTP 请求。
//!
//! Run a batch of independent HTTP requests concurrently from synchronous code and
//! block until every one of them reaches a terminal state.
//!
//! ## Overview
//!
//! Server-side code often needs to call several backend services at once. This
//! crate collects those calls as tasks, then drives all of them on the calling
//! thread through a single readiness-based event loop (a current-thread tokio
//! runtime over mio). There is no thread per request and no busy polling: the
//! thread sleeps in the readiness driver until some transfer makes progress.
//!
//! ## Key Features
//!
//! - **Ordered registry**: named or auto-numbered tasks, validated when added
//! - **GET query merging**: structured or raw params appended to the URL
//! - **POST bodies**: JSON (unescaped slashes, explicit length) or multipart form
//! - **Failure isolation**: one task's DNS/connect/timeout error never aborts the batch
//! - **Per-task metadata**: status, effective URL, timing, headers, failure kind
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use multi_http_batch::{BatchController, RequestSpec};
//!
//! fn main() -> multi_http_batch::Result<()> {
//!     let batch = BatchController::new()?;
//!     batch
//!         .add_named("trades", RequestSpec::get("http://trade.local/list?type=6"))?
//!         .add(
//!             RequestSpec::post("http://order.local/query")
//!                 .with_params(serde_json::json!({"seller_uid": 97947, "count": 1}))
//!                 .json()
//!                 .timeout_ms(2000),
//!         )?;
//!
//!     batch.execute()?;
//!     for id in batch.task_ids() {
//!         let info = batch.info(&id)?;
//!         println!("{id}: {:?} in {:.3}s", info.status, info.total_time);
//!     }
//!     println!("batch took {:.3}s", batch.exec_time());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`batch`] | Controller, builder and result store |
//! | [`registry`] | Ordered task registry |
//! | [`request`] | Spec-to-descriptor translation |
//! | [`transport`] | reqwest handles and the event loop |
//! | [`types`] | Task ids, specs and results |

pub mod batch;
pub mod registry;
pub mod request;
pub mod transport;
pub mod types;

pub use batch::{BatchController, BatchControllerBuilder, BatchState, HandleRecord, Phase};
pub use types::{
    Encoding, FailureKind, Method, Params, RequestSpec, TaskId, TaskInfo, TaskResult,
    TransportFailure,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
