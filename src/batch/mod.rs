//! 批量请求模块：收集多个 HTTP 任务并在一次阻塞调用中并发执行。
//!
//! # Batch Module
//!
//! Fan out several independent HTTP requests from synchronous code and wait for
//! all of them at once, without a thread per request.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchController`] | Add/remove tasks, execute, inspect results, reset |
//! | [`BatchControllerBuilder`] | User agent, proxy, redirect and body-size settings |
//! | [`ResultStore`] | Per-task bodies, metadata and handle records |
//! | [`BatchState`] | Lifecycle phase and elapsed time of the last execution |
//!
//! ## Lifecycle
//!
//! - **Empty**: nothing registered since construction or the last reset
//! - **Populated**: at least one task was added
//! - **Executed**: an execution finished; results are readable
//!
//! Transport failures of individual tasks never abort an execution. They show up
//! in [`crate::types::TaskInfo::error`] of the affected task only.

mod builder;
mod controller;
mod results;

pub use builder::BatchControllerBuilder;
pub use controller::{BatchController, BatchState, Phase};
pub use results::{HandleRecord, ResultStore};
