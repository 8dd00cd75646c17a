//! Readiness-driven execution of one batch on the calling thread.

use super::http::{HttpTransport, TransportError};
use crate::error::Error;
use crate::request::RequestDescriptor;
use crate::types::{TaskId, TaskInfo};
use crate::Result;
use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Instant;
use tokio::runtime::Runtime;
use tracing::{debug, warn};

/// Lifecycle of the multiplexer across one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Idle,
    Building,
    Running,
    Drained,
}

impl ExecutorState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => ExecutorState::Building,
            2 => ExecutorState::Running,
            3 => ExecutorState::Drained,
            _ => ExecutorState::Idle,
        }
    }
}

/// In-flight context of one task, alive for a single execution.
pub struct RequestHandle {
    serial: u64,
    slot: usize,
    id: TaskId,
    descriptor: RequestDescriptor,
    prepared: std::result::Result<(reqwest::Client, reqwest::Request), TransportError>,
}

impl RequestHandle {
    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    async fn perform(self, transport: &HttpTransport) -> Completion {
        let started = Instant::now();
        let mut info = TaskInfo::pending(self.descriptor.url.as_str());
        let outcome = match self.prepared {
            Ok((client, request)) => {
                transport
                    .transfer(&client, request, &mut info, started)
                    .await
            }
            Err(e) => Err(e),
        };
        info.total_time = started.elapsed().as_secs_f64();

        let body = match outcome {
            Ok(body) => body,
            Err(e) => {
                let failure = e.to_failure();
                warn!(task = %self.id, kind = ?failure.kind, error = %failure.message, "task failed");
                info.error = Some(failure);
                Bytes::new()
            }
        };
        Completion {
            serial: self.serial,
            slot: self.slot,
            id: self.id,
            descriptor: self.descriptor,
            body,
            info,
        }
    }
}

/// Terminal data of one handle, read once after it finished.
#[derive(Debug, Clone)]
pub struct Completion {
    pub serial: u64,
    pub slot: usize,
    pub id: TaskId,
    pub descriptor: RequestDescriptor,
    pub body: Bytes,
    pub info: TaskInfo,
}

/// Owner of the shared event loop.
///
/// A current-thread tokio runtime provides the readiness driver (epoll/kqueue
/// through mio). It lives as long as the multiplexer; handles never outlive the
/// [`Multiplexer::execute`] call that created them.
pub struct Multiplexer {
    runtime: Option<Runtime>,
    next_serial: AtomicU64,
    state: AtomicU8,
}

impl Multiplexer {
    pub fn open() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .thread_name("multi-http")
            .build()
            .map_err(|e| Error::Construction {
                message: format!("failed to create event loop: {}", e),
                source: Some(e),
            })?;
        Ok(Self {
            runtime: Some(runtime),
            next_serial: AtomicU64::new(0),
            state: AtomicU8::new(ExecutorState::Idle as u8),
        })
    }

    pub fn state(&self) -> ExecutorState {
        ExecutorState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, s: ExecutorState) {
        self.state.store(s as u8, Ordering::Release);
    }

    /// Run every task to a terminal state and return completions in task order.
    ///
    /// Blocks the calling thread. Between wake-ups it is parked in the readiness
    /// driver, so CPU use tracks I/O events rather than wall time. A failing task
    /// only affects its own completion.
    pub fn execute(
        &self,
        transport: &HttpTransport,
        tasks: Vec<(TaskId, RequestDescriptor)>,
    ) -> Result<Vec<Completion>> {
        let runtime = self.runtime.as_ref().ok_or_else(|| Error::Construction {
            message: "event loop already closed".to_string(),
            source: None,
        })?;

        self.set_state(ExecutorState::Building);
        let handles: Vec<RequestHandle> = {
            let _enter = runtime.enter();
            tasks
                .into_iter()
                .enumerate()
                .map(|(slot, (id, descriptor))| {
                    let prepared = transport.prepare(&descriptor);
                    RequestHandle {
                        serial: self.next_serial.fetch_add(1, Ordering::Relaxed),
                        slot,
                        id,
                        descriptor,
                        prepared,
                    }
                })
                .collect()
        };
        debug!(handles = handles.len(), "handles registered");

        self.set_state(ExecutorState::Running);
        let mut inflight: FuturesUnordered<_> =
            handles.into_iter().map(|h| h.perform(transport)).collect();
        let mut completions = runtime.block_on(async {
            let mut done = Vec::with_capacity(inflight.len());
            while let Some(c) = inflight.next().await {
                debug!(
                    task = %c.id,
                    status = ?c.info.status,
                    bytes = c.body.len(),
                    remaining = inflight.len(),
                    "handle finished"
                );
                done.push(c);
            }
            done
        });
        self.set_state(ExecutorState::Drained);

        completions.sort_by_key(|c| c.slot);
        self.set_state(ExecutorState::Idle);
        Ok(completions)
    }

    /// Release the event loop now instead of at drop.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(rt) = self.runtime.take() {
            debug!("closing event loop");
            rt.shutdown_background();
        }
    }
}

impl Drop for Multiplexer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multiplexer")
            .field("open", &self.runtime.is_some())
            .field("state", &self.state())
            .finish()
    }
}
