//! Batch controller: registry, execution and results behind one handle.

use super::builder::BatchControllerBuilder;
use super::results::{HandleRecord, ResultStore};
use crate::error::Error;
use crate::registry::TaskRegistry;
use crate::request::RequestBuilder;
use crate::transport::{HttpTransport, Multiplexer};
use crate::types::{RequestSpec, TaskId, TaskInfo, TaskResult};
use crate::Result;
use bytes::Bytes;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info, info_span};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Empty,
    Populated,
    Executed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatchState {
    pub phase: Phase,
    pub elapsed_seconds: f64,
}

#[derive(Debug)]
struct Inner {
    registry: TaskRegistry,
    results: ResultStore,
    phase: Phase,
}

/// Marks an execution in progress; cleared on drop, including on unwind.
struct ExecutionGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ExecutionGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::busy("another execution is in progress"))?;
        Ok(Self { flag })
    }
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Collects HTTP tasks and runs them all in one blocking call.
///
/// ```rust,no_run
/// use multi_http_batch::{BatchController, RequestSpec};
///
/// # fn main() -> multi_http_batch::Result<()> {
/// let batch = BatchController::new()?;
/// batch
///     .add_named("profile", RequestSpec::get("http://users.local/profile").with_params("uid=7"))?
///     .add(
///         RequestSpec::post("http://orders.local/list")
///             .with_params(serde_json::json!({"uid": 7}))
///             .json(),
///     )?
///     .execute()?;
///
/// let profile = batch.response_text("profile")?;
/// let orders = batch.info(0u64)?;
/// println!("{} bytes, orders status {:?}", profile.len(), orders.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BatchController {
    inner: Mutex<Inner>,
    executing: AtomicBool,
    transport: HttpTransport,
    multiplexer: Multiplexer,
}

impl BatchController {
    /// Controller with defaults and `MULTI_HTTP_*` environment overrides.
    pub fn new() -> Result<Self> {
        BatchControllerBuilder::new().build()
    }

    pub fn builder() -> BatchControllerBuilder {
        BatchControllerBuilder::new()
    }

    pub(crate) fn from_parts(builder: RequestBuilder, transport: HttpTransport) -> Result<Self> {
        let multiplexer = Multiplexer::open()?;
        Ok(Self {
            inner: Mutex::new(Inner {
                registry: TaskRegistry::with_builder(builder),
                results: ResultStore::new(),
                phase: Phase::Empty,
            }),
            executing: AtomicBool::new(false),
            transport,
            multiplexer,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an unnamed task; it gets the next surrogate id.
    pub fn add(&self, spec: RequestSpec) -> Result<&Self> {
        self.insert(spec, None)?;
        Ok(self)
    }

    /// Add or overwrite a named task.
    pub fn add_named(&self, name: impl Into<TaskId>, spec: RequestSpec) -> Result<&Self> {
        self.insert(spec, Some(name.into()))?;
        Ok(self)
    }

    /// Add a task and return the id it was stored under.
    pub fn insert(&self, spec: RequestSpec, name: Option<TaskId>) -> Result<TaskId> {
        let mut inner = self.lock();
        let id = inner.registry.add(spec, name)?;
        if inner.phase == Phase::Empty {
            inner.phase = Phase::Populated;
        }
        debug!(task = %id, tasks = inner.registry.len(), "task added");
        Ok(id)
    }

    /// Remove a task if present. Only affects future executions.
    pub fn remove(&self, id: impl Into<TaskId>) -> &Self {
        let id = id.into();
        if self.lock().registry.remove(&id).is_some() {
            debug!(task = %id, "task removed");
        }
        self
    }

    /// Run every registered task and block until all are terminal.
    ///
    /// Fails with [`Error::Busy`] if another execution on this controller is in
    /// progress, or when called from inside an async runtime.
    pub fn execute(&self) -> Result<&Self> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(Error::busy(
                "execute blocks the calling thread and cannot run inside an async runtime",
            ));
        }
        let _guard = ExecutionGuard::acquire(&self.executing)?;
        let started = Instant::now();

        let (snapshot, builder) = {
            let inner = self.lock();
            (inner.registry.snapshot(), inner.registry.builder().clone())
        };

        let execution_id = Uuid::new_v4();
        let span = info_span!("batch.execute", %execution_id, tasks = snapshot.len());
        let _span = span.enter();

        let mut tasks = Vec::with_capacity(snapshot.len());
        for (id, spec) in snapshot {
            let descriptor = builder.build(&spec).map_err(|e| e.for_task(&id))?;
            tasks.push((id, descriptor));
        }

        let completions = self.multiplexer.execute(&self.transport, tasks)?;

        let mut store = ResultStore::new();
        let mut failed = 0usize;
        for c in completions {
            if c.info.is_failed() {
                failed += 1;
            }
            store.insert(
                c.id,
                TaskResult {
                    body: c.body,
                    info: c.info,
                },
                HandleRecord {
                    serial: c.serial,
                    descriptor: c.descriptor,
                },
            );
        }
        let elapsed = started.elapsed().as_secs_f64();
        store.set_elapsed_seconds(elapsed);
        let completed = store.len();

        {
            let mut inner = self.lock();
            inner.results = store;
            inner.phase = Phase::Executed;
        }
        info!(elapsed_secs = elapsed, completed, failed, "batch executed");
        Ok(self)
    }

    /// Clear tasks, results and status so the controller can be reused.
    pub fn reset(&self) -> Result<&Self> {
        let _guard = ExecutionGuard::acquire(&self.executing)?;
        let mut inner = self.lock();
        inner.registry.clear();
        inner.results.clear();
        inner.phase = Phase::Empty;
        debug!("batch reset");
        Ok(self)
    }

    pub fn info(&self, id: impl Into<TaskId>) -> Result<TaskInfo> {
        self.lock().results.info(&id.into()).cloned()
    }

    pub fn response(&self, id: impl Into<TaskId>) -> Result<Bytes> {
        self.lock().results.response(&id.into()).cloned()
    }

    /// Response body decoded as UTF-8, invalid sequences replaced.
    pub fn response_text(&self, id: impl Into<TaskId>) -> Result<String> {
        self.lock().results.result(&id.into()).map(TaskResult::text_lossy)
    }

    pub fn result(&self, id: impl Into<TaskId>) -> Result<TaskResult> {
        self.lock().results.result(&id.into()).cloned()
    }

    pub fn handle(&self, id: impl Into<TaskId>) -> Result<HandleRecord> {
        self.lock().results.handle(&id.into()).cloned()
    }

    /// Current tasks in insertion order.
    pub fn task_list(&self) -> Vec<(TaskId, RequestSpec)> {
        self.lock().registry.snapshot()
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        self.lock().registry.ids()
    }

    pub fn len(&self) -> usize {
        self.lock().registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().registry.is_empty()
    }

    /// True once an execution completed since construction or the last reset.
    pub fn status(&self) -> bool {
        self.lock().phase == Phase::Executed
    }

    /// Seconds taken by the most recent execution, 0 before any.
    pub fn exec_time(&self) -> f64 {
        self.lock().results.elapsed_seconds()
    }

    pub fn state(&self) -> BatchState {
        let inner = self.lock();
        BatchState {
            phase: inner.phase,
            elapsed_seconds: inner.results.elapsed_seconds(),
        }
    }

    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn controller() -> BatchController {
        BatchController::builder().without_proxy().build().unwrap()
    }

    #[test]
    fn test_controller_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BatchController>();
    }

    #[test]
    fn test_initial_state() {
        let batch = controller();
        assert!(batch.is_empty());
        assert!(!batch.status());
        assert_eq!(batch.exec_time(), 0.0);
        assert_eq!(
            batch.state(),
            BatchState {
                phase: Phase::Empty,
                elapsed_seconds: 0.0
            }
        );
    }

    #[test]
    fn test_chained_adds_and_phase() {
        let batch = controller();
        batch
            .add_named("t1", RequestSpec::get("http://x/a"))
            .unwrap()
            .add(
                RequestSpec::post("http://x/b")
                    .with_params(json!({"k": "v"}))
                    .json(),
            )
            .unwrap();

        assert_eq!(batch.task_ids(), vec![TaskId::from("t1"), TaskId::Auto(0)]);
        assert_eq!(batch.state().phase, Phase::Populated);

        batch.remove("t1").remove(0u64);
        assert!(batch.is_empty());
        assert_eq!(batch.state().phase, Phase::Populated);
    }

    #[test]
    fn test_invalid_add_leaves_registry_untouched() {
        let batch = controller();
        let err = batch
            .add_named(
                "req0",
                RequestSpec::post("http://x/b")
                    .with_params(json!({"k": "v"}))
                    .encoding("wrong_pattern"),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSpec { .. }));
        assert!(batch.is_empty());
        assert_eq!(batch.state().phase, Phase::Empty);
    }

    #[test]
    fn test_accessors_before_execution_are_not_found() {
        let batch = controller();
        batch.add_named("t1", RequestSpec::get("http://x/a")).unwrap();
        assert!(matches!(batch.info("t1"), Err(Error::NotFound { .. })));
        assert!(matches!(batch.response("t1"), Err(Error::NotFound { .. })));
        assert!(matches!(batch.handle("t1"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_empty_execute_then_reset() {
        let batch = controller();
        batch.execute().unwrap();
        assert!(batch.status());
        assert_eq!(batch.state().phase, Phase::Executed);

        batch.reset().unwrap();
        assert!(!batch.status());
        assert_eq!(batch.exec_time(), 0.0);
        assert_eq!(batch.state().phase, Phase::Empty);
    }

    #[test]
    fn test_execution_guard_rejects_second_holder() {
        let flag = AtomicBool::new(false);
        let first = ExecutionGuard::acquire(&flag).unwrap();
        assert!(matches!(
            ExecutionGuard::acquire(&flag),
            Err(Error::Busy { .. })
        ));
        drop(first);
        assert!(ExecutionGuard::acquire(&flag).is_ok());
    }

    #[test]
    fn test_execute_inside_runtime_is_busy() {
        let batch = controller();
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let res = rt.block_on(async { batch.execute().map(|_| ()) });
        assert!(matches!(res, Err(Error::Busy { .. })));
        assert!(!batch.is_executing());
    }
}
