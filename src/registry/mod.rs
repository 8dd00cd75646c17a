//! 任务注册表 — 按插入顺序保存待执行的请求规格
//!
//! Ordered task registry. Specs are validated when added, so a batch never
//! starts with a request that cannot be built.

use crate::error::{Error, ErrorContext};
use crate::request::RequestBuilder;
use crate::types::{RequestSpec, TaskId};
use crate::Result;

/// Ordered mapping from [`TaskId`] to [`RequestSpec`].
///
/// Re-adding an existing id overwrites its spec in place. Unnamed tasks get
/// `TaskId::Auto(n)` from a counter that only moves forward, so removed
/// surrogates are never handed out again until [`TaskRegistry::clear`].
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    entries: Vec<(TaskId, RequestSpec)>,
    /// `None` once `Auto(u64::MAX)` has been taken.
    next_auto: Option<u64>,
    builder: RequestBuilder,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::with_builder(RequestBuilder::new())
    }

    /// Registry validating specs with the given builder.
    pub fn with_builder(builder: RequestBuilder) -> Self {
        Self {
            entries: Vec::new(),
            next_auto: Some(0),
            builder,
        }
    }

    pub fn builder(&self) -> &RequestBuilder {
        &self.builder
    }

    /// Validate and insert a spec. Returns the id it was stored under.
    pub fn add(&mut self, spec: RequestSpec, name: Option<TaskId>) -> Result<TaskId> {
        if let Err(e) = self.builder.build(&spec) {
            return Err(match &name {
                Some(id) => e.for_task(id),
                None => e,
            });
        }

        let id = match name {
            Some(id) => id,
            None => {
                let n = self.next_auto.ok_or_else(|| {
                    Error::invalid_spec(
                        "no surrogate task id left for an unnamed task",
                        ErrorContext::new().with_details("name the task explicitly"),
                    )
                })?;
                TaskId::Auto(n)
            }
        };
        if let TaskId::Auto(n) = id {
            // explicit Auto ids still advance the counter past them
            self.next_auto = match (self.next_auto, n.checked_add(1)) {
                (Some(next), Some(after)) => Some(next.max(after)),
                _ => None,
            };
        }

        match self.position(&id) {
            Some(i) => self.entries[i].1 = spec,
            None => self.entries.push((id.clone(), spec)),
        }
        Ok(id)
    }

    /// Remove a task. Returns the removed spec, `None` if the id was unknown.
    pub fn remove(&mut self, id: &TaskId) -> Option<RequestSpec> {
        let i = self.position(id)?;
        Some(self.entries.remove(i).1)
    }

    pub fn get(&self, id: &TaskId) -> Option<&RequestSpec> {
        self.position(id).map(|i| &self.entries[i].1)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.position(id).is_some()
    }

    /// Ordered copy of the current entries.
    pub fn snapshot(&self) -> Vec<(TaskId, RequestSpec)> {
        self.entries.clone()
    }

    pub fn ids(&self) -> Vec<TaskId> {
        self.entries.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries and restart surrogate numbering.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_auto = Some(0);
    }

    fn position(&self, id: &TaskId) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == id)
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}
