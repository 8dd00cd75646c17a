//! Per-task results of the most recent execution.

use crate::error::Error;
use crate::request::RequestDescriptor;
use crate::types::{TaskId, TaskInfo, TaskResult};
use crate::Result;
use bytes::Bytes;
use std::collections::HashMap;

/// What a task was executed with: its descriptor and the handle serial number.
#[derive(Debug, Clone)]
pub struct HandleRecord {
    /// Unique for the lifetime of the controller.
    pub serial: u64,
    pub descriptor: RequestDescriptor,
}

#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    results: HashMap<TaskId, TaskResult>,
    handles: HashMap<TaskId, HandleRecord>,
    elapsed_seconds: f64,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: TaskId, result: TaskResult, handle: HandleRecord) {
        self.handles.insert(id.clone(), handle);
        self.results.insert(id, result);
    }

    pub fn info(&self, id: &TaskId) -> Result<&TaskInfo> {
        self.result(id).map(|r| &r.info)
    }

    pub fn response(&self, id: &TaskId) -> Result<&Bytes> {
        self.result(id).map(|r| &r.body)
    }

    pub fn result(&self, id: &TaskId) -> Result<&TaskResult> {
        self.results.get(id).ok_or_else(|| Error::not_found(id))
    }

    pub fn handle(&self, id: &TaskId) -> Result<&HandleRecord> {
        self.handles.get(id).ok_or_else(|| Error::not_found(id))
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn set_elapsed_seconds(&mut self, secs: f64) {
        self.elapsed_seconds = secs;
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Drop all results and reset elapsed time to 0.
    pub fn clear(&mut self) {
        self.results.clear();
        self.handles.clear();
        self.elapsed_seconds = 0.0;
    }
}
