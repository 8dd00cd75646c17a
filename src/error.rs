use crate::types::TaskId;
use thiserror::Error;

/// Structured error context for spec validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field of the request spec that caused the error (e.g., "encoding", "header")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., the rejected value)
    pub details: Option<String>,
    /// Task the spec was submitted under, when known
    pub task: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            task: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for batch construction, submission and inspection.
///
/// Per-task network failures are not errors at this level: they are recorded in
/// [`crate::types::TaskInfo::error`] and never abort a batch.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Construction error: {message}")]
    Construction {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid request spec: {message}{}", format_context(.context))]
    InvalidSpec {
        message: String,
        context: ErrorContext,
    },

    #[error("Task not found: {id}")]
    NotFound { id: TaskId },

    #[error("Batch busy: {reason}")]
    Busy { reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref task) = ctx.task {
        parts.push(format!("task: {}", task));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create an invalid-spec error with structured context
    pub fn invalid_spec(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::InvalidSpec {
            message: msg.into(),
            context,
        }
    }

    pub fn busy(reason: impl Into<String>) -> Self {
        Error::Busy {
            reason: reason.into(),
        }
    }

    pub fn not_found(id: impl Into<TaskId>) -> Self {
        Error::NotFound { id: id.into() }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::InvalidSpec { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Attach the task id to an invalid-spec error raised before the id was known.
    pub(crate) fn for_task(self, id: &TaskId) -> Self {
        match self {
            Error::InvalidSpec { message, context } => Error::InvalidSpec {
                message,
                context: context.with_task(id.to_string()),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_spec_display_includes_context() {
        let err = Error::invalid_spec(
            "Request encoding 'xml' not supported",
            ErrorContext::new()
                .with_field_path("encoding")
                .with_details("expected json or form"),
        );
        assert_eq!(
            err.to_string(),
            "Invalid request spec: Request encoding 'xml' not supported \
             (field: encoding, details: expected json or form)"
        );
    }

    #[test]
    fn test_for_task_only_touches_invalid_spec() {
        let err = Error::invalid_spec("bad", ErrorContext::new()).for_task(&TaskId::from("t1"));
        assert_eq!(err.context().and_then(|c| c.task.as_deref()), Some("t1"));

        let busy = Error::busy("execution in progress").for_task(&TaskId::from("t1"));
        assert!(busy.context().is_none());
    }

    #[test]
    fn test_not_found_display() {
        assert_eq!(Error::not_found(3u64).to_string(), "Task not found: 3");
        assert_eq!(Error::not_found("req1").to_string(), "Task not found: req1");
    }
}
