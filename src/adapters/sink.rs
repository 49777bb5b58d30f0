use crate::domain::ports::ErrorSink;
use crate::utils::error::{ErrorKind, ErrorSeverity, JobError};
use std::sync::{Arc, Mutex};

/// Reports through `tracing`; handled drift at warn, the rest at error.
#[derive(Debug, Clone, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn notify(&self, error: &JobError, context: serde_json::Value) {
        if error.severity() == ErrorSeverity::Low {
            tracing::warn!(
                kind = ?error.kind(),
                context = %context,
                "⚠️ {}",
                error
            );
        } else {
            tracing::error!(
                kind = ?error.kind(),
                context = %context,
                suggestion = error.recovery_suggestion(),
                "❌ {}",
                error
            );
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: ErrorKind,
    pub message: String,
    pub context: serde_json::Value,
}

/// Keeps every notification in memory. Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct CollectingErrorSink {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl CollectingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.notifications().iter().map(|n| n.kind).collect()
    }

    pub fn count(&self, kind: ErrorKind) -> usize {
        self.notifications().iter().filter(|n| n.kind == kind).count()
    }
}

impl ErrorSink for CollectingErrorSink {
    fn notify(&self, error: &JobError, context: serde_json::Value) {
        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.push(Notification {
                kind: error.kind(),
                message: error.to_string(),
                context,
            });
        }
    }
}

/// Forwards to both sinks.
impl<A: ErrorSink, B: ErrorSink> ErrorSink for (A, B) {
    fn notify(&self, error: &JobError, context: serde_json::Value) {
        self.0.notify(error, context.clone());
        self.1.notify(error, context);
    }
}
