//! Observability events.
//!
//! The workflow engine reports data-consistency problems through an
//! [`EventSink`] instead of failing the call. [`TracingEventSink`] forwards
//! events to `tracing`; [`MemoryEventSink`] keeps them for inspection.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Emitted when an entity has more than one current history row.
pub const STATUS_HISTORY_INCONSISTENCIES: &str = "status_history_inconsistencies";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "I"),
            Severity::Warning => write!(f, "W"),
            Severity::Error => write!(f, "E"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub kind: String,
    pub severity: Severity,
    pub message: String,
    pub context: BTreeMap<String, String>,
    pub at: DateTime<Utc>,
}

impl Event {
    pub fn new(kind: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            severity,
            message: message.into(),
            context: BTreeMap::new(),
            at: Utc::now(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Writes events to the active `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: Event) {
        let context = serde_json::to_string(&event.context).unwrap_or_default();
        match event.severity {
            Severity::Info => {
                tracing::info!(kind = %event.kind, context = %context, "{}", event.message)
            }
            Severity::Warning => {
                tracing::warn!(kind = %event.kind, context = %context, "{}", event.message)
            }
            Severity::Error => {
                tracing::error!(kind = %event.kind, context = %context, "{}", event.message)
            }
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<Event>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events.lock().iter().filter(|e| e.kind == kind).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: Event) {
        self.events.lock().push(event);
    }
}
