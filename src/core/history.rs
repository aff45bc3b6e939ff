//! Transition trace records.
//!
//! Every trace point of the engine is emitted through `tracing`. When
//! recording is enabled the same information is kept in a bounded
//! [`TraceLog`] that can be inspected or exported as JSON.

use super::event::EventId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use uuid::Uuid;

/// Why a trace record was emitted.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum TraceReason {
    InternalTransition,
    Activated,
    Deactivated,
    /// A state was entered because an event handler fired.
    Hit,
    /// An explicit-exit entry matched the event but not the current state.
    NotMatched,
    GuardRejected,
    Cond,
    Join,
}

/// One recorded trace point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub timestamp: DateTime<Utc>,
    /// Execution context (thread mailbox) that produced the record.
    pub context: Uuid,
    pub app: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub depth: usize,
    pub event: Option<EventId>,
    pub sequence: u64,
    pub reason: TraceReason,
    /// Time spent handling, in microseconds.
    pub elapsed_us: u64,
}

impl TraceRecord {
    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.elapsed_us)
    }
}

/// Bounded buffer of trace records. The oldest record is dropped when full.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TraceLog {
    records: VecDeque<TraceRecord>,
    capacity: usize,
}

impl TraceLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::new(),
            capacity,
        }
    }

    pub fn record(&mut self, record: TraceRecord) {
        if self.capacity == 0 {
            return;
        }
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn records(&self) -> impl Iterator<Item = &TraceRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Destination state names of every record for `app` that entered a state.
    pub fn path_of(&self, app: &str) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.app == app)
            .filter(|r| {
                matches!(
                    r.reason,
                    TraceReason::Activated | TraceReason::Hit | TraceReason::Cond | TraceReason::Join
                )
            })
            .filter_map(|r| r.to.as_deref())
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.records)
    }
}
