//! Routing telemetry events and the bounded in-memory log.

use chrono::{DateTime, Utc};
use gateway_core::TaskType;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::trace;
use uuid::Uuid;

/// Default number of events kept
pub const DEFAULT_CAPACITY: usize = 100;

/// Telemetry event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// A task entered the router
    RequestStart {
        /// Task correlation id
        task_id: Uuid,
        /// Requested task type
        task_type: TaskType,
        /// Timestamp
        timestamp: DateTime<Utc>,
    },
    /// A provider was picked for the next attempt
    ProviderSelected {
        /// Task correlation id
        task_id: Uuid,
        /// Selected provider
        provider: String,
        /// Composite score, 0-100
        score: f64,
        /// Zero-based attempt number
        hop: usize,
        /// Timestamp
        timestamp: DateTime<Utc>,
    },
    /// An attempt succeeded
    Success {
        /// Task correlation id
        task_id: Uuid,
        /// Provider that answered
        provider: String,
        /// Attempt latency in milliseconds
        latency_ms: u64,
        /// Timestamp
        timestamp: DateTime<Utc>,
    },
    /// An attempt failed
    Failure {
        /// Task correlation id
        task_id: Uuid,
        /// Provider that failed
        provider: String,
        /// Error classification
        error_kind: String,
        /// Error message
        message: String,
        /// Timestamp
        timestamp: DateTime<Utc>,
    },
    /// The router moved on to the next candidate
    Fallback {
        /// Task correlation id
        task_id: Uuid,
        /// Provider that was abandoned
        from_provider: String,
        /// Attempts made so far
        hop: usize,
        /// Timestamp
        timestamp: DateTime<Utc>,
    },
    /// A task was handed to the batch queue
    BatchQueued {
        /// Task correlation id
        task_id: Uuid,
        /// Job identifier
        job_id: String,
        /// Timestamp
        timestamp: DateTime<Utc>,
    },
    /// Every candidate failed and the canned response was returned
    Failsafe {
        /// Task correlation id
        task_id: Uuid,
        /// Requested task type
        task_type: TaskType,
        /// Why the router gave up
        reason: String,
        /// Timestamp
        timestamp: DateTime<Utc>,
    },
}

impl TelemetryEvent {
    /// Get the event type as a string
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RequestStart { .. } => "request_start",
            Self::ProviderSelected { .. } => "provider_selected",
            Self::Success { .. } => "success",
            Self::Failure { .. } => "failure",
            Self::Fallback { .. } => "fallback",
            Self::BatchQueued { .. } => "batch_queued",
            Self::Failsafe { .. } => "failsafe",
        }
    }

    /// Get the timestamp
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::RequestStart { timestamp, .. }
            | Self::ProviderSelected { timestamp, .. }
            | Self::Success { timestamp, .. }
            | Self::Failure { timestamp, .. }
            | Self::Fallback { timestamp, .. }
            | Self::BatchQueued { timestamp, .. }
            | Self::Failsafe { timestamp, .. } => *timestamp,
        }
    }

    /// Get the task correlation id
    #[must_use]
    pub fn task_id(&self) -> Uuid {
        match self {
            Self::RequestStart { task_id, .. }
            | Self::ProviderSelected { task_id, .. }
            | Self::Success { task_id, .. }
            | Self::Failure { task_id, .. }
            | Self::Fallback { task_id, .. }
            | Self::BatchQueued { task_id, .. }
            | Self::Failsafe { task_id, .. } => *task_id,
        }
    }

    /// Provider the event concerns, if any
    #[must_use]
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::ProviderSelected { provider, .. }
            | Self::Success { provider, .. }
            | Self::Failure { provider, .. } => Some(provider),
            Self::Fallback { from_provider, .. } => Some(from_provider),
            Self::RequestStart { .. } | Self::BatchQueued { .. } | Self::Failsafe { .. } => None,
        }
    }
}

/// Bounded event log; the oldest event is evicted when full.
#[derive(Debug)]
pub struct TelemetryLog {
    capacity: usize,
    events: Mutex<VecDeque<TelemetryEvent>>,
}

impl TelemetryLog {
    /// Create a log holding at most `capacity` events (at least one)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Maximum number of events kept
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an event
    pub fn record(&self, event: TelemetryEvent) {
        trace!(event_type = event.event_type(), task_id = %event.task_id(), "Telemetry event");
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// The most recent `n` events, oldest first
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = self.events.lock();
        let skip = events.len().saturating_sub(n);
        events.iter().skip(skip).cloned().collect()
    }

    /// All retained events, oldest first
    #[must_use]
    pub fn snapshot(&self) -> Vec<TelemetryEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Retained events for one task, oldest first
    #[must_use]
    pub fn for_task(&self, task_id: Uuid) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.task_id() == task_id)
            .cloned()
            .collect()
    }

    /// Number of retained events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drop all events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for TelemetryLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(task_id: Uuid) -> TelemetryEvent {
        TelemetryEvent::RequestStart {
            task_id,
            task_type: TaskType::RealtimeChat,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let log = TelemetryLog::new(3);
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            log.record(start(*id));
        }
        assert_eq!(log.len(), 3);
        let kept: Vec<Uuid> = log.snapshot().iter().map(TelemetryEvent::task_id).collect();
        assert_eq!(kept, ids[2..].to_vec());
    }

    #[test]
    fn test_recent_returns_tail() {
        let log = TelemetryLog::default();
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            log.record(start(*id));
        }
        let recent: Vec<Uuid> = log.recent(2).iter().map(TelemetryEvent::task_id).collect();
        assert_eq!(recent, ids[2..].to_vec());
        assert_eq!(log.recent(50).len(), 4);
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let log = TelemetryLog::new(0);
        log.record(start(Uuid::new_v4()));
        log.record(start(Uuid::new_v4()));
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_for_task_and_clear() {
        let log = TelemetryLog::default();
        let task = Uuid::new_v4();
        log.record(start(task));
        log.record(TelemetryEvent::Success {
            task_id: task,
            provider: "p".to_string(),
            latency_ms: 12,
            timestamp: Utc::now(),
        });
        log.record(start(Uuid::new_v4()));

        let events = log.for_task(task);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].provider(), Some("p"));

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_serializes_with_type_tag() {
        let event = TelemetryEvent::Fallback {
            task_id: Uuid::nil(),
            from_provider: "a".to_string(),
            hop: 1,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "fallback");
        assert_eq!(json["from_provider"], "a");
    }
}
