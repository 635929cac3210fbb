//! Event sink trait and implementations.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

/// Receives pipeline lifecycle events.
#[async_trait]
pub trait EventSink: Send + Sync + std::fmt::Debug {
    /// Emits `event_type` with optional payload. Must never fail.
    async fn emit(&self, event_type: &str, data: Option<Value>);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event_type: &str, _data: Option<Value>) {}
}

/// Logs each event at debug level, so `-v` shows the run's lifecycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventSink;

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        match data {
            Some(data) => debug!(event_type, %data, "Event"),
            None => debug!(event_type, "Event"),
        }
    }
}

/// Records events in order, for assertions.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<(String, Option<Value>)>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event so far, with payloads.
    #[must_use]
    pub fn events(&self) -> Vec<(String, Option<Value>)> {
        self.events.read().clone()
    }

    /// Event types, in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Events of exactly `event_type`.
    #[must_use]
    pub fn events_of_type(&self, event_type: &str) -> Vec<(String, Option<Value>)> {
        self.events
            .read()
            .iter()
            .filter(|(t, _)| t == event_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        self.events.write().push((event_type.to_string(), data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{BUILD_COMPLETED, BUILD_FAILED, GROUP_STARTED};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_logging_sink_accepts_any_payload() {
        LoggingEventSink.emit(BUILD_COMPLETED, Some(serde_json::json!({"label": "O2"}))).await;
        LoggingEventSink.emit(GROUP_STARTED, None).await;
    }

    #[tokio::test]
    async fn test_collecting_sink_keeps_order_and_payloads() {
        let sink = CollectingEventSink::new();
        sink.emit(GROUP_STARTED, None).await;
        sink.emit(BUILD_FAILED, Some(serde_json::json!({"label": "O3"}))).await;
        sink.emit(BUILD_COMPLETED, Some(serde_json::json!({"label": "O0"}))).await;

        assert_eq!(
            sink.event_types(),
            vec![GROUP_STARTED, BUILD_FAILED, BUILD_COMPLETED]
        );
        assert_eq!(
            sink.events_of_type(BUILD_FAILED),
            vec![(BUILD_FAILED.to_string(), Some(serde_json::json!({"label": "O3"})))]
        );
        assert_eq!(sink.events()[0], (GROUP_STARTED.to_string(), None));
    }
}
