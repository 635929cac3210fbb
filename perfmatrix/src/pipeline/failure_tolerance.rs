//! Failure policy for stage groups.
//!
//! The benchmark group is fail-fast: the comparative report is worthless
//! with a variant missing. The profile group continues past a failed variant
//! and collects every failure.

use crate::errors::PerfMatrixError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a group handles failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Stop the group on the first failure (default).
    #[default]
    FailFast,
    /// Record the failure and move on to the next variant.
    ContinueOnFailure,
}

/// Record of one failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Group the failure happened in.
    pub stage: String,
    /// Variant label, when the failure is scoped to one variant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// Error message.
    pub error: String,
    /// Error type name.
    pub error_type: String,
    /// Whether the failure made the group fail.
    pub fatal: bool,
    /// When the failure was recorded.
    pub timestamp: DateTime<Utc>,
    /// Additional context, e.g. the failing command.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl FailureRecord {
    /// Creates a new failure record.
    #[must_use]
    pub fn new(stage: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            variant: None,
            error: error.into(),
            error_type: "Error".to_string(),
            fatal: false,
            timestamp: Utc::now(),
            context: HashMap::new(),
        }
    }

    /// Creates a record from a pipeline error, keeping its type and command.
    #[must_use]
    pub fn from_error(stage: impl Into<String>, error: &PerfMatrixError) -> Self {
        let mut record = Self::new(stage, error.to_string()).with_error_type(error.error_type());
        let tool_failure = match error {
            PerfMatrixError::ToolInvocation(failure) => Some(failure),
            PerfMatrixError::Build(failure) => Some(&failure.source),
            _ => None,
        };
        if let Some(failure) = tool_failure {
            record.context.extend(failure.to_dict());
        }
        record
    }

    /// Sets the error type.
    #[must_use]
    pub fn with_error_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = error_type.into();
        self
    }

    /// Scopes the record to one variant.
    #[must_use]
    pub fn for_variant(mut self, label: impl Into<String>) -> Self {
        self.variant = Some(label.into());
        self
    }

    /// Marks the record as having failed its group.
    #[must_use]
    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }
}

/// Collects failures and completions while a group runs.
#[derive(Debug)]
pub struct FailureCollector {
    mode: FailureMode,
    failures: Vec<FailureRecord>,
    completed: Vec<String>,
}

impl FailureCollector {
    /// Creates a new failure collector.
    #[must_use]
    pub fn new(mode: FailureMode) -> Self {
        Self {
            mode,
            failures: Vec::new(),
            completed: Vec::new(),
        }
    }

    /// Records a failure. In fail-fast mode every failure is fatal.
    pub fn record_failure(&mut self, record: FailureRecord) {
        let record = match self.mode {
            FailureMode::FailFast => record.fatal(),
            FailureMode::ContinueOnFailure => record,
        };
        self.failures.push(record);
    }

    /// Records a completed unit of work.
    pub fn record_completion(&mut self, label: impl Into<String>) {
        self.completed.push(label.into());
    }

    /// Returns true if any failure made the group fail.
    #[must_use]
    pub fn has_fatal(&self) -> bool {
        self.failures.iter().any(|f| f.fatal)
    }

    /// Returns all failures.
    #[must_use]
    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    /// Returns the completed units in order.
    #[must_use]
    pub fn completed(&self) -> &[String] {
        &self.completed
    }

    /// Consumes the collector, returning its failures.
    #[must_use]
    pub fn into_failures(self) -> Vec<FailureRecord> {
        self.failures
    }
}
