//! Stage group status and kind enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The stage groups a pipeline run is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    /// Signal generation, matrix build, one benchmark invocation, cleanup.
    Benchmark,
    /// Signal generation, per-variant debug build, profiler, annotator, cleanup.
    Profile,
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Benchmark => write!(f, "benchmark"),
            Self::Profile => write!(f, "profile"),
        }
    }
}

/// The execution status of a stage group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    /// Group is currently running.
    Running,
    /// Group completed. Individual profile variants may still have failed.
    Ok,
    /// Group was switched off by configuration.
    Skip,
    /// Group hit a fatal failure and was aborted after cleanup.
    Fail,
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Ok => write!(f, "ok"),
            Self::Skip => write!(f, "skip"),
            Self::Fail => write!(f, "fail"),
        }
    }
}
