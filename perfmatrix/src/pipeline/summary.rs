//! What a run produced and how it ended.

use super::FailureRecord;
use crate::cancellation::CleanupReport;
use crate::core::{GroupKind, GroupStatus};
use crate::stages::{BenchmarkReport, ProfileArtifact};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Outcome of one stage group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    /// Which group this is.
    pub kind: GroupKind,
    /// Final status.
    pub status: GroupStatus,
    /// Why the group was skipped, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
    /// Persistent artifacts the group left behind.
    pub reports: Vec<PathBuf>,
    /// Parsed timing report (benchmark group).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<BenchmarkReport>,
    /// Per-variant profile artifacts (profile group).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<ProfileArtifact>,
    /// Every failure recorded, fatal or not.
    pub failures: Vec<FailureRecord>,
    /// Whether the group failed in a way that makes the run fail.
    pub fatal: bool,
    /// Whether no later group may run.
    pub aborts_run: bool,
    /// What the group's cleanup removed.
    pub cleanup: CleanupReport,
}

impl GroupReport {
    /// A report for a group that is about to run.
    #[must_use]
    pub fn new(kind: GroupKind) -> Self {
        Self {
            kind,
            status: GroupStatus::Running,
            skip_reason: None,
            duration_ms: 0.0,
            reports: Vec::new(),
            benchmark: None,
            profiles: Vec::new(),
            failures: Vec::new(),
            fatal: false,
            aborts_run: false,
            cleanup: CleanupReport::default(),
        }
    }

    /// A report for a group that never ran.
    #[must_use]
    pub fn skipped(kind: GroupKind, reason: impl Into<String>) -> Self {
        Self {
            status: GroupStatus::Skip,
            skip_reason: Some(reason.into()),
            ..Self::new(kind)
        }
    }

    /// Labels of the variants that failed without failing the group.
    #[must_use]
    pub fn failed_variants(&self) -> Vec<&str> {
        self.failures
            .iter()
            .filter(|f| !f.fatal)
            .filter_map(|f| f.variant.as_deref())
            .collect()
    }
}

/// The result of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Reports in execution order.
    pub groups: Vec<GroupReport>,
}

impl RunSummary {
    /// Starts a summary for a new run.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::now_v7(),
            started_at: Utc::now(),
            finished_at: None,
            groups: Vec::new(),
        }
    }

    /// Appends a group report.
    pub fn push(&mut self, report: GroupReport) {
        self.groups.push(report);
    }

    /// Marks the run finished.
    #[must_use]
    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    /// Returns the report for `kind`.
    #[must_use]
    pub fn group(&self, kind: GroupKind) -> Option<&GroupReport> {
        self.groups.iter().find(|g| g.kind == kind)
    }

    /// Returns true if a group stopped the run.
    #[must_use]
    pub fn aborted(&self) -> bool {
        self.groups.iter().any(|g| g.aborts_run)
    }

    /// Returns true if any group failed fatally.
    #[must_use]
    pub fn has_fatal_failure(&self) -> bool {
        self.groups.iter().any(|g| g.fatal)
    }

    /// Process exit code: 0 unless a fatal failure occurred.
    ///
    /// Individual profile variants may have failed on a zero exit.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(self.has_fatal_failure())
    }

    /// Serializes the summary as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns the serialization error.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "run {}", self.run_id)?;
        for group in &self.groups {
            write!(f, "  {:<10} {:<5}", group.kind.to_string(), group.status.to_string())?;
            if let Some(reason) = &group.skip_reason {
                write!(f, " ({reason})")?;
            } else {
                write!(f, " {:>9.1} ms", group.duration_ms)?;
            }
            writeln!(f)?;
            for report in &group.reports {
                writeln!(f, "    -> {}", report.display())?;
            }
            for failure in &group.failures {
                let scope = failure.variant.as_deref().unwrap_or("group");
                let first_line = failure.error.lines().next().unwrap_or_default();
                writeln!(f, "    !! [{scope}] {}: {first_line}", failure.error_type)?;
            }
        }
        write!(f, "exit code {}", self.exit_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_skipped_group() {
        let report = GroupReport::skipped(GroupKind::Benchmark, "--skip-hyperfine");
        assert_eq!(report.status, GroupStatus::Skip);
        assert!(!report.fatal);
        assert!(report.reports.is_empty());
    }

    #[test]
    fn test_exit_code_ignores_variant_failures() {
        let mut summary = RunSummary::new();
        let mut profile = GroupReport::new(GroupKind::Profile);
        profile.status = GroupStatus::Ok;
        profile
            .failures
            .push(FailureRecord::new("profile", "annotator crashed").for_variant("O1"));
        summary.push(profile);

        assert_eq!(summary.exit_code(), 0);
        assert_eq!(
            summary.group(GroupKind::Profile).unwrap().failed_variants(),
            vec!["O1"]
        );
    }

    #[test]
    fn test_exit_code_on_fatal_group() {
        let mut summary = RunSummary::new();
        let mut bench = GroupReport::new(GroupKind::Benchmark);
        bench.status = GroupStatus::Fail;
        bench.fatal = true;
        summary.push(bench);
        summary.push(GroupReport::skipped(GroupKind::Profile, "--skip-callgrind"));

        assert_eq!(summary.exit_code(), 1);
        assert!(!summary.aborted());
    }

    #[test]
    fn test_summary_json_and_display() {
        let mut summary = RunSummary::new();
        summary.push(GroupReport::skipped(GroupKind::Benchmark, "--skip-hyperfine"));
        let summary = summary.finish();

        let json: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        assert_eq!(json["groups"][0]["status"], "skip");
        assert_eq!(json["groups"][0]["kind"], "benchmark");

        let text = summary.to_string();
        assert!(text.contains("benchmark"));
        assert!(text.ends_with("exit code 0"));
    }
}
