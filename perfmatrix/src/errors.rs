//! Error types for perfmatrix.
//!
//! The taxonomy follows the pipeline's failure policy: configuration errors
//! stop the run before any subprocess starts, build failures abort the
//! benchmark group but only one variant of the profile group, tool failures
//! carry the offending command line, and IO failures on shared inputs are
//! fatal to the whole run.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Lines of captured stderr kept when an error is displayed.
const STDERR_TAIL_LINES: usize = 20;

/// The main error type for perfmatrix operations.
#[derive(Debug, Error)]
pub enum PerfMatrixError {
    /// The configuration was rejected before anything ran.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// A single variant failed to compile.
    #[error("{0}")]
    Build(#[from] BuildFailure),

    /// One or more variants of a matrix build failed.
    #[error("{0}")]
    BuildMatrix(#[from] BuildMatrixFailure),

    /// An external tool failed or could not be started.
    #[error("{0}")]
    ToolInvocation(#[from] ToolInvocationFailure),

    /// An expected file was missing or could not be written.
    #[error("{0}")]
    Io(#[from] IoFailure),
}

impl PerfMatrixError {
    /// Short name of the failure class, used in failure records.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::Build(_) | Self::BuildMatrix(_) => "BuildFailure",
            Self::ToolInvocation(_) => "ToolInvocationFailure",
            Self::Io(_) => "IOFailure",
        }
    }

    /// Returns true if no further stage group may run after this error.
    #[must_use]
    pub fn aborts_run(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Io(_))
    }
}

/// Rejected configuration, reported before any subprocess is launched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The target is missing or not a directory.
    #[error("Target {} is not an existing directory", .path.display())]
    TargetNotDirectory {
        /// The configured target.
        path: PathBuf,
    },

    /// The executable name cannot be turned into file names.
    #[error("Invalid executable name '{name}': {reason}")]
    InvalidExecutableName {
        /// The configured name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The source file for the executable does not exist.
    #[error("Source file {} not found", .path.display())]
    MissingSource {
        /// The expected source path.
        path: PathBuf,
    },

    /// The variant matrix has no entries.
    #[error("Variant matrix is empty")]
    EmptyMatrix,

    /// A label appears twice in the variant matrix.
    #[error("Variant '{label}' appears more than once in the matrix")]
    DuplicateVariant {
        /// The repeated label.
        label: String,
    },

    /// A label is not a known optimization level.
    #[error("Unknown optimization level '{label}' (expected one of O0, O1, O2, O3, Os, Ofast)")]
    UnknownVariant {
        /// The unparseable label.
        label: String,
    },

    /// A numeric or textual parameter is out of range.
    #[error("Invalid value for {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Every stage group is switched off.
    #[error("Both --skip-hyperfine and --skip-callgrind are set; nothing would run")]
    NothingToRun,

    /// The configuration file could not be read or parsed.
    #[error("Cannot load configuration file {}: {reason}", .path.display())]
    ConfigFile {
        /// The file path.
        path: PathBuf,
        /// Read or parse error text.
        reason: String,
    },
}

impl ConfigurationError {
    /// Creates an invalid parameter error.
    #[must_use]
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Why an external tool invocation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolFailureKind {
    /// The process could not be started.
    LaunchFailed {
        /// OS error text.
        reason: String,
    },
    /// The process exited unsuccessfully. `None` means it was killed by a signal.
    NonZeroExit {
        /// Exit code, if any.
        code: Option<i32>,
    },
    /// The process exited zero but did not produce what it promised.
    InvalidOutput {
        /// What was wrong.
        reason: String,
    },
}

impl fmt::Display for ToolFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LaunchFailed { reason } => write!(f, "could not be launched: {reason}"),
            Self::NonZeroExit { code: Some(code) } => write!(f, "exited with status {code}"),
            Self::NonZeroExit { code: None } => write!(f, "was terminated by a signal"),
            Self::InvalidOutput { reason } => write!(f, "produced unusable output: {reason}"),
        }
    }
}

/// An external tool returned nonzero, could not be launched, or left bad output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocationFailure {
    /// Rendered command line. Never executed through a shell.
    pub command: String,
    /// What went wrong.
    pub kind: ToolFailureKind,
    /// Captured standard error.
    pub stderr: String,
}

impl ToolInvocationFailure {
    /// Creates a launch failure.
    #[must_use]
    pub fn launch(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            kind: ToolFailureKind::LaunchFailed {
                reason: reason.into(),
            },
            stderr: String::new(),
        }
    }

    /// Creates a nonzero exit failure.
    #[must_use]
    pub fn exit(command: impl Into<String>, code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            kind: ToolFailureKind::NonZeroExit { code },
            stderr: stderr.into(),
        }
    }

    /// Creates an invalid output failure.
    #[must_use]
    pub fn invalid_output(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            kind: ToolFailureKind::InvalidOutput {
                reason: reason.into(),
            },
            stderr: String::new(),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("command".to_string(), serde_json::json!(self.command));
        map.insert("failure".to_string(), serde_json::json!(self.kind.to_string()));
        if let ToolFailureKind::NonZeroExit { code } = self.kind {
            map.insert("exit_code".to_string(), serde_json::json!(code));
        }
        if !self.stderr.is_empty() {
            map.insert("stderr".to_string(), serde_json::json!(self.stderr));
        }
        map
    }
}

impl fmt::Display for ToolInvocationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` {}", self.command, self.kind)?;
        let stderr = self.stderr.trim_end();
        if !stderr.is_empty() {
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = &lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..];
            write!(f, "\n--- stderr ---\n{}", tail.join("\n"))?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolInvocationFailure {}

/// The compiler failed for one variant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Build of variant {label} failed: {source}")]
pub struct BuildFailure {
    /// The variant label.
    pub label: String,
    /// The compiler invocation failure, including its stderr.
    #[source]
    pub source: ToolInvocationFailure,
}

impl BuildFailure {
    /// Creates a new build failure.
    #[must_use]
    pub fn new(label: impl Into<String>, source: ToolInvocationFailure) -> Self {
        Self {
            label: label.into(),
            source,
        }
    }
}

/// Failures collected while building a whole matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMatrixFailure {
    /// One entry per failed variant.
    pub failures: Vec<BuildFailure>,
    /// Size of the matrix that was attempted.
    pub total: usize,
}

impl BuildMatrixFailure {
    /// Labels of the variants that failed.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.label.as_str()).collect()
    }
}

impl fmt::Display for BuildMatrixFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} variants failed to build ({})",
            self.failures.len(),
            self.total,
            self.labels().join(", ")
        )?;
        for failure in &self.failures {
            write!(f, "\n{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BuildMatrixFailure {}

/// A required file was absent or a file could not be written.
#[derive(Debug, Error)]
pub enum IoFailure {
    /// An input the run depends on does not exist.
    #[error("Required input file {} is missing", .path.display())]
    MissingInput {
        /// The missing path.
        path: PathBuf,
    },

    /// A filesystem operation failed.
    #[error("Cannot {action} {}: {source}", .path.display())]
    Access {
        /// What was attempted, e.g. "create".
        action: &'static str,
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl IoFailure {
    /// Creates a missing input error.
    #[must_use]
    pub fn missing(path: impl Into<PathBuf>) -> Self {
        Self::MissingInput { path: path.into() }
    }

    /// Creates an access error.
    #[must_use]
    pub fn access(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Access {
            action,
            path: path.into(),
            source,
        }
    }
}

/// The benchmarking tool's markdown export could not be trusted.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The report file could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        /// The report path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// No markdown table in the text.
    #[error("no table found")]
    NoTable,

    /// A row with fewer cells than the header promises.
    #[error("row has {found} columns, expected {expected}: {line}")]
    ShortRow {
        /// Cells found.
        found: usize,
        /// Cells required.
        expected: usize,
        /// The offending line.
        line: String,
    },

    /// A cell that is not `<value>` or `<value> ± <spread>`.
    #[error("not a measurement: {cell:?}")]
    Measurement {
        /// The offending cell.
        cell: String,
    },

    /// An expected variant has no row.
    #[error("variant {label} has no row")]
    MissingRow {
        /// The variant label.
        label: String,
    },

    /// An expected variant has more than one row.
    #[error("variant {label} has {count} rows")]
    DuplicateRow {
        /// The variant label.
        label: String,
        /// Number of rows found.
        count: usize,
    },

    /// A row for a label that was not benchmarked.
    #[error("unexpected row {label}")]
    UnexpectedRow {
        /// The row label.
        label: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_failure_display_includes_command_and_stderr() {
        let err = ToolInvocationFailure::exit("hyperfine --runs 25", Some(1), "boom\n");
        let text = err.to_string();

        assert!(text.contains("`hyperfine --runs 25` exited with status 1"));
        assert!(text.contains("boom"));
    }

    #[test]
    fn test_tool_failure_stderr_is_truncated() {
        let stderr: String = (0..100).map(|i| format!("line {i}\n")).collect();
        let err = ToolInvocationFailure::exit("gcc", Some(1), stderr);
        let text = err.to_string();

        assert!(text.contains("line 99"));
        assert!(!text.contains("line 10\n"));
    }

    #[test]
    fn test_signal_termination_display() {
        let err = ToolInvocationFailure::exit("valgrind", None, "");
        assert_eq!(err.to_string(), "`valgrind` was terminated by a signal");
    }

    #[test]
    fn test_tool_failure_to_dict() {
        let err = ToolInvocationFailure::exit("gcc -O2", Some(2), "error: x");
        let dict = err.to_dict();

        assert_eq!(dict.get("command").unwrap(), "gcc -O2");
        assert_eq!(dict.get("exit_code").unwrap(), 2);
        assert_eq!(dict.get("stderr").unwrap(), "error: x");
    }

    #[test]
    fn test_build_matrix_failure_lists_labels() {
        let err = BuildMatrixFailure {
            failures: vec![
                BuildFailure::new("O1", ToolInvocationFailure::exit("gcc", Some(1), "")),
                BuildFailure::new("Os", ToolInvocationFailure::launch("gcc", "not found")),
            ],
            total: 6,
        };

        assert_eq!(err.labels(), vec!["O1", "Os"]);
        assert!(err.to_string().starts_with("2 of 6 variants failed to build (O1, Os)"));
    }

    #[test]
    fn test_error_classification() {
        let config: PerfMatrixError = ConfigurationError::EmptyMatrix.into();
        let io: PerfMatrixError = IoFailure::missing("ts_sine.dat").into();
        let tool: PerfMatrixError = ToolInvocationFailure::launch("x", "y").into();

        assert!(config.aborts_run());
        assert!(io.aborts_run());
        assert!(!tool.aborts_run());
        assert_eq!(io.error_type(), "IOFailure");
        assert_eq!(tool.error_type(), "ToolInvocationFailure");
    }

    #[test]
    fn test_access_failure_names_action_and_path() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: PerfMatrixError = IoFailure::access("write", "build/filt_O2.txt", source).into();

        assert_eq!(err.to_string(), "Cannot write build/filt_O2.txt: denied");
        assert!(err.aborts_run());
    }
}
