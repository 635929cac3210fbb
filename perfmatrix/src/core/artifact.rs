//! File naming for everything a run creates.
//!
//! Downstream analysis scripts locate their inputs by these names, so the
//! patterns are fixed:
//!
//! | artifact | path |
//! |---|---|
//! | source | `<target>/<exe>.c` |
//! | binary | `<target>/<exe>_<label>` |
//! | transient output | `<target>/<exe>_<label>.dat` |
//! | timing report | `<target>/<exe>_perf.md` |
//! | trace | `<target>/<exe>_<label>.out` |
//! | annotated report | `<target>/<exe>_<label>.txt` |
//! | input signal | `<signal_dir>/ts_<kind>.dat` |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Placeholder the benchmarking tool substitutes with each variant label.
pub const LABEL_PLACEHOLDER: &str = "{label}";

/// Name of the parameter handed to the benchmarking tool's parameter list.
pub const LABEL_PARAMETER: &str = "label";

/// Resolves artifact paths for one target directory and executable name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLayout {
    target: PathBuf,
    executable: String,
}

impl ArtifactLayout {
    /// Creates a layout rooted at `target` for `executable`.
    #[must_use]
    pub fn new(target: impl Into<PathBuf>, executable: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            executable: executable.into(),
        }
    }

    /// Returns the target directory.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Returns the executable base name.
    #[must_use]
    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// The C source compiled for every variant.
    #[must_use]
    pub fn source(&self) -> PathBuf {
        self.target.join(format!("{}.c", self.executable))
    }

    /// The binary built for `label`.
    #[must_use]
    pub fn binary(&self, label: &str) -> PathBuf {
        self.target.join(format!("{}_{label}", self.executable))
    }

    /// The file a variant's binary writes its filtered samples to.
    #[must_use]
    pub fn output(&self, label: &str) -> PathBuf {
        self.target.join(format!("{}_{label}.dat", self.executable))
    }

    /// The profiler trace for `label`.
    #[must_use]
    pub fn trace(&self, label: &str) -> PathBuf {
        self.target.join(format!("{}_{label}.out", self.executable))
    }

    /// The annotated profile report for `label`.
    #[must_use]
    pub fn annotated_report(&self, label: &str) -> PathBuf {
        self.target.join(format!("{}_{label}.txt", self.executable))
    }

    /// The aggregated timing report.
    #[must_use]
    pub fn perf_report(&self) -> PathBuf {
        self.target.join(format!("{}_perf.md", self.executable))
    }

    /// Binary path with the label left as a placeholder for the benchmarking tool.
    #[must_use]
    pub fn binary_template(&self) -> PathBuf {
        self.binary(LABEL_PLACEHOLDER)
    }

    /// Output path with the label left as a placeholder for the benchmarking tool.
    #[must_use]
    pub fn output_template(&self) -> PathBuf {
        self.output(LABEL_PLACEHOLDER)
    }
}

/// Path of the generated input signal of the given kind.
#[must_use]
pub fn signal_path(dir: &Path, kind: &str) -> PathBuf {
    dir.join(format!("ts_{kind}.dat"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_layout_names() {
        let layout = ArtifactLayout::new("./build/", "filt");

        assert_eq!(layout.source(), PathBuf::from("./build/filt.c"));
        assert_eq!(layout.binary("O0"), PathBuf::from("./build/filt_O0"));
        assert_eq!(layout.output("O2"), PathBuf::from("./build/filt_O2.dat"));
        assert_eq!(layout.trace("Os"), PathBuf::from("./build/filt_Os.out"));
        assert_eq!(layout.annotated_report("Ofast"), PathBuf::from("./build/filt_Ofast.txt"));
        assert_eq!(layout.perf_report(), PathBuf::from("./build/filt_perf.md"));
    }

    #[test]
    fn test_templates_keep_placeholder() {
        let layout = ArtifactLayout::new("out", "butterworth");

        assert_eq!(
            layout.binary_template(),
            PathBuf::from("out/butterworth_{label}")
        );
        assert_eq!(
            layout.output_template(),
            PathBuf::from("out/butterworth_{label}.dat")
        );
    }

    #[test]
    fn test_signal_path() {
        assert_eq!(
            signal_path(Path::new("."), "sine"),
            PathBuf::from("./ts_sine.dat")
        );
        assert_eq!(
            signal_path(Path::new("/tmp/sig"), "impulse"),
            PathBuf::from("/tmp/sig/ts_impulse.dat")
        );
    }
}
