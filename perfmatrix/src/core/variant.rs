//! Optimization levels and the variant matrix built from them.

use super::artifact::ArtifactLayout;
use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A compiler optimization level. The label doubles as the flag suffix (`-O2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptLevel {
    /// No optimization.
    O0,
    /// Basic optimization.
    O1,
    /// Standard optimization.
    O2,
    /// Aggressive optimization.
    O3,
    /// Optimize for size.
    Os,
    /// `O3` plus standards-breaking float math.
    Ofast,
}

impl OptLevel {
    /// Every level, in matrix order.
    pub const ALL: [Self; 6] = [Self::O0, Self::O1, Self::O2, Self::O3, Self::Os, Self::Ofast];

    /// The label used in file names and reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::O0 => "O0",
            Self::O1 => "O1",
            Self::O2 => "O2",
            Self::O3 => "O3",
            Self::Os => "Os",
            Self::Ofast => "Ofast",
        }
    }

    /// The flag handed to the compiler.
    #[must_use]
    pub fn compiler_flag(self) -> String {
        format!("-{}", self.label())
    }
}

impl fmt::Display for OptLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OptLevel {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('-');
        Self::ALL
            .into_iter()
            .find(|level| level.label() == trimmed)
            .ok_or_else(|| ConfigurationError::UnknownVariant {
                label: s.to_string(),
            })
    }
}

/// One entry of the build matrix: a level plus every path derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    level: OptLevel,
    binary: PathBuf,
    output: PathBuf,
    trace: PathBuf,
    annotated_report: PathBuf,
}

impl Variant {
    /// Creates the variant for `level` under `layout`.
    #[must_use]
    pub fn new(level: OptLevel, layout: &ArtifactLayout) -> Self {
        let label = level.label();
        Self {
            level,
            binary: layout.binary(label),
            output: layout.output(label),
            trace: layout.trace(label),
            annotated_report: layout.annotated_report(label),
        }
    }

    /// Returns the optimization level.
    #[must_use]
    pub fn level(&self) -> OptLevel {
        self.level
    }

    /// Returns the label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.level.label()
    }

    /// Path of the binary built for this variant.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Path the binary writes its filtered samples to.
    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Path of the profiler trace.
    #[must_use]
    pub fn trace(&self) -> &Path {
        &self.trace
    }

    /// Path of the annotated profile report.
    #[must_use]
    pub fn annotated_report(&self) -> &Path {
        &self.annotated_report
    }

    /// Files that must not outlive the stage consuming this variant.
    #[must_use]
    pub fn transient_files(&self) -> [PathBuf; 2] {
        [self.binary.clone(), self.output.clone()]
    }

    /// The trace and annotated report profiling this variant leaves behind.
    #[must_use]
    pub fn profile_files(&self) -> [PathBuf; 2] {
        [self.trace.clone(), self.annotated_report.clone()]
    }
}

/// The ordered, deterministic set of variants a run builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantMatrix {
    variants: Vec<Variant>,
}

impl VariantMatrix {
    /// Expands `levels` into variants, keeping the given order.
    #[must_use]
    pub fn new(levels: &[OptLevel], layout: &ArtifactLayout) -> Self {
        Self {
            variants: levels.iter().map(|&level| Variant::new(level, layout)).collect(),
        }
    }

    /// The full `O0..Ofast` matrix.
    #[must_use]
    pub fn full(layout: &ArtifactLayout) -> Self {
        Self::new(&OptLevel::ALL, layout)
    }

    /// Iterates the variants in matrix order.
    pub fn iter(&self) -> std::slice::Iter<'_, Variant> {
        self.variants.iter()
    }

    /// Returns the number of variants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Returns true if the matrix has no variants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Labels in matrix order.
    #[must_use]
    pub fn labels(&self) -> Vec<&'static str> {
        self.variants.iter().map(Variant::label).collect()
    }

    /// Comma-joined labels, as the benchmarking tool's parameter list expects.
    #[must_use]
    pub fn label_list(&self) -> String {
        self.labels().join(",")
    }

    /// Binaries and outputs of every variant.
    #[must_use]
    pub fn transient_files(&self) -> Vec<PathBuf> {
        self.variants
            .iter()
            .flat_map(Variant::transient_files)
            .collect()
    }

    /// Traces and annotated reports of every variant.
    #[must_use]
    pub fn profile_files(&self) -> Vec<PathBuf> {
        self.variants.iter().flat_map(Variant::profile_files).collect()
    }
}

impl<'a> IntoIterator for &'a VariantMatrix {
    type Item = &'a Variant;
    type IntoIter = std::slice::Iter<'a, Variant>;

    fn into_iter(self) -> Self::IntoIter {
        self.variants.iter()
    }
}
