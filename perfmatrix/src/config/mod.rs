//! Pipeline configuration.
//!
//! `PipelineConfiguration` is built once at startup (defaults, then an
//! optional JSON file, then CLI overrides) and shared read-only by every
//! stage for the rest of the run.

use crate::core::{signal_path, ArtifactLayout, OptLevel, VariantMatrix};
use crate::errors::ConfigurationError;
use crate::process::CommandSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// An external tool: program name plus fixed leading arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Program name or path.
    pub program: String,
    /// Arguments always passed first.
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolSpec {
    /// Creates a tool spec.
    #[must_use]
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Starts a command with the program and its fixed arguments.
    #[must_use]
    pub fn command(&self) -> CommandSpec {
        CommandSpec::new(&self.program).args(&self.args)
    }
}

/// Benchmarking tool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkSettings {
    /// The benchmarking tool.
    #[serde(default = "default_benchmark_tool")]
    pub tool: ToolSpec,
    /// Discarded runs per variant.
    #[serde(default = "default_warmup")]
    pub warmup: u32,
    /// Measured runs per variant.
    #[serde(default = "default_runs")]
    pub runs: u32,
}

impl Default for BenchmarkSettings {
    fn default() -> Self {
        Self {
            tool: default_benchmark_tool(),
            warmup: default_warmup(),
            runs: default_runs(),
        }
    }
}

/// Input signal generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSettings {
    /// The generator, run with `--sample-rate` and `--num-samples` appended.
    #[serde(default = "default_generator")]
    pub generator: ToolSpec,
    /// Directory the generator runs in and writes `ts_<kind>.dat` to.
    #[serde(default = "default_signal_dir")]
    pub directory: PathBuf,
    /// Samples per second.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Samples generated for the benchmark group.
    #[serde(default = "default_bench_samples")]
    pub bench_samples: u32,
    /// Samples generated for the profile group. Smaller, to bound profiler time.
    #[serde(default = "default_profile_samples")]
    pub profile_samples: u32,
    /// Kind fed to every variant's binary.
    #[serde(default = "default_input_kind")]
    pub input_kind: String,
    /// Every kind the generator writes. All are transient.
    #[serde(default = "default_signal_kinds")]
    pub kinds: Vec<String>,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            generator: default_generator(),
            directory: default_signal_dir(),
            sample_rate: default_sample_rate(),
            bench_samples: default_bench_samples(),
            profile_samples: default_profile_samples(),
            input_kind: default_input_kind(),
            kinds: default_signal_kinds(),
        }
    }
}

impl SignalSettings {
    /// The file every variant reads.
    #[must_use]
    pub fn input_path(&self) -> PathBuf {
        signal_path(&self.directory, &self.input_kind)
    }

    /// Every file the generator is expected to write.
    #[must_use]
    pub fn generated_paths(&self) -> Vec<PathBuf> {
        self.kinds
            .iter()
            .map(|kind| signal_path(&self.directory, kind))
            .collect()
    }
}

/// Everything a run needs, fixed for its whole duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfiguration {
    /// Directory holding the source; binaries and reports land here too.
    #[serde(default = "default_target")]
    pub target: PathBuf,
    /// Executable base name; the source is `<target>/<executable>.c`.
    #[serde(default = "default_executable")]
    pub executable: String,
    /// Optimization levels to build, in matrix order.
    #[serde(default = "default_variants")]
    pub variants: Vec<OptLevel>,
    /// Compiler and its base flags.
    #[serde(default = "default_compiler")]
    pub compiler: ToolSpec,
    /// Extra compiler flags for profile builds.
    #[serde(default = "default_debug_flags")]
    pub debug_flags: Vec<String>,
    /// Benchmarking tool settings.
    #[serde(default)]
    pub benchmark: BenchmarkSettings,
    /// Instruction profiler. The trace path is appended as `--callgrind-out-file=`.
    #[serde(default = "default_profiler")]
    pub profiler: ToolSpec,
    /// Profile annotator, writing its report to stdout.
    #[serde(default = "default_annotator")]
    pub annotator: ToolSpec,
    /// Input signal settings.
    #[serde(default)]
    pub signal: SignalSettings,
    /// Use signal files already on disk instead of generating them.
    #[serde(default)]
    pub skip_signal_gen: bool,
    /// Do not run the benchmark group.
    #[serde(default, alias = "skip_hyperfine")]
    pub skip_benchmark: bool,
    /// Do not run the profile group.
    #[serde(default, alias = "skip_callgrind")]
    pub skip_profile: bool,
    /// Compile benchmark variants concurrently.
    #[serde(default = "default_parallel_builds")]
    pub parallel_builds: bool,
}

fn default_target() -> PathBuf {
    PathBuf::from(".")
}

fn default_executable() -> String {
    "butterworth".to_string()
}

fn default_variants() -> Vec<OptLevel> {
    OptLevel::ALL.to_vec()
}

fn default_compiler() -> ToolSpec {
    ToolSpec::new(
        "gcc",
        ["-Wall", "-Werror", "-march=native", "-msoft-float", "-std=c99", "-pedantic"],
    )
}

fn default_debug_flags() -> Vec<String> {
    vec!["-g".to_string()]
}

fn default_benchmark_tool() -> ToolSpec {
    ToolSpec::new("hyperfine", Vec::<String>::new())
}

fn default_warmup() -> u32 {
    5
}

fn default_runs() -> u32 {
    25
}

fn default_profiler() -> ToolSpec {
    ToolSpec::new("valgrind", ["--tool=callgrind"])
}

fn default_annotator() -> ToolSpec {
    ToolSpec::new("callgrind_annotate", Vec::<String>::new())
}

fn default_generator() -> ToolSpec {
    ToolSpec::new("python3", ["testing/generate_test_signals.py"])
}

fn default_signal_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_sample_rate() -> u32 {
    22_000
}

fn default_bench_samples() -> u32 {
    44_000
}

fn default_profile_samples() -> u32 {
    4_400
}

fn default_input_kind() -> String {
    "sine".to_string()
}

fn default_signal_kinds() -> Vec<String> {
    vec!["sine".to_string(), "impulse".to_string()]
}

fn default_parallel_builds() -> bool {
    true
}

impl Default for PipelineConfiguration {
    fn default() -> Self {
        Self {
            target: default_target(),
            executable: default_executable(),
            variants: default_variants(),
            compiler: default_compiler(),
            debug_flags: default_debug_flags(),
            benchmark: BenchmarkSettings::default(),
            profiler: default_profiler(),
            annotator: default_annotator(),
            signal: SignalSettings::default(),
            skip_signal_gen: false,
            skip_benchmark: false,
            skip_profile: false,
            parallel_builds: default_parallel_builds(),
        }
    }
}

impl PipelineConfiguration {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a JSON file. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::ConfigFile` if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigurationError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigurationError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&text).map_err(|e| ConfigurationError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns the parse error.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Sets the target directory.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.target = target.into();
        self
    }

    /// Sets the executable base name.
    #[must_use]
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Sets the variant matrix.
    #[must_use]
    pub fn with_variants(mut self, variants: impl IntoIterator<Item = OptLevel>) -> Self {
        self.variants = variants.into_iter().collect();
        self
    }

    /// Sets the compiler.
    #[must_use]
    pub fn with_compiler(mut self, compiler: ToolSpec) -> Self {
        self.compiler = compiler;
        self
    }

    /// Sets the benchmarking tool and its run counts.
    #[must_use]
    pub fn with_benchmark(mut self, benchmark: BenchmarkSettings) -> Self {
        self.benchmark = benchmark;
        self
    }

    /// Sets the profiler.
    #[must_use]
    pub fn with_profiler(mut self, profiler: ToolSpec) -> Self {
        self.profiler = profiler;
        self
    }

    /// Sets the annotator.
    #[must_use]
    pub fn with_annotator(mut self, annotator: ToolSpec) -> Self {
        self.annotator = annotator;
        self
    }

    /// Sets the signal settings.
    #[must_use]
    pub fn with_signal(mut self, signal: SignalSettings) -> Self {
        self.signal = signal;
        self
    }

    /// Sets the directory signals are generated in.
    #[must_use]
    pub fn with_signal_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.signal.directory = dir.into();
        self
    }

    /// Sets the three skip switches.
    #[must_use]
    pub fn with_skips(mut self, signal_gen: bool, benchmark: bool, profile: bool) -> Self {
        self.skip_signal_gen = signal_gen;
        self.skip_benchmark = benchmark;
        self.skip_profile = profile;
        self
    }

    /// Enables or disables concurrent benchmark builds.
    #[must_use]
    pub fn with_parallel_builds(mut self, parallel: bool) -> Self {
        self.parallel_builds = parallel;
        self
    }

    /// File naming for this target and executable.
    #[must_use]
    pub fn layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(&self.target, &self.executable)
    }

    /// The variant matrix in configured order.
    #[must_use]
    pub fn matrix(&self) -> VariantMatrix {
        VariantMatrix::new(&self.variants, &self.layout())
    }

    /// Checks the configuration before anything is launched.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.skip_benchmark && self.skip_profile {
            return Err(ConfigurationError::NothingToRun);
        }

        if !self.target.is_dir() {
            return Err(ConfigurationError::TargetNotDirectory {
                path: self.target.clone(),
            });
        }

        validate_executable_name(&self.executable)?;

        let source = self.layout().source();
        if !source.is_file() {
            return Err(ConfigurationError::MissingSource { path: source });
        }

        if self.variants.is_empty() {
            return Err(ConfigurationError::EmptyMatrix);
        }
        let mut seen = HashSet::new();
        for level in &self.variants {
            if !seen.insert(*level) {
                return Err(ConfigurationError::DuplicateVariant {
                    label: level.label().to_string(),
                });
            }
        }

        for (name, tool) in [
            ("compiler", &self.compiler),
            ("benchmark tool", &self.benchmark.tool),
            ("profiler", &self.profiler),
            ("annotator", &self.annotator),
            ("signal generator", &self.signal.generator),
        ] {
            if tool.program.trim().is_empty() {
                return Err(ConfigurationError::invalid(name, "program must not be empty"));
            }
        }

        if self.benchmark.runs == 0 {
            return Err(ConfigurationError::invalid("runs", "must be at least 1"));
        }

        let signal = &self.signal;
        if signal.sample_rate == 0 {
            return Err(ConfigurationError::invalid("sample rate", "must be greater than 0"));
        }
        if signal.bench_samples == 0 {
            return Err(ConfigurationError::invalid("benchmark samples", "must be greater than 0"));
        }
        if signal.profile_samples == 0 {
            return Err(ConfigurationError::invalid("profile samples", "must be greater than 0"));
        }
        if !signal.kinds.iter().any(|kind| *kind == signal.input_kind) {
            return Err(ConfigurationError::invalid(
                "input kind",
                format!(
                    "'{}' is not among the generated kinds ({})",
                    signal.input_kind,
                    signal.kinds.join(", ")
                ),
            ));
        }
        if let Some(kind) = signal.kinds.iter().find(|kind| !is_plain_name(kind)) {
            return Err(ConfigurationError::invalid(
                "signal kind",
                format!("'{kind}' must be a plain file-name fragment"),
            ));
        }

        Ok(())
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && name != "."
        && name != ".."
}

fn validate_executable_name(name: &str) -> Result<(), ConfigurationError> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name.contains('/') || name.contains('\\') {
        Some("must not contain a path separator")
    } else if name.contains('{') || name.contains('}') {
        Some("must not contain braces")
    } else if name == "." || name == ".." {
        Some("must name a file")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConfigurationError::InvalidExecutableName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn workspace() -> (tempfile::TempDir, PipelineConfiguration) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("filt.c"), "int main(void) { return 0; }\n").unwrap();
        let config = PipelineConfiguration::new()
            .with_target(dir.path())
            .with_executable("filt");
        (dir, config)
    }

    #[test]
    fn test_defaults_match_reference_script() {
        let config = PipelineConfiguration::default();

        assert_eq!(config.executable, "butterworth");
        assert_eq!(config.variants, OptLevel::ALL.to_vec());
        assert_eq!(config.compiler.program, "gcc");
        assert!(config.compiler.args.contains(&"-Werror".to_string()));
        assert_eq!(config.debug_flags, vec!["-g"]);
        assert_eq!(config.benchmark.warmup, 5);
        assert_eq!(config.benchmark.runs, 25);
        assert_eq!(config.signal.sample_rate, 22_000);
        assert_eq!(config.signal.bench_samples, 44_000);
        assert!(config.signal.profile_samples < config.signal.bench_samples);
        assert_eq!(config.signal.input_path(), PathBuf::from("./ts_sine.dat"));
    }

    #[test]
    fn test_valid_workspace_passes() {
        let (_dir, config) = workspace();
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_missing_target() {
        let config = PipelineConfiguration::new().with_target("/definitely/not/here");
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::TargetNotDirectory { .. })
        ));
    }

    #[test]
    fn test_missing_source() {
        let (_dir, config) = workspace();
        let config = config.with_executable("other");
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::MissingSource { .. })
        ));
    }

    #[test]
    fn test_executable_with_separator() {
        let (_dir, config) = workspace();
        let config = config.with_executable("sub/filt");
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidExecutableName { .. })
        ));
    }

    #[test]
    fn test_duplicate_and_empty_matrix() {
        let (_dir, config) = workspace();

        let dup = config.clone().with_variants([OptLevel::O2, OptLevel::O2]);
        assert_eq!(
            dup.validate(),
            Err(ConfigurationError::DuplicateVariant {
                label: "O2".to_string()
            })
        );

        let empty = config.with_variants(Vec::new());
        assert_eq!(empty.validate(), Err(ConfigurationError::EmptyMatrix));
    }

    #[test]
    fn test_all_groups_skipped_is_contradictory() {
        let (_dir, config) = workspace();
        let config = config.with_skips(false, true, true);
        assert_eq!(config.validate(), Err(ConfigurationError::NothingToRun));
    }

    #[test]
    fn test_input_kind_must_be_generated() {
        let (_dir, mut config) = workspace();
        config.signal.input_kind = "nyquist".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_zero_samples_rejected() {
        let (_dir, mut config) = workspace();
        config.signal.profile_samples = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_json_partial_overlay() {
        let config = PipelineConfiguration::from_json_str(
            r#"{
                "executable": "filt",
                "variants": ["O0", "O2"],
                "skip_hyperfine": true,
                "benchmark": { "runs": 3 },
                "signal": { "profile_samples": 100 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.executable, "filt");
        assert_eq!(config.variants, vec![OptLevel::O0, OptLevel::O2]);
        assert!(config.skip_benchmark);
        assert_eq!(config.benchmark.runs, 3);
        assert_eq!(config.benchmark.warmup, 5);
        assert_eq!(config.signal.profile_samples, 100);
        assert_eq!(config.signal.sample_rate, 22_000);
        assert_eq!(config.compiler, default_compiler());
    }

    #[test]
    fn test_json_file_errors_are_configuration_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            PipelineConfiguration::from_json_file(&path),
            Err(ConfigurationError::ConfigFile { .. })
        ));
        assert!(matches!(
            PipelineConfiguration::from_json_file(&dir.path().join("absent.json")),
            Err(ConfigurationError::ConfigFile { .. })
        ));
    }

    #[test]
    fn test_tool_command() {
        let cmd = default_profiler().command().arg("bin");
        assert_eq!(cmd.render(), "valgrind --tool=callgrind bin");
    }
}
