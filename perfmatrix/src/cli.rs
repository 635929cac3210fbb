//! CLI argument parsing using Clap.

use crate::config::PipelineConfiguration;
use crate::core::OptLevel;
use crate::errors::ConfigurationError;
use crate::observability::LogFormat;
use clap::Parser;
use std::path::PathBuf;

/// Build, benchmark and profile one C program across optimization levels.
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)] // CLI flags are naturally boolean
#[command(name = "perfmatrix")]
#[command(version, about, long_about = None)]
#[command(after_help = "Examples:
  perfmatrix --target ./build --exe filt --variants O0,O2
  perfmatrix --skip-callgrind --runs 50
  perfmatrix --skip-signal-gen --skip-hyperfine --summary-json run.json
")]
pub struct Cli {
    // === Target ===
    /// Directory holding `<exe>.c`; binaries and reports are written here
    #[arg(long, env = "PERFMATRIX_TARGET")]
    pub target: Option<PathBuf>,

    /// Executable base name
    #[arg(long)]
    pub exe: Option<String>,

    /// Optimization levels to build (comma-separated: O0,O1,O2,O3,Os,Ofast)
    #[arg(long, value_delimiter = ',')]
    pub variants: Option<Vec<OptLevel>>,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    // === Stage switches ===
    /// Use existing signal files instead of generating them
    #[arg(long)]
    pub skip_signal_gen: bool,

    /// Do not run the benchmark group
    #[arg(long)]
    pub skip_hyperfine: bool,

    /// Do not run the profile group
    #[arg(long)]
    pub skip_callgrind: bool,

    // === Signals ===
    /// Directory signals are generated in
    #[arg(long)]
    pub signal_dir: Option<PathBuf>,

    /// Extra argument for the signal generator, e.g. a seed (can use multiple times)
    #[arg(long, action = clap::ArgAction::Append, allow_hyphen_values = true)]
    pub signal_arg: Vec<String>,

    /// Samples generated for benchmarking
    #[arg(long)]
    pub bench_samples: Option<u32>,

    /// Samples generated for profiling
    #[arg(long)]
    pub profile_samples: Option<u32>,

    /// Sample rate of the generated signals
    #[arg(long)]
    pub sample_rate: Option<u32>,

    // === Benchmark ===
    /// Warmup runs per variant
    #[arg(long)]
    pub warmup: Option<u32>,

    /// Measured runs per variant
    #[arg(long)]
    pub runs: Option<u32>,

    /// Compile benchmark variants concurrently (true/false)
    #[arg(long, value_name = "BOOL")]
    pub parallel_builds: Option<bool>,

    // === Output ===
    /// Write the run summary as JSON to this file
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Builds the run configuration: defaults, then the config file, then flags.
    ///
    /// # Errors
    ///
    /// Returns `ConfigFile` if the configuration file cannot be loaded.
    pub fn to_configuration(&self) -> Result<PipelineConfiguration, ConfigurationError> {
        let mut config = match &self.config {
            Some(path) => PipelineConfiguration::from_json_file(path)?,
            None => PipelineConfiguration::default(),
        };

        if let Some(target) = &self.target {
            config.target.clone_from(target);
        }
        if let Some(exe) = &self.exe {
            config.executable.clone_from(exe);
        }
        if let Some(variants) = &self.variants {
            config.variants.clone_from(variants);
        }
        if let Some(dir) = &self.signal_dir {
            config.signal.directory.clone_from(dir);
        }
        config
            .signal
            .generator
            .args
            .extend(self.signal_arg.iter().cloned());

        config.skip_signal_gen |= self.skip_signal_gen;
        config.skip_benchmark |= self.skip_hyperfine;
        config.skip_profile |= self.skip_callgrind;

        let overrides = [
            (self.bench_samples, &mut config.signal.bench_samples),
            (self.profile_samples, &mut config.signal.profile_samples),
            (self.sample_rate, &mut config.signal.sample_rate),
            (self.warmup, &mut config.benchmark.warmup),
            (self.runs, &mut config.benchmark.runs),
        ];
        for (value, field) in overrides {
            if let Some(value) = value {
                *field = value;
            }
        }
        if let Some(parallel) = self.parallel_builds {
            config.parallel_builds = parallel;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("perfmatrix").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).to_configuration().unwrap();
        assert_eq!(config, PipelineConfiguration::default());
    }

    #[test]
    fn test_flags_override() {
        let cli = parse(&[
            "--target",
            "./build",
            "--exe",
            "filt",
            "--variants",
            "O0,O2",
            "--skip-hyperfine",
            "--runs",
            "3",
            "--signal-arg",
            "--seed=7",
            "--parallel-builds",
            "false",
            "-vv",
        ]);
        let config = cli.to_configuration().unwrap();

        assert_eq!(config.target, PathBuf::from("./build"));
        assert_eq!(config.executable, "filt");
        assert_eq!(config.variants, vec![OptLevel::O0, OptLevel::O2]);
        assert!(config.skip_benchmark);
        assert!(!config.skip_profile);
        assert_eq!(config.benchmark.runs, 3);
        assert_eq!(config.benchmark.warmup, 5);
        assert!(config.signal.generator.args.contains(&"--seed=7".to_string()));
        assert!(!config.parallel_builds);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_unknown_variant_rejected() {
        assert!(Cli::try_parse_from(["perfmatrix", "--variants", "O9"]).is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("perfmatrix.json");
        std::fs::write(&path, r#"{ "executable": "from_file", "benchmark": { "runs": 9 } }"#)
            .unwrap();

        let config = parse(&["--config", path.to_str().unwrap(), "--exe", "filt"])
            .to_configuration()
            .unwrap();

        assert_eq!(config.executable, "filt");
        assert_eq!(config.benchmark.runs, 9);
    }
}
