//! A scripted process runner.
//!
//! `ScriptedRunner` never launches anything. It records each command and
//! imitates the file effects of the tools the pipeline drives, recognised by
//! program name:
//!
//! - compiler (`gcc`, `cc`, `clang`): writes the `-o` path
//! - generator (`python3`): writes `ts_<kind>.dat` in its working directory
//! - benchmarking tool (`hyperfine`): runs the template per label, writing
//!   each output file, then the markdown report
//! - profiler (`valgrind`): writes the trace and the program's output file
//! - any program run with `StdoutSink::Capture`: prints an annotated report

use crate::core::LABEL_PLACEHOLDER;
use crate::errors::ToolInvocationFailure;
use crate::process::{CommandSpec, ExitOutcome, ProcessRunner, StdoutSink};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

const COMPILERS: &[&str] = &["gcc", "cc", "clang"];

/// Makes a program fail when every listed argument is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRule {
    /// Program name the rule applies to.
    pub program: String,
    /// Arguments that must all appear. Empty matches every invocation.
    pub required_args: Vec<String>,
}

impl FailureRule {
    fn matches(&self, command: &CommandSpec) -> bool {
        program_name(command) == self.program
            && self.required_args.iter().all(|a| command.has_arg(a))
    }
}

/// A `ProcessRunner` that records invocations and fakes tool output.
#[derive(Debug)]
pub struct ScriptedRunner {
    invocations: Mutex<Vec<CommandSpec>>,
    failures: Vec<FailureRule>,
    signal_kinds: Vec<String>,
    compiler_output: bool,
    report_rows: Option<Vec<String>>,
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRunner {
    /// Creates a runner where every tool succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            invocations: Mutex::new(Vec::new()),
            failures: Vec::new(),
            signal_kinds: vec!["sine".to_string(), "impulse".to_string()],
            compiler_output: true,
            report_rows: None,
        }
    }

    /// Fails `program` whenever all of `required_args` are present.
    #[must_use]
    pub fn fail_on(mut self, program: &str, required_args: &[&str]) -> Self {
        self.failures.push(FailureRule {
            program: program.to_string(),
            required_args: required_args.iter().map(ToString::to_string).collect(),
        });
        self
    }

    /// Sets the signal kinds the generator writes.
    #[must_use]
    pub fn with_signal_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.signal_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    /// Makes the compiler exit cleanly without writing a binary.
    #[must_use]
    pub fn without_compiler_output(mut self) -> Self {
        self.compiler_output = false;
        self
    }

    /// Writes these row labels into the benchmark report instead of the real ones.
    #[must_use]
    pub fn with_report_rows<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.report_rows = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Every command run so far, in order.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandSpec> {
        self.invocations.lock().clone()
    }

    /// Commands run for `program`, in order.
    #[must_use]
    pub fn invocations_of(&self, program: &str) -> Vec<CommandSpec> {
        self.invocations
            .lock()
            .iter()
            .filter(|c| program_name(c) == program)
            .cloned()
            .collect()
    }

    /// Program names in invocation order.
    #[must_use]
    pub fn programs(&self) -> Vec<String> {
        self.invocations.lock().iter().map(program_name).collect()
    }

    fn simulate(&self, command: &CommandSpec, stdout: &StdoutSink) -> Result<String, String> {
        let args = command.args_lossy();
        let program = program_name(command);
        match program.as_str() {
            p if COMPILERS.contains(&p) => {
                if self.compiler_output {
                    if let Some(out) = value_after(&args, "-o") {
                        write(Path::new(&out), "#!binary\n")?;
                    }
                }
                Ok(())
            }
            "python3" => {
                let dir = command
                    .get_current_dir()
                    .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
                for kind in &self.signal_kinds {
                    write(&dir.join(format!("ts_{kind}.dat")), "0.0\n1.0\n")?;
                }
                Ok(())
            }
            "hyperfine" => self.simulate_benchmark(&args),
            "valgrind" => simulate_profiler(&args),
            _ => Ok(()),
        }?;

        Ok(match stdout {
            StdoutSink::Capture => "Ir  file:function\n1,000  filt.c:main\n".to_string(),
            StdoutSink::Discard | StdoutSink::Inherit => String::new(),
        })
    }

    fn simulate_benchmark(&self, args: &[String]) -> Result<(), String> {
        // --parameter-list <name> <values>
        let labels: Vec<String> = args
            .iter()
            .position(|a| a == "--parameter-list")
            .and_then(|pos| args.get(pos + 2))
            .map(|list| list.split(',').map(ToString::to_string).collect())
            .unwrap_or_default();
        let template = args.last().cloned().unwrap_or_default();

        for label in &labels {
            let words = split_template(&template.replace(LABEL_PLACEHOLDER, label));
            let binary = words.first().ok_or("empty command template")?;
            if !Path::new(binary).is_file() {
                return Err(format!("{binary}: not found"));
            }
            if let Some(output) = words.get(2) {
                write(Path::new(output), "0.5\n")?;
            }
        }

        if let Some(report) = value_after(args, "--export-markdown") {
            let rows = self.report_rows.as_ref().unwrap_or(&labels);
            write(Path::new(&report), &markdown_report(rows))?;
        }
        Ok(())
    }

    fn partial_output(command: &CommandSpec) {
        let args = command.args_lossy();
        if let Some(report) = value_after(&args, "--export-markdown") {
            let _ = write(
                Path::new(&report),
                "| Command | Mean [ms] | Min [ms] | Max [ms] | Relative |\n",
            );
        }
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        stdout: StdoutSink,
    ) -> Result<ExitOutcome, ToolInvocationFailure> {
        self.invocations.lock().push(command.clone());

        if self.failures.iter().any(|rule| rule.matches(command)) {
            Self::partial_output(command);
            return Err(ToolInvocationFailure::exit(
                command.render(),
                Some(1),
                "scripted failure",
            ));
        }

        let stdout = self
            .simulate(command, &stdout)
            .map_err(|stderr| ToolInvocationFailure::exit(command.render(), Some(1), stderr))?;
        Ok(ExitOutcome {
            code: 0,
            stdout,
            stderr: String::new(),
            duration_ms: 0.0,
        })
    }
}

fn program_name(command: &CommandSpec) -> String {
    Path::new(command.program())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn value_after(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}

fn write(path: &Path, contents: &str) -> Result<(), String> {
    std::fs::write(path, contents).map_err(|e| format!("{}: {e}", path.display()))
}

fn simulate_profiler(args: &[String]) -> Result<(), String> {
    let trace = args
        .iter()
        .find_map(|a| a.strip_prefix("--callgrind-out-file="))
        .ok_or("no trace path")?;
    let program: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    let binary = program.first().ok_or("no program to profile")?;
    if !Path::new(binary.as_str()).is_file() {
        return Err(format!("{binary}: not found"));
    }
    if let Some(output) = program.get(2) {
        write(Path::new(output.as_str()), "0.5\n")?;
    }
    write(Path::new(trace), "events: Ir\n")
}

fn markdown_report(labels: &[String]) -> String {
    let mut out = String::from(
        "| Command | Mean [ms] | Min [ms] | Max [ms] | Relative |\n|:---|---:|---:|---:|---:|\n",
    );
    for (i, label) in labels.iter().enumerate() {
        let mean = 10.0 + i as f64;
        out.push_str(&format!(
            "| `{label}` | {mean:.1} ± 0.2 | {:.1} | {:.1} | {:.2} |\n",
            mean - 0.5,
            mean + 0.5,
            mean / 10.0
        ));
    }
    out
}

/// Splits a command template the way a POSIX shell splits single-quoted words.
fn split_template(template: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;
    let mut escaped = false;
    for c in template.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\'' => {
                quoted = !quoted;
                in_word = true;
            }
            '\\' if !quoted => {
                escaped = true;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}
