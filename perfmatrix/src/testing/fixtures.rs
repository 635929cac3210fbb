//! Filesystem fixtures for tests.

use super::ScriptedRunner;
use crate::config::PipelineConfiguration;
use crate::core::OptLevel;
use crate::stages::StageContext;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A throwaway target directory holding `filt.c`, plus a signal directory.
#[derive(Debug)]
pub struct TestWorkspace {
    _dir: TempDir,
    target: PathBuf,
    signal_dir: PathBuf,
}

impl TestWorkspace {
    /// Creates the workspace.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("build");
        let signal_dir = dir.path().join("signals");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::create_dir_all(&signal_dir).unwrap();
        std::fs::write(target.join("filt.c"), "int main(void) { return 0; }\n").unwrap();
        Self {
            _dir: dir,
            target,
            signal_dir,
        }
    }

    /// The target directory.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// The signal directory.
    pub fn signal_dir(&self) -> &Path {
        &self.signal_dir
    }

    /// Matrix `{O0, O2}`, executable `filt`, signals in the signal directory.
    pub fn config(&self) -> PipelineConfiguration {
        PipelineConfiguration::new()
            .with_target(&self.target)
            .with_executable("filt")
            .with_variants([OptLevel::O0, OptLevel::O2])
            .with_signal_dir(&self.signal_dir)
    }

    /// A stage context over `config` driven by `runner`.
    pub fn context(&self, config: PipelineConfiguration, runner: Arc<ScriptedRunner>) -> StageContext {
        StageContext::new(Arc::new(config), runner)
    }

    /// Writes a signal file as if it had been generated earlier.
    pub fn write_signal(&self, kind: &str) -> PathBuf {
        let path = self.signal_dir.join(format!("ts_{kind}.dat"));
        std::fs::write(&path, "0.0\n1.0\n").unwrap();
        path
    }

    /// Writes every binary of the context's matrix.
    pub fn build_all(&self, ctx: &StageContext) {
        for variant in ctx.matrix() {
            std::fs::write(variant.binary(), "#!binary\n").unwrap();
        }
    }

    /// Sorted file names in `dir`.
    pub fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
