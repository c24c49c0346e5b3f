//! Toolchain Module
//!
//! Drives the external Scala.js build: the block's source goes into a scratch
//! file, the compiler runs to completion, and the two linker artifacts are read
//! back. The linker writes to fixed output paths, so compiler runs are
//! serialized process-wide. Scratch file names are unique per invocation.

use lazy_static::lazy_static;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{CompilerCommand, PreprocessOptions};
use crate::error::{PreprocessError, Result};

const SOURCE_PLACEHOLDER: &str = "{source}";
const KEPT_DIR: &str = "kept";

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

lazy_static! {
    static ref COMPILE_LOCK: Mutex<()> = Mutex::new(());
}

/// The compiled JavaScript and its source map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifacts {
    pub js: String,
    pub map: String,
}

/// Compiles one script block's source into JavaScript.
pub trait Compiler: Send + Sync {
    fn compile(&self, source: &str) -> Result<CompiledArtifacts>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCRATCH FILES
// ═══════════════════════════════════════════════════════════════════════════════

/// A source file handed to the compiler. Removed on drop unless kept.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    keep: bool,
}

impl ScratchFile {
    pub fn create(dir: &Path, stem: &str, extension: &str, contents: &str) -> Result<Self> {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| PreprocessError::io(dir, e))?;
        }

        let id = SCRATCH_COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = dir.join(format!(
            "{}_{}_{}.{}",
            stem,
            std::process::id(),
            id,
            extension
        ));
        fs::write(&path, contents).map_err(|e| PreprocessError::io(&path, e))?;

        Ok(ScratchFile { path, keep: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Moves the file into `dir` and keeps it. `dir` must not be a directory the
    /// compiler reads sources from.
    pub fn keep_in(mut self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| PreprocessError::io(dir, e))?;
        let file_name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        let kept = dir.join(file_name);
        fs::rename(&self.path, &kept).map_err(|e| PreprocessError::io(&kept, e))?;
        self.keep = true;
        Ok(kept)
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove scratch file");
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SBT / SCALA.JS TOOLCHAIN
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct Toolchain {
    command: CompilerCommand,
    scratch_dir: PathBuf,
    scratch_stem: String,
    scratch_extension: String,
    keep_scratch: bool,
    output_js: PathBuf,
    output_map: PathBuf,
}

impl Toolchain {
    pub fn from_options(options: &PreprocessOptions) -> Self {
        Toolchain {
            command: options.compiler.clone(),
            scratch_dir: options.scratch_dir.clone(),
            scratch_stem: options.scratch_stem.clone(),
            scratch_extension: options.scratch_extension.clone(),
            keep_scratch: options.keep_scratch,
            output_js: options.output_js.clone(),
            output_map: options.output_map_path(),
        }
    }

    fn run(&self, scratch: &Path) -> Result<()> {
        let source = scratch.to_string_lossy();
        let args: Vec<String> = self
            .command
            .args
            .iter()
            .map(|arg| arg.replace(SOURCE_PLACEHOLDER, &source))
            .collect();
        let command_line = self.command.display();

        info!(command = %command_line, source = %source, "running compiler");
        let started = Instant::now();

        let output = Command::new(&self.command.program)
            .args(&args)
            .current_dir(&self.command.working_dir)
            .output()
            .map_err(|source| PreprocessError::CompilerSpawn {
                command: command_line.clone(),
                source,
            })?;

        debug!(
            command = %command_line,
            elapsed_ms = started.elapsed().as_millis() as u64,
            status = ?output.status.code(),
            "compiler finished"
        );

        if !output.status.success() {
            // sbt reports compile errors on stdout.
            let stderr = String::from_utf8_lossy(&output.stderr);
            let text = if stderr.trim().is_empty() {
                String::from_utf8_lossy(&output.stdout).into_owned()
            } else {
                stderr.into_owned()
            };
            return Err(PreprocessError::CompilerFailed {
                command: command_line,
                status: output.status.code(),
                output: text.trim().to_string(),
            });
        }
        Ok(())
    }
}

fn read_artifact(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(PreprocessError::MissingArtifact {
            path: path.to_path_buf(),
        });
    }
    fs::read_to_string(path).map_err(|e| PreprocessError::io(path, e))
}

impl Compiler for Toolchain {
    fn compile(&self, source: &str) -> Result<CompiledArtifacts> {
        let _guard = COMPILE_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let scratch = ScratchFile::create(
            &self.scratch_dir,
            &self.scratch_stem,
            &self.scratch_extension,
            source,
        )?;
        self.run(scratch.path())?;

        let js = read_artifact(&self.output_js)?;
        let map = read_artifact(&self.output_map)?;

        if self.keep_scratch {
            // Left in the scratch dir it would be compiled again with the next block.
            let kept = scratch.keep_in(&self.scratch_dir.join(KEPT_DIR))?;
            debug!(path = %kept.display(), "kept scratch file");
        }

        Ok(CompiledArtifacts { js, map })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scratch_entries(dir: &Path) -> Vec<PathBuf> {
        if !dir.exists() {
            return Vec::new();
        }
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    #[test]
    fn test_scratch_paths_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("tmp");
        let a = ScratchFile::create(&nested, "Script", "scala", "object A").unwrap();
        let b = ScratchFile::create(&nested, "Script", "scala", "object B").unwrap();

        assert_ne!(a.path(), b.path());
        assert_eq!(fs::read_to_string(a.path()).unwrap(), "object A");
        assert_eq!(fs::read_to_string(b.path()).unwrap(), "object B");

        drop(a);
        drop(b);
        assert!(scratch_entries(&nested).is_empty());
    }

    #[test]
    fn test_scratch_keep_in_moves_file() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchFile::create(dir.path(), "Script", "scala", "x").unwrap();
        let original = scratch.path().to_path_buf();
        let kept = scratch.keep_in(&dir.path().join("kept")).unwrap();

        assert!(kept.exists());
        assert!(!original.exists());
        assert_eq!(kept.parent(), Some(dir.path().join("kept").as_path()));
        assert_eq!(fs::read_to_string(&kept).unwrap(), "x");
    }

    #[cfg(unix)]
    fn shell_toolchain(dir: &Path, script: &str) -> Toolchain {
        let options = PreprocessOptions {
            scratch_dir: dir.join("tmp"),
            compiler: CompilerCommand {
                program: "sh".to_string(),
                args: vec!["-c".to_string(), script.to_string()],
                working_dir: dir.to_path_buf(),
            },
            output_js: dir.join("out.js"),
            ..PreprocessOptions::default()
        };
        Toolchain::from_options(&options)
    }

    #[cfg(unix)]
    #[test]
    fn test_compile_reads_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = shell_toolchain(
            dir.path(),
            "cp '{source}' out.js && echo '{\"version\":3}' > out.js.map",
        );

        let artifacts = toolchain.compile("var $x = 1;").unwrap();
        assert_eq!(artifacts.js, "var $x = 1;");
        assert_eq!(artifacts.map.trim(), "{\"version\":3}");
        assert!(scratch_entries(&dir.path().join("tmp")).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_compile_failure_carries_output() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = shell_toolchain(dir.path(), "echo '[error] type mismatch'; exit 3");

        match toolchain.compile("object Broken {") {
            Err(PreprocessError::CompilerFailed {
                command,
                status,
                output,
            }) => {
                assert!(command.starts_with("sh -c"));
                assert_eq!(status, Some(3));
                assert_eq!(output, "[error] type mismatch");
            }
            other => panic!("expected CompilerFailed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_kept_scratch_not_compiled_again() {
        let dir = tempfile::tempdir().unwrap();
        let mut toolchain = shell_toolchain(
            dir.path(),
            "cat tmp/*.scala > out.js && echo '{}' > out.js.map",
        );
        toolchain.keep_scratch = true;

        assert_eq!(toolchain.compile("object A").unwrap().js, "object A");
        assert_eq!(toolchain.compile("object B").unwrap().js, "object B");

        let scratch = dir.path().join("tmp");
        let loose: Vec<PathBuf> = scratch_entries(&scratch)
            .into_iter()
            .filter(|p| p.is_file())
            .collect();
        assert!(loose.is_empty());
        assert_eq!(scratch_entries(&scratch.join(KEPT_DIR)).len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_map_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = shell_toolchain(dir.path(), "cp '{source}' out.js");

        match toolchain.compile("val x = 1") {
            Err(PreprocessError::MissingArtifact { path }) => {
                assert_eq!(path, dir.path().join("out.js.map"));
            }
            other => panic!("expected MissingArtifact, got {:?}", other),
        }
    }

    #[test]
    fn test_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let options = PreprocessOptions {
            scratch_dir: dir.path().join("tmp"),
            compiler: CompilerCommand {
                program: "svala-no-such-compiler".to_string(),
                args: vec![],
                working_dir: dir.path().to_path_buf(),
            },
            ..PreprocessOptions::default()
        };
        let err = Toolchain::from_options(&options).compile("x").unwrap_err();
        assert!(matches!(err, PreprocessError::CompilerSpawn { .. }));
    }
}
