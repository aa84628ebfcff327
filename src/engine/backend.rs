//! Engine backends: where a script actually runs.
//!
//! [`ProcessBackend`] writes the script to a transient file and runs the
//! external engine on it. [`InProcessBackend`] hands the script to a closure,
//! for embedded engines and for replaying recorded engine output.

use std::fmt;
use std::io::Write;
use std::process::Stdio;

use crate::error::{EngineError, EngineResult};

use super::dialect::Dialect;
use super::executable::Executable;

/// Captured engine output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutput {
    /// Standard output followed by standard error.
    pub text: String,
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
}

impl EngineOutput {
    /// Output of a run that exited with status 0.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: Some(0),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

pub trait EngineBackend: Send + Sync {
    /// Run `script` to completion and capture everything it printed.
    fn run(&self, dialect: &dyn Dialect, script: &str) -> EngineResult<EngineOutput>;

    /// Human-readable description for logs and errors.
    fn describe(&self) -> String;
}

/// Runs an external engine executable once per script.
///
/// Standard output and standard error are captured separately and joined
/// stdout first, so warnings do not keep their position relative to result
/// records in [`EngineOutput::text`]. Decoding is unaffected, since error and
/// warning detection scans the whole text.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    executable: Executable,
    extra_args: Vec<String>,
}

impl ProcessBackend {
    pub fn new(executable: Executable, extra_args: Vec<String>) -> Self {
        Self {
            executable,
            extra_args,
        }
    }

    pub fn executable(&self) -> &Executable {
        &self.executable
    }
}

impl EngineBackend for ProcessBackend {
    fn run(&self, dialect: &dyn Dialect, script: &str) -> EngineResult<EngineOutput> {
        // The file is deleted when `file` drops, on every return path.
        let mut file = tempfile::Builder::new()
            .prefix("prover-bridge-")
            .suffix(dialect.script_suffix())
            .tempfile()
            .map_err(|source| EngineError::Script { source })?;
        file.write_all(script.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|source| EngineError::Script { source })?;

        let mut cmd = self.executable.command();
        cmd.args(&self.extra_args)
            .args(dialect.command_args(file.path()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(
            command = %self.describe(),
            script = %file.path().display(),
            bytes = script.len(),
            "running engine"
        );

        let output = cmd.output().map_err(|source| EngineError::Spawn {
            command: self.describe(),
            source,
        })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }

        tracing::debug!(
            status = ?output.status.code(),
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "engine finished"
        );

        Ok(EngineOutput {
            text,
            status: output.status.code(),
        })
    }

    fn describe(&self) -> String {
        let mut desc = self.executable.to_string();
        for arg in &self.extra_args {
            desc.push(' ');
            desc.push_str(arg);
        }
        desc
    }
}

type RunFn = dyn Fn(&str) -> EngineResult<EngineOutput> + Send + Sync;

/// Runs scripts through a closure instead of a process.
pub struct InProcessBackend {
    name: String,
    run: Box<RunFn>,
}

impl InProcessBackend {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&str) -> EngineResult<EngineOutput> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            run: Box::new(run),
        }
    }

    /// A backend that ignores the script and always prints `text`.
    pub fn replay(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new("replay", move |_| Ok(EngineOutput::ok(text.clone())))
    }
}

impl fmt::Debug for InProcessBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InProcessBackend")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl EngineBackend for InProcessBackend {
    fn run(&self, _dialect: &dyn Dialect, script: &str) -> EngineResult<EngineOutput> {
        (self.run)(script)
    }

    fn describe(&self) -> String {
        format!("in-process:{}", self.name)
    }
}
