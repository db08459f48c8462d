//! Judge backed by an external interestingness test command.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use super::{FileJudge, JudgeError};

/// Runs a configured command with the shader-job path appended as the final
/// argument. Exit status 0 means interesting; any other exit status means not
/// interesting. Captured output is written to the result path for later
/// inspection.
///
/// The command runs synchronously; the driver's loop is inherently sequential,
/// so there is nothing to overlap with.
#[derive(Debug, Clone)]
pub struct CommandJudge {
    program: String,
    args: Vec<String>,
}

impl CommandJudge {
    /// Creates a judge for `program` with no extra arguments.
    #[must_use]
    pub const fn new(program: String) -> Self {
        Self {
            program,
            args: Vec::new(),
        }
    }

    /// Adds arguments placed before the shader-job path.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl FileJudge for CommandJudge {
    fn is_interesting(&mut self, shader_job: &Path, result: &Path) -> Result<bool, JudgeError> {
        debug!("Judging {} with '{}'", shader_job.display(), self.program);

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(shader_job)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| JudgeError::Spawn {
                command: self.program.clone(),
                source,
            })?;

        let diagnostics = serde_json::json!({
            "status": output.status.code(),
            "stdout": String::from_utf8_lossy(&output.stdout),
            "stderr": String::from_utf8_lossy(&output.stderr),
        });
        fs::write(result, format!("{diagnostics:#}\n"))?;

        match output.status.code() {
            Some(0) => Ok(true),
            Some(_) => Ok(false),
            None => Err(JudgeError::Terminated {
                command: self.program.clone(),
            }),
        }
    }
}
