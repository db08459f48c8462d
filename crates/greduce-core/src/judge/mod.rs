//! Interestingness oracle boundary.
//!
//! The judge decides whether a materialized shader job still exhibits the
//! behavior under investigation. Operational failures (the judge itself could
//! not run) are a separate channel from a "not interesting" verdict, so the
//! driver can treat them as fatal instead of silently rejecting a candidate.

mod command;

pub use command::CommandJudge;

use std::io;
use std::path::Path;

use thiserror::Error;

/// Operational failure of the judge, distinct from a negative verdict.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// The interestingness test could not be spawned.
    #[error("failed to spawn interestingness test '{command}': {source}")]
    Spawn {
        /// The command that failed to start.
        command: String,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The interestingness test was killed by a signal before producing a
    /// verdict.
    #[error("interestingness test '{command}' was terminated by a signal")]
    Terminated {
        /// The command that was terminated.
        command: String,
    },

    /// Filesystem failure while recording the judge's diagnostics.
    #[error("io error while judging: {0}")]
    Io(#[from] io::Error),
}

/// Binary interestingness predicate over a materialized shader job.
pub trait FileJudge {
    /// Judges the shader job materialized at `shader_job`.
    ///
    /// May write diagnostic content to `result`.
    ///
    /// # Errors
    ///
    /// Returns [`JudgeError`] on operational failure; `Ok(false)` means the
    /// judge ran and the state is not interesting.
    fn is_interesting(&mut self, shader_job: &Path, result: &Path) -> Result<bool, JudgeError>;
}
