//! Candidate-source boundary.
//!
//! A reduction plan decides what shrink to try next. The driver only ever
//! asks for "the next candidate" and reports back whether the last one was
//! accepted; the catalogue of transformations and their ordering live entirely
//! behind this trait.
//!
//! The two failure modes are distinct variants of one error type so the
//! driver's loop can pattern-match directly: [`PlanError::Exhausted`] is the
//! normal end of the search, while [`PlanError::ApplicationFailed`] is a
//! transient condition the driver retries a bounded number of times.

mod chunk;


pub use chunk::ChunkPlan;

use thiserror::Error;

use crate::shader_job::ShaderJob;

/// Why the plan could not produce a candidate.
#[derive(Debug, Error)]
pub enum PlanError {
    /// No further reduction opportunities exist. Normal termination of the
    /// shrink loop, not a defect.
    #[error("no more reduction opportunities")]
    Exhausted,

    /// The chosen transformation could not be legally applied to this state.
    /// Retryable; persistent failure indicates a broken plan.
    #[error("reduction transformation could not be applied: {reason}")]
    ApplicationFailed {
        /// Why the transformation did not apply.
        reason: String,
    },
}

/// Produces candidate states and adapts to accept/reject feedback.
///
/// A plan must be monotonically shrinking and deterministic: it must never
/// produce a candidate equal to a previously accepted state. The driver
/// treats such a revisit as a fatal consistency violation.
pub trait ReductionPlan {
    /// Produces the next candidate derived from `current`.
    ///
    /// # Errors
    ///
    /// [`PlanError::Exhausted`] when no reduction opportunities remain;
    /// [`PlanError::ApplicationFailed`] when the chosen transformation did not
    /// apply to this state.
    fn next(&mut self, current: &ShaderJob) -> Result<ShaderJob, PlanError>;

    /// Informs the plan whether its last candidate was accepted, letting it
    /// narrow or widen future choices.
    fn feedback(&mut self, accepted: bool);
}
