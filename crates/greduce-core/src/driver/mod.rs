//! Reduction driver control loop.
//!
//! The driver owns one reduction session: it verifies the unmodified input is
//! interesting, then repeatedly asks the plan for a smaller candidate, judges
//! it (through the result cache), keeps it only if the interesting behavior
//! survives, and finally runs a macro-cleanup pass over the best state.
//!
//! ```text
//! AWAITING_CANDIDATE -> TESTING -> {ACCEPTED, REJECTED} -> AWAITING_CANDIDATE
//!          |                                                      |
//!          +-> EXHAUSTED / STEP_LIMIT_REACHED -> FINALIZING -> DONE
//! ```
//!
//! Every attempt leaves a named artifact in the working directory, tagged with
//! its outcome, so the directory is the audit record of the whole session and
//! an interrupted reduction can be resumed with an attempt-index offset.
//!
//! # Sessions
//!
//! One driver instance owns one session. Its mutable fields (current state,
//! counters, cache sets) are not designed for concurrent use; parallel
//! reductions of independent inputs run separate drivers with separate
//! working directories.

mod cache;

#[cfg(test)]
mod tests;

pub use cache::{CacheError, CacheLookup, ResultCache};

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fileops::{self, JobFileError};
use crate::judge::{FileJudge, JudgeError};
use crate::plan::{PlanError, ReductionPlan};
use crate::shader_job::ShaderJob;
use crate::simplify::simplify_shader_job;

/// Attempts to judge the unreduced input before giving up on it.
pub const NUM_INITIAL_TRIES: u32 = 5;

/// Attempts to apply a reduction step before treating the plan as broken.
pub const MAX_APPLICATION_ATTEMPTS: u32 = 3;

/// Sentinel file: the initial input was never judged interesting.
pub const NOT_INTERESTING: &str = "NOT_INTERESTING";

/// Sentinel file: the step limit was hit before the plan was exhausted, so
/// the result may be further reducible.
pub const REDUCTION_INCOMPLETE: &str = "REDUCTION_INCOMPLETE";

/// Outcome tag carried in a step artifact's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The candidate was accepted: the interesting behavior survived.
    Success,
    /// The candidate was rejected.
    Fail,
}

impl StepOutcome {
    /// The tag appended to the step's base name.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Fail => "fail",
        }
    }
}

/// Display name for one reduction step's artifacts.
///
/// Pure function of its inputs: `<base>_reduced_<NNNN>` with the attempt index
/// zero-padded to four digits, plus `_success`/`_fail` when an outcome is
/// given.
#[must_use]
pub fn reduction_step_name(base: &str, attempt: u32, outcome: Option<StepOutcome>) -> String {
    match outcome {
        Some(outcome) => format!("{base}_reduced_{attempt:04}_{}", outcome.tag()),
        None => format!("{base}_reduced_{attempt:04}"),
    }
}

/// Fatal reduction failures.
///
/// Everything recoverable (a flaky judge during initial verification, a
/// transiently inapplicable reduction step) is retried internally; what
/// escapes here aborts the session.
#[derive(Debug, Error)]
pub enum ReductionError {
    /// Filesystem or serialization failure on the reduction trail.
    #[error(transparent)]
    JobFile(#[from] JobFileError),

    /// Operational judge failure, distinct from a negative verdict.
    #[error(transparent)]
    Judge(#[from] JudgeError),

    /// The plan kept failing to apply a reduction step; it is broken, not the
    /// input.
    #[error("reduction plan failed persistently: {0}")]
    Plan(#[source] PlanError),

    /// The search revisited an accepted state.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Orchestrates one reduction session.
pub struct ReductionDriver<P> {
    plan: P,
    cache: ResultCache,
    successful_reductions: u32,
}

impl<P: ReductionPlan> ReductionDriver<P> {
    /// Creates a driver around a candidate-generation plan.
    #[must_use]
    pub fn new(plan: P) -> Self {
        Self {
            plan,
            cache: ResultCache::new(),
            successful_reductions: 0,
        }
    }

    /// Number of accepted reduction steps so far in this session.
    #[must_use]
    pub const fn successful_reductions(&self) -> u32 {
        self.successful_reductions
    }

    /// Runs the reduction session.
    ///
    /// Returns the final output's base name, or `None` if the initial state
    /// was never judged interesting (in which case a [`NOT_INTERESTING`]
    /// sentinel is left in `work_dir` and nothing was reduced).
    ///
    /// A nonzero `file_count_offset` continues a previously interrupted
    /// reduction: step numbering starts above the offset and initial
    /// verification is skipped, the caller asserting that the input is
    /// already known to be interesting. `step_limit` of `None` means
    /// unbounded.
    ///
    /// # Errors
    ///
    /// Returns [`ReductionError`] on judge or filesystem failure, on a
    /// persistently failing plan, or on a detected reduction loop.
    pub fn run(
        &mut self,
        initial: ShaderJob,
        short_name: &str,
        file_count_offset: u32,
        judge: &mut dyn FileJudge,
        work_dir: &Path,
        step_limit: Option<u32>,
    ) -> Result<Option<String>, ReductionError> {
        // Vulkan compatibility: reduce binding-free, re-introduce bindings at
        // every materialization.
        let requires_bindings = initial.has_uniform_bindings();
        let mut initial = initial;
        if requires_bindings {
            initial.remove_uniform_bindings();
        }

        if file_count_offset > 0 {
            info!("Continuing reduction for {short_name}");
        } else {
            info!("Starting reduction for {short_name}");
            if !self.verify_initial(&initial, requires_bindings, short_name, judge, work_dir)? {
                return Ok(None);
            }
        }

        let mut current = initial;
        let mut step_count: u32 = 0;
        let mut stopped_early = false;

        loop {
            info!(
                "Trying reduction attempt {step_count} ({} successful so far).",
                self.successful_reductions
            );
            let candidate = match self.next_candidate(&current) {
                Ok(candidate) => {
                    step_count += 1;
                    candidate
                },
                Err(PlanError::Exhausted) => {
                    info!("No more to reduce; stopping.");
                    break;
                },
                Err(err @ PlanError::ApplicationFailed { .. }) => {
                    return Err(ReductionError::Plan(err));
                },
            };

            let attempt = step_count + file_count_offset;
            let step_name = reduction_step_name(short_name, attempt, None);
            let interesting = self.is_interesting(
                judge,
                &candidate,
                requires_bindings,
                &step_name,
                work_dir,
                true,
            )?;

            let outcome = if interesting {
                StepOutcome::Success
            } else {
                StepOutcome::Fail
            };
            let tagged = reduction_step_name(short_name, attempt, Some(outcome));
            fileops::move_shader_job(
                &work_dir.join(format!("{step_name}.json")),
                &work_dir.join(format!("{tagged}.json")),
            )?;

            if interesting {
                info!("Successful reduction.");
                self.successful_reductions += 1;
                current = candidate;
            } else {
                info!("Failed reduction.");
            }
            self.plan.feedback(interesting);

            if let Some(limit) = step_limit {
                if step_count >= limit {
                    info!("Stopping reduction due to hitting step limit {limit}.");
                    stopped_early = true;
                    break;
                }
            }
        }

        let final_name = self.finalize(&current, requires_bindings, short_name, judge, work_dir)?;

        if stopped_early {
            fileops::create_sentinel(work_dir, REDUCTION_INCOMPLETE)?;
        }
        Ok(Some(final_name))
    }

    /// Confirms the unmodified input is interesting, tolerating a flaky judge
    /// with a bounded number of attempts. Never consults the cache: the
    /// un-reduced state is queried at most once per attempt anyway, and
    /// recording it would pollute the pass set before any reduction exists.
    fn verify_initial(
        &mut self,
        initial: &ShaderJob,
        requires_bindings: bool,
        short_name: &str,
        judge: &mut dyn FileJudge,
        work_dir: &Path,
    ) -> Result<bool, ReductionError> {
        for attempt in 1..=NUM_INITIAL_TRIES {
            if self.is_interesting(judge, initial, requires_bindings, short_name, work_dir, false)? {
                info!("Result from initial state is interesting - proceeding with reduction.");
                return Ok(true);
            }
            info!("Result from initial state is not interesting (attempt {attempt})");
        }
        info!("Tried {NUM_INITIAL_TRIES} times; stopping.");
        fileops::create_sentinel(work_dir, NOT_INTERESTING)?;
        Ok(false)
    }

    /// Asks the plan for the next candidate, retrying transient application
    /// failures a bounded number of times.
    fn next_candidate(&mut self, current: &ShaderJob) -> Result<ShaderJob, PlanError> {
        let mut attempts = 0;
        loop {
            match self.plan.next(current) {
                Ok(candidate) => return Ok(candidate),
                Err(PlanError::Exhausted) => return Err(PlanError::Exhausted),
                Err(err @ PlanError::ApplicationFailed { .. }) => {
                    attempts += 1;
                    if attempts == MAX_APPLICATION_ATTEMPTS {
                        return Err(err);
                    }
                    debug!("Reduction step failed to apply (attempt {attempts}); retrying.");
                },
            }
        }
    }

    /// Runs the macro-cleanup pass over the final state and judges the result
    /// once, uncached. If the cleanup broke the interesting behavior, the last
    /// confirmed-interesting state is re-materialized unmodified: correctness
    /// over cosmetic cleanliness.
    fn finalize(
        &mut self,
        current: &ShaderJob,
        requires_bindings: bool,
        short_name: &str,
        judge: &mut dyn FileJudge,
        work_dir: &Path,
    ) -> Result<String, ReductionError> {
        let final_state = simplify_shader_job(current);
        let final_name = format!("{short_name}_reduced_final");
        if !self.is_interesting(
            judge,
            &final_state,
            requires_bindings,
            &final_name,
            work_dir,
            false,
        )? {
            warn!("Failed to simplify final reduction state! Reverting to the non-simplified state.");
            write_state(
                current,
                work_dir,
                &final_name,
                requires_bindings,
            )?;
        }
        Ok(final_name)
    }

    /// Materializes `state` under `name` and decides whether it is
    /// interesting, going through the result cache on the cached path.
    fn is_interesting(
        &mut self,
        judge: &mut dyn FileJudge,
        state: &ShaderJob,
        requires_bindings: bool,
        name: &str,
        work_dir: &Path,
        use_cache: bool,
    ) -> Result<bool, ReductionError> {
        let job_file = write_state(state, work_dir, name, requires_bindings)?;
        let result_file = work_dir.join(format!("{name}.info.json"));

        let fingerprint = if use_cache {
            let fingerprint = fileops::shader_job_fingerprint(&job_file)?;
            match self.cache.lookup(&fingerprint)? {
                CacheLookup::KnownFailing => {
                    debug!("State {fingerprint} already known to fail; skipping judge.");
                    return Ok(false);
                },
                CacheLookup::Unknown => Some(fingerprint),
            }
        } else {
            None
        };

        let interesting = judge.is_interesting(&job_file, &result_file)?;
        if let Some(fingerprint) = fingerprint {
            self.cache.record(fingerprint, interesting)?;
        }
        Ok(interesting)
    }
}

/// Writes `state` as `<name>.json` plus companions in `work_dir`, through a
/// transient binding-bound view when the session's consumers require
/// bindings. The in-memory state stays binding-free.
fn write_state(
    state: &ShaderJob,
    work_dir: &Path,
    name: &str,
    requires_bindings: bool,
) -> Result<std::path::PathBuf, JobFileError> {
    let job_file = work_dir.join(format!("{name}.json"));
    if requires_bindings {
        fileops::write_shader_job(&state.bound_view(), &job_file)?;
    } else {
        fileops::write_shader_job(state, &job_file)?;
    }
    Ok(job_file)
}
