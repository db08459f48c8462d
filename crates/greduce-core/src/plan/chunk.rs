//! Built-in line-chunk reduction plan.
//!
//! Treats the job's shader sources as one concatenated sequence of lines and
//! tries to delete contiguous chunks, starting with large chunks and halving
//! the granularity once a sweep finds nothing more to remove. Rejected chunks
//! advance the cursor; accepted chunks keep it in place, since the following
//! lines have shifted into the freed positions.

use tracing::debug;

use super::{PlanError, ReductionPlan};
use crate::shader_job::{ShaderJob, ShaderSource};

/// Line-chunk removal plan with adaptive granularity.
///
/// Every candidate strictly removes at least one non-blank line, so the plan
/// is monotonically shrinking and can never regenerate an accepted state.
#[derive(Debug, Default)]
pub struct ChunkPlan {
    /// Lines per chunk; 0 until the first call sizes it from the input.
    chunk_size: usize,
    /// Chunk index within the current sweep.
    cursor: usize,
}

impl ChunkPlan {
    /// Creates a plan that sizes its first chunk from the initial state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            chunk_size: 0,
            cursor: 0,
        }
    }
}

impl ReductionPlan for ChunkPlan {
    fn next(&mut self, current: &ShaderJob) -> Result<ShaderJob, PlanError> {
        let lines = collect_lines(current);
        let total = lines.len();
        if total == 0 {
            return Err(PlanError::Exhausted);
        }
        if self.chunk_size == 0 {
            self.chunk_size = (total / 2).max(1);
            debug!("Starting chunk sweep with {} line(s) per chunk", self.chunk_size);
        }

        loop {
            let start = self.cursor * self.chunk_size;
            if start >= total {
                if self.chunk_size == 1 {
                    return Err(PlanError::Exhausted);
                }
                self.chunk_size /= 2;
                self.cursor = 0;
                debug!("Narrowing to {} line(s) per chunk", self.chunk_size);
                continue;
            }
            let end = (start + self.chunk_size).min(total);

            if chunk_is_blank(&lines, start, end) {
                // Deleting only blank lines is not a real shrink. Skip every
                // consecutive blank chunk before reporting, so the driver's
                // bounded retry always lands on a productive position.
                self.cursor += 1;
                loop {
                    let s = self.cursor * self.chunk_size;
                    if s >= total || !chunk_is_blank(&lines, s, (s + self.chunk_size).min(total)) {
                        break;
                    }
                    self.cursor += 1;
                }
                return Err(PlanError::ApplicationFailed {
                    reason: format!("lines {start}..{end} are blank"),
                });
            }

            return Ok(remove_line_range(current, start, end));
        }
    }

    fn feedback(&mut self, accepted: bool) {
        if !accepted {
            self.cursor += 1;
        }
    }
}

fn chunk_is_blank(lines: &[&str], start: usize, end: usize) -> bool {
    lines[start..end].iter().all(|line| line.trim().is_empty())
}

/// All lines of all shader sources, concatenated in shader order.
fn collect_lines(job: &ShaderJob) -> Vec<&str> {
    job.shaders()
        .iter()
        .flat_map(|s| s.source.lines())
        .collect()
}

/// Rebuilds the job with the global line range `[start, end)` removed.
fn remove_line_range(job: &ShaderJob, start: usize, end: usize) -> ShaderJob {
    let mut offset = 0;
    let shaders = job
        .shaders()
        .iter()
        .map(|shader| {
            let kept: Vec<&str> = shader
                .source
                .lines()
                .enumerate()
                .filter(|(i, _)| {
                    let global = offset + i;
                    global < start || global >= end
                })
                .map(|(_, line)| line)
                .collect();
            offset += shader.source.lines().count();
            let mut source = kept.join("\n");
            if !source.is_empty() {
                source.push('\n');
            }
            ShaderSource {
                kind: shader.kind,
                source,
            }
        })
        .collect();
    job.with_shaders(shaders)
}
