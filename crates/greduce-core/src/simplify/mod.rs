//! Final macro-cleanup pass.
//!
//! Reduction plans may leave bookkeeping behind, most commonly `#define`
//! lines whose macro is no longer referenced anywhere. This pass removes
//! them and normalizes whitespace. It is deterministic, idempotent, and
//! behavior-preserving; it is not a semantic shrink, which is why the driver
//! runs it exactly once, after the loop, and still re-judges the result.

use crate::shader_job::{ShaderJob, ShaderSource};

/// Cleans up every shader source in the job.
#[must_use]
pub fn simplify_shader_job(job: &ShaderJob) -> ShaderJob {
    let shaders = job
        .shaders()
        .iter()
        .map(|shader| ShaderSource {
            kind: shader.kind,
            source: simplify_source(&shader.source),
        })
        .collect();
    job.with_shaders(shaders)
}

/// Cleans up one shader source: drops `#define` lines whose macro is
/// referenced nowhere else (iterated to a fixpoint, since removing one define
/// can orphan another), trims trailing whitespace, collapses runs of blank
/// lines, and strips blank lines at the edges.
#[must_use]
pub fn simplify_source(source: &str) -> String {
    let mut lines: Vec<String> = source.lines().map(str::to_string).collect();

    loop {
        let before = lines.len();
        lines = remove_unreferenced_defines(lines);
        if lines.len() == before {
            break;
        }
    }

    normalize_whitespace(&lines)
}

fn remove_unreferenced_defines(lines: Vec<String>) -> Vec<String> {
    let referenced: Vec<bool> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| match define_name(line) {
            Some(name) => lines
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && contains_word(other, name)),
            None => true,
        })
        .collect();
    lines
        .into_iter()
        .zip(referenced)
        .filter_map(|(line, keep)| keep.then_some(line))
        .collect()
}

/// The macro name of a `#define` line, if this is one.
fn define_name(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix("#define")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    let end = rest
        .find(|c: char| !c.is_alphanumeric() && c != '_')
        .unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

/// Whole-word occurrence check over identifier boundaries.
fn contains_word(haystack: &str, word: &str) -> bool {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    let mut rest = haystack;
    let mut consumed = 0;
    while let Some(pos) = rest.find(word) {
        let start = consumed + pos;
        let end = start + word.len();
        let before_ok = haystack[..start].chars().next_back().is_none_or(|c| !is_ident(c));
        let after_ok = haystack[end..].chars().next().is_none_or(|c| !is_ident(c));
        if before_ok && after_ok {
            return true;
        }
        // Overlapping restarts cannot produce a word match: any later start
        // inside this span is preceded by an identifier character.
        consumed = start + word.len();
        rest = &haystack[consumed..];
    }
    false
}

fn normalize_whitespace(lines: &[String]) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut previous_blank = false;
    for line in lines {
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            if !previous_blank {
                out.push("");
            }
            previous_blank = true;
        } else {
            out.push(trimmed);
            previous_blank = false;
        }
    }
    while out.first().is_some_and(|l| l.is_empty()) {
        out.remove(0);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }

    if out.is_empty() {
        String::new()
    } else {
        let mut text = out.join("\n");
        text.push('\n');
        text
    }
}
