//! Fingerprint result cache and reduction-loop detection.

use std::collections::HashSet;

use thiserror::Error;

use crate::fingerprint::Fingerprint;

/// Fatal cache-consistency violation.
///
/// A fingerprint can only reach both sets if the search revisited a state it
/// had already accepted, which is impossible while the plan is monotonically
/// shrinking and deterministic. The session aborts rather than papering over
/// it.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A previously accepted state was produced again.
    #[error("reduction loop detected: state {fingerprint} was already accepted")]
    LoopDetected {
        /// The offending fingerprint.
        fingerprint: Fingerprint,
    },
}

/// Verdict of a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    /// Confirmed not interesting; reject without invoking the judge.
    KnownFailing,
    /// Never seen; must be judged.
    Unknown,
}

/// Fingerprints of previously judged states, partitioned by outcome.
///
/// The failing set saves redundant judge invocations when independent shrink
/// attempts converge on the same simplification. The passing set doubles as a
/// correctness assertion: legitimate shrinking never revisits an accepted
/// state.
#[derive(Debug, Default)]
pub struct ResultCache {
    failing: HashSet<Fingerprint>,
    passing: HashSet<Fingerprint>,
}

impl ResultCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies a fingerprint before judging.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::LoopDetected`] if the fingerprint belongs to a
    /// previously accepted state.
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Result<CacheLookup, CacheError> {
        if self.passing.contains(fingerprint) {
            return Err(CacheError::LoopDetected {
                fingerprint: *fingerprint,
            });
        }
        if self.failing.contains(fingerprint) {
            Ok(CacheLookup::KnownFailing)
        } else {
            Ok(CacheLookup::Unknown)
        }
    }

    /// Records a judged outcome.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::LoopDetected`] if the fingerprint is already in
    /// the opposite set; the two sets must stay disjoint.
    pub fn record(&mut self, fingerprint: Fingerprint, interesting: bool) -> Result<(), CacheError> {
        let opposite = if interesting {
            &self.failing
        } else {
            &self.passing
        };
        if opposite.contains(&fingerprint) {
            return Err(CacheError::LoopDetected { fingerprint });
        }
        if interesting {
            self.passing.insert(fingerprint);
        } else {
            self.failing.insert(fingerprint);
        }
        Ok(())
    }

    /// Number of states confirmed not interesting.
    #[must_use]
    pub fn failing_len(&self) -> usize {
        self.failing.len()
    }

    /// Number of states confirmed interesting.
    #[must_use]
    pub fn passing_len(&self) -> usize {
        self.passing.len()
    }
}
