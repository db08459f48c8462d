//! Uniform descriptor model.
//!
//! Serialized form is the shader-job JSON object: a map from uniform name to
//! `{"func": ..., "args": [...], "binding": N}`, where `binding` is present
//! only in the binding-bound representation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single uniform's setter function, arguments, and optional binding slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformInfo {
    /// Setter function name, e.g. `glUniform1f`.
    pub func: String,
    /// Arguments passed to the setter.
    pub args: Vec<serde_json::Value>,
    /// Binding slot, present only in the binding-bound representation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<u32>,
}

impl UniformInfo {
    /// Creates a binding-free uniform entry.
    #[must_use]
    pub const fn new(func: String, args: Vec<serde_json::Value>) -> Self {
        Self {
            func,
            args,
            binding: None,
        }
    }
}

/// Uniform name → info map for one shader job.
///
/// Invariant: either every entry carries a binding (binding-bound) or none do
/// (binding-free). A mixed map is a logic error and trips an assertion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniformsInfo {
    entries: BTreeMap<String, UniformInfo>,
}

impl UniformsInfo {
    /// Creates an empty descriptor.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Adds or replaces a uniform entry.
    pub fn insert(&mut self, name: impl Into<String>, info: UniformInfo) {
        self.entries.insert(name.into(), info);
    }

    /// Looks up a uniform by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&UniformInfo> {
        self.entries.get(name)
    }

    /// Number of uniforms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the descriptor has no uniforms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in deterministic (name) order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &UniformInfo)> {
        self.entries.iter()
    }

    /// Whether the descriptor is in the binding-bound representation.
    ///
    /// # Panics
    ///
    /// Panics if some entries carry bindings and others do not; that means a
    /// transition was applied non-atomically, which must never happen.
    #[must_use]
    pub fn has_bindings(&self) -> bool {
        let bound = self.entries.values().filter(|u| u.binding.is_some()).count();
        assert!(
            bound == 0 || bound == self.entries.len(),
            "uniforms are in a mixed binding representation"
        );
        bound > 0
    }

    /// Assigns sequential binding slots, in entry order.
    ///
    /// # Panics
    ///
    /// Panics if the descriptor already carries bindings.
    pub fn make_bindings(&mut self) {
        assert!(!self.has_bindings(), "uniforms already carry bindings");
        for (slot, info) in self.entries.values_mut().enumerate() {
            info.binding = Some(u32::try_from(slot).expect("uniform count fits in u32"));
        }
    }

    /// Strips binding slots from every entry.
    ///
    /// # Panics
    ///
    /// Panics if the descriptor is already binding-free but non-empty.
    pub fn remove_bindings(&mut self) {
        assert!(
            self.entries.is_empty() || self.has_bindings(),
            "uniforms are already binding-free"
        );
        for info in self.entries.values_mut() {
            info.binding = None;
        }
    }
}
