//! Shader-job state model.
//!
//! A shader job is one program variant under reduction: an ordered collection
//! of shader sources, an optional license header, and a uniform descriptor.
//! Every reduction step constructs a *new* job from the current one; the
//! driver reassigns its notion of "current" only after a step is confirmed
//! interesting.
//!
//! # Binding representations
//!
//! A job's uniforms are either binding-free (used in memory while reducing) or
//! binding-bound (used when materializing for Vulkan-style consumers). At most
//! one representation is active at a time, and transitioning or querying in
//! the wrong representation is a logic error, not a recoverable condition.
//! [`ShaderJob::bound_view`] produces a transient binding-bound clone for the
//! duration of a write so the in-memory state stays binding-free.

mod uniforms;


pub use uniforms::{UniformInfo, UniformsInfo};

use serde::{Deserialize, Serialize};

/// Pipeline stage of a single shader source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderKind {
    /// Vertex shader.
    Vertex,
    /// Fragment shader.
    Fragment,
    /// Compute shader.
    Compute,
}

impl ShaderKind {
    /// All kinds, in the fixed order used for materialization and hashing.
    pub const ALL: [Self; 3] = [Self::Vertex, Self::Fragment, Self::Compute];

    /// File extension used when materializing this shader next to the job's
    /// JSON file.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Vertex => "vert",
            Self::Fragment => "frag",
            Self::Compute => "comp",
        }
    }
}

/// One shader source artifact within a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderSource {
    /// Pipeline stage this source belongs to.
    pub kind: ShaderKind,
    /// GLSL source text.
    pub source: String,
}

/// One program variant under reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderJob {
    license: Option<String>,
    shaders: Vec<ShaderSource>,
    uniforms: UniformsInfo,
}

impl ShaderJob {
    /// Creates a shader job from its parts.
    #[must_use]
    pub const fn new(
        license: Option<String>,
        uniforms: UniformsInfo,
        shaders: Vec<ShaderSource>,
    ) -> Self {
        Self {
            license,
            shaders,
            uniforms,
        }
    }

    /// The license header emitted at the top of each materialized shader, if
    /// any.
    #[must_use]
    pub fn license(&self) -> Option<&str> {
        self.license.as_deref()
    }

    /// The job's shader sources, in pipeline order.
    #[must_use]
    pub fn shaders(&self) -> &[ShaderSource] {
        &self.shaders
    }

    /// The job's uniform descriptor.
    #[must_use]
    pub const fn uniforms(&self) -> &UniformsInfo {
        &self.uniforms
    }

    /// Returns a new job with the same license and uniforms but different
    /// shader sources. This is how plans and the cleanup pass derive variants.
    #[must_use]
    pub fn with_shaders(&self, shaders: Vec<ShaderSource>) -> Self {
        Self {
            license: self.license.clone(),
            shaders,
            uniforms: self.uniforms.clone(),
        }
    }

    /// Whether the uniforms carry explicit binding slots.
    #[must_use]
    pub fn has_uniform_bindings(&self) -> bool {
        self.uniforms.has_bindings()
    }

    /// Strips binding slots from every uniform.
    ///
    /// # Panics
    ///
    /// Panics if the job is already binding-free.
    pub fn remove_uniform_bindings(&mut self) {
        self.uniforms.remove_bindings();
    }

    /// Assigns sequential binding slots to every uniform.
    ///
    /// # Panics
    ///
    /// Panics if the job already carries bindings.
    pub fn make_uniform_bindings(&mut self) {
        self.uniforms.make_bindings();
    }

    /// Returns a transient binding-bound clone of this job, for the duration
    /// of a write. The receiver stays binding-free.
    ///
    /// # Panics
    ///
    /// Panics if this job already carries bindings.
    #[must_use]
    pub fn bound_view(&self) -> Self {
        let mut bound = self.clone();
        bound.make_uniform_bindings();
        bound
    }
}
