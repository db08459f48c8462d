//! greduce-core - reduction driver for shader-job test cases.
//!
//! Given a shader job that triggers some observable behavior of interest
//! (typically a compiler or driver bug), the driver repeatedly applies
//! shrinking transformations and keeps only those under which an external
//! interestingness test still passes, producing a minimal reproducer and an
//! on-disk trail of every attempt.
//!
//! # Modules
//!
//! - [`shader_job`]: the state model - shader sources, license, uniforms,
//!   and the binding-free/binding-bound representations
//! - [`fingerprint`]: content hashes of materialized states
//! - [`fileops`]: materialization, the step-artifact trail, sentinel files
//! - [`judge`]: the interestingness oracle boundary and the external-command
//!   judge
//! - [`plan`]: the candidate-source boundary and the built-in chunk plan
//! - [`simplify`]: the final macro-cleanup pass
//! - [`driver`]: the control loop tying it all together
//!
//! The driver is fully synchronous: each step's decision depends on the
//! previous step's outcome, so the only blocking is the judge invocation and
//! file I/O.

pub mod driver;
pub mod fileops;
pub mod fingerprint;
pub mod judge;
pub mod plan;
pub mod shader_job;
pub mod simplify;

pub use driver::{ReductionDriver, ReductionError};
pub use shader_job::ShaderJob;
