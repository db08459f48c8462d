//! Shader-job materialization and the on-disk reduction trail.
//!
//! A shader job materializes as `<name>.json` (the uniform descriptor) plus
//! one companion file per shader source (`<name>.frag`, `<name>.vert`,
//! `<name>.comp`). Step artifacts are renamed in place to carry their outcome
//! tag, and sentinel files mark session-level outcomes, so the working
//! directory is a complete audit record of the reduction.


use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::fingerprint::{Fingerprint, FingerprintHasher};
use crate::shader_job::{ShaderJob, ShaderKind, ShaderSource, UniformsInfo};

/// Errors raised by shader-job file operations.
#[derive(Debug, Error)]
pub enum JobFileError {
    /// Underlying filesystem failure.
    #[error("io error on {path}: {source}")]
    Io {
        /// The file being read or written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The shader-job JSON could not be parsed or serialized.
    #[error("malformed shader job {path}: {source}")]
    Json {
        /// The JSON file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// A shader-job JSON file with no companion shader files.
    #[error("shader job {path} has no companion shader files")]
    NoShaders {
        /// The JSON file involved.
        path: PathBuf,
    },
}

fn io_err(path: &Path, source: io::Error) -> JobFileError {
    JobFileError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Path of the companion file for `kind` next to `json_path`.
#[must_use]
pub fn companion_path(json_path: &Path, kind: ShaderKind) -> PathBuf {
    json_path.with_extension(kind.extension())
}

/// Writes a shader job to `json_path` and its companion files.
///
/// The license header, if any, is emitted verbatim at the top of each shader
/// file. Companion files for kinds absent from the job are removed if they
/// exist, so a rewrite never leaves stale shaders behind.
///
/// # Errors
///
/// Returns an error if serialization or any file write fails.
pub fn write_shader_job(job: &ShaderJob, json_path: &Path) -> Result<(), JobFileError> {
    let uniforms = serde_json::to_string_pretty(job.uniforms()).map_err(|source| {
        JobFileError::Json {
            path: json_path.to_path_buf(),
            source,
        }
    })?;
    fs::write(json_path, uniforms).map_err(|e| io_err(json_path, e))?;

    for kind in ShaderKind::ALL {
        let path = companion_path(json_path, kind);
        match job.shaders().iter().find(|s| s.kind == kind) {
            Some(shader) => {
                let mut content = String::new();
                if let Some(license) = job.license() {
                    content.push_str(license);
                    if !license.ends_with('\n') {
                        content.push('\n');
                    }
                }
                content.push_str(&shader.source);
                fs::write(&path, content).map_err(|e| io_err(&path, e))?;
            },
            None => {
                if path.exists() {
                    fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
                }
            },
        }
    }
    Ok(())
}

/// Reads a shader job from `json_path` and its companion files.
///
/// The license is not separated back out of the shader sources; a job read
/// from disk carries no license of its own.
///
/// # Errors
///
/// Returns an error if the JSON is malformed, a read fails, or no companion
/// shader file exists.
pub fn read_shader_job(json_path: &Path) -> Result<ShaderJob, JobFileError> {
    let text = fs::read_to_string(json_path).map_err(|e| io_err(json_path, e))?;
    let uniforms: UniformsInfo =
        serde_json::from_str(&text).map_err(|source| JobFileError::Json {
            path: json_path.to_path_buf(),
            source,
        })?;

    let mut shaders = Vec::new();
    for kind in ShaderKind::ALL {
        let path = companion_path(json_path, kind);
        if path.exists() {
            let source = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
            shaders.push(ShaderSource { kind, source });
        }
    }
    if shaders.is_empty() {
        return Err(JobFileError::NoShaders {
            path: json_path.to_path_buf(),
        });
    }
    Ok(ShaderJob::new(None, uniforms, shaders))
}

/// Fingerprints a materialized shader job: the JSON bytes followed by each
/// existing companion file's bytes, in the fixed [`ShaderKind::ALL`] order.
///
/// # Errors
///
/// Returns an error if any of the files cannot be read.
pub fn shader_job_fingerprint(json_path: &Path) -> Result<Fingerprint, JobFileError> {
    let mut hasher = FingerprintHasher::new();
    hasher.update(&fs::read(json_path).map_err(|e| io_err(json_path, e))?);
    for kind in ShaderKind::ALL {
        let path = companion_path(json_path, kind);
        if path.exists() {
            hasher.update(&fs::read(&path).map_err(|e| io_err(&path, e))?);
        }
    }
    Ok(hasher.finalize())
}

/// Renames a materialized shader job, moving the JSON file and every existing
/// companion file together.
///
/// # Errors
///
/// Returns an error if any rename fails.
pub fn move_shader_job(from_json: &Path, to_json: &Path) -> Result<(), JobFileError> {
    fs::rename(from_json, to_json).map_err(|e| io_err(from_json, e))?;
    for kind in ShaderKind::ALL {
        let from = companion_path(from_json, kind);
        if from.exists() {
            let to = companion_path(to_json, kind);
            fs::rename(&from, &to).map_err(|e| io_err(&from, e))?;
        }
    }
    Ok(())
}

/// Creates an empty sentinel file named `name` in `work_dir`.
///
/// # Errors
///
/// Returns an error if the file cannot be created.
pub fn create_sentinel(work_dir: &Path, name: &str) -> Result<PathBuf, JobFileError> {
    let path = work_dir.join(name);
    fs::write(&path, b"").map_err(|e| io_err(&path, e))?;
    Ok(path)
}
