//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation of the resolved `ServerConfig`
//! - Check the served root exists and is a directory
//! - Check the entry document stays inside the root
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::path::{Component, Path, PathBuf};

use crate::config::schema::ServerConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("root directory does not exist: {}", .0.display())]
    RootMissing(PathBuf),

    #[error("root is not a directory: {}", .0.display())]
    RootNotDirectory(PathBuf),

    #[error("index file must be a relative path inside the root: {}", .0.display())]
    IndexOutsideRoot(PathBuf),

    #[error("invalid port {0:?}")]
    InvalidPort(String),

    #[error("hostname must not be empty")]
    EmptyHostname,
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.root.metadata() {
        Ok(meta) if !meta.is_dir() => {
            errors.push(ValidationError::RootNotDirectory(config.root.clone()));
        }
        Ok(_) => {}
        Err(_) => errors.push(ValidationError::RootMissing(config.root.clone())),
    }

    if !is_contained(&config.index_file) {
        errors.push(ValidationError::IndexOutsideRoot(config.index_file.clone()));
    }

    if config.hostname.trim().is_empty() {
        errors.push(ValidationError::EmptyHostname);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// True when `path` is relative and never climbs above its base.
fn is_contained(path: &Path) -> bool {
    let mut saw_normal = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => saw_normal = true,
            Component::CurDir => {}
            _ => return false,
        }
    }
    saw_normal
}
