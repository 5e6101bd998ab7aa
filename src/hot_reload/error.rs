//! Hot reload error types
//!
//! Module loading reports structured errors instead of aborting, so the
//! engine can keep running with the module unloaded and retry on the next
//! rebuild.

use std::path::PathBuf;
use thiserror::Error;

/// File watcher errors
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Failed to create file watcher: {0}")]
    Create(#[source] notify::Error),

    #[error("Failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("Invalid watch path: {0}")]
    InvalidPath(String),

    #[error("Failed to start watch delivery thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Module hot-reload errors
#[derive(Debug, Error)]
pub enum ModuleLoadError {
    #[error("Module '{0}' is already loaded")]
    AlreadyLoaded(String),

    #[error("Module '{0}' is not loaded")]
    NotLoaded(String),

    #[error("Invalid module path: {0}")]
    InvalidPath(PathBuf),

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read write time of {path}: {source}")]
    Timestamp {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load library {path}: {reason}")]
    LibraryLoad { path: PathBuf, reason: String },

    #[error("Module '{module}' does not export '{symbol}'")]
    MissingSymbol { module: String, symbol: &'static str },
}

/// Result type for module operations
pub type ModuleResult<T> = Result<T, ModuleLoadError>;
