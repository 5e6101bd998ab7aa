//! Engine-level error type
//!
//! Wraps the subsystem errors so callers of [`crate::Engine`] deal with a
//! single type.

use thiserror::Error;

use crate::hot_reload::{ModuleLoadError, StateError, WatchError};
use crate::resource::ResourceError;
use crate::settings::SettingsError;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Module(#[from] ModuleLoadError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("Engine is not running")]
    NotRunning,
}
