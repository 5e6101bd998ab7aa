use thiserror::Error;

use super::ResourceId;
use crate::hot_reload::WatchError;

/// Result type for resource registry operations
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Resource registry error types
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Resource name already registered: {0}")]
    DuplicateName(String),

    #[error("Resource id already registered: {0}")]
    DuplicateId(ResourceId),

    #[error("Resource not found: {0}")]
    NotFound(ResourceId),

    #[error("Resource '{name}' is a {found}, not a {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("No free resource id for '{name}' after {attempts} attempts")]
    IdSpaceExhausted { name: String, attempts: u32 },

    #[error("Cannot watch resource {id}: {source}")]
    Watch {
        id: ResourceId,
        #[source]
        source: WatchError,
    },
}
