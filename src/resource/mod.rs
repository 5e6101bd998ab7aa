/// Resource Lifecycle
///
/// Named, reference-counted, lazily loaded content with dependency-aware
/// reloading. Content changes are detected by file watchers on arbitrary
/// threads, queued, and applied on the main thread once per frame.
///
/// Key pieces:
/// - `Resource`: use/load counters around a content hook
/// - `ResourceManager`: registry, dependency graph, reload passes
/// - `ReloadQueue`: bounded cross-thread channel of changed ids

pub mod error;
pub mod id;
pub mod kinds;
pub mod logs;
pub mod manager;
pub mod reload_queue;
#[allow(clippy::module_inception)]
pub mod resource;

pub use error::{ResourceError, ResourceResult};
pub use id::{ResourceId, ResourceIdGenerator};
pub use kinds::{FileResource, TomlResource};
pub use logs::{LogEntry, LogKind, ResourceLogs};
pub use manager::ResourceManager;
pub use reload_queue::{ReloadQueue, ReloadSender};
pub use resource::{AsAny, LoadContext, Resource, ResourceContent, ResourceKind};
