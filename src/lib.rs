pub mod config;
pub mod engine;
pub mod error;
pub mod hot_reload;
pub mod resource;
pub mod settings;

pub use config::EngineConfig;
pub use engine::{AppContext, Application, Engine, EngineContext, EngineState, FrameReport};
pub use error::{EngineError, EngineResult};
pub use hot_reload::{
    FileWatcher, ModuleLoadError, ModuleLoader, NativePlatform, Platform, PreservedState, StatePreserver,
    WatchEvent, WatchEventType,
};
pub use resource::{
    FileResource, LoadContext, Resource, ResourceContent, ResourceError, ResourceId, ResourceKind,
    ResourceManager, TomlResource,
};
pub use settings::{Settings, SettingsVisitor};
