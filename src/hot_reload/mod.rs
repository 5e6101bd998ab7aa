/// Hot-Reload System
/// 
/// Enables live updates of code and content without restarting the engine.
/// Designed for rapid iteration during development.
/// 
/// Key features:
/// - File watching with debouncing, callbacks on the watcher thread
/// - Module hot-reload that never loads the build output in place
/// - Settle delay so a half-written library is never picked up
/// - Plain-data state preservation across a module swap

pub mod error;
pub mod watcher;
pub mod platform;
pub mod module_loader;
pub mod state_preserve;

pub use error::{ModuleLoadError, ModuleResult, WatchError};
pub use watcher::{Debouncer, FileWatcher, WatchEvent, WatchEventType};
pub use platform::{ModuleProc, NativePlatform, Platform};
pub use module_loader::{
    Module, ModuleApi, ModuleLoader, ModuleState, SYMBOL_INIT, SYMBOL_ON_LIBRARY_LOADED,
    SYMBOL_ON_LIBRARY_UNLOADED, SYMBOL_SHUTDOWN, SYMBOL_UPDATE,
};
pub use state_preserve::{PreservedState, StateError, StatePreserver, StateSnapshot};
