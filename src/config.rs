//! Engine configuration
//!
//! Loaded from a TOML file through the [`Settings`] visitor. Every key is
//! optional; anything missing keeps its default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::settings::{self, Settings, SettingsError, SettingsVisitor};

/// Default settle delay before a rebuilt module is reloaded
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 500;

/// Default per-path debounce window for file watch events
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Default capacity of the watcher-to-main-thread reload channel
pub const DEFAULT_RELOAD_QUEUE_CAPACITY: u64 = 1024;

/// Default number of attempts when drawing a fresh resource id
pub const DEFAULT_ID_RETRY_LIMIT: u64 = 8;

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Library produced by the build system (never loaded directly)
    pub module_path: String,

    /// Directory holding the runtime copies of the module
    pub runtime_dir: String,

    /// Minimum age of a module write before it is reloaded
    pub settle_delay_ms: u64,

    /// Debounce time in milliseconds
    pub debounce_ms: u64,

    /// Bounded capacity of the reload channel
    pub reload_queue_capacity: u64,

    /// Attempts allowed when an id collides with a registered resource
    pub id_retry_limit: u64,

    /// Start file watches for resources registered with a source path
    pub watch_resources: bool,

    /// Target frame interval for the host loop
    pub frame_interval_ms: u64,

    /// Stop the host loop after this many frames (0 runs forever)
    pub max_frames: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            module_path: String::new(),
            runtime_dir: std::env::temp_dir()
                .join("reload_engine_modules")
                .display()
                .to_string(),
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            reload_queue_capacity: DEFAULT_RELOAD_QUEUE_CAPACITY,
            id_retry_limit: DEFAULT_ID_RETRY_LIMIT,
            watch_resources: true,
            frame_interval_ms: 16,
            max_frames: 0,
        }
    }
}

impl Settings for EngineConfig {
    fn visit_fields(&mut self, visitor: &mut dyn SettingsVisitor) {
        visitor.visit_string("module_path", &mut self.module_path);
        visitor.visit_string("runtime_dir", &mut self.runtime_dir);
        visitor.visit_u64("settle_delay_ms", &mut self.settle_delay_ms);
        visitor.visit_u64("debounce_ms", &mut self.debounce_ms);
        visitor.visit_u64("reload_queue_capacity", &mut self.reload_queue_capacity);
        visitor.visit_u64("id_retry_limit", &mut self.id_retry_limit);
        visitor.visit_bool("watch_resources", &mut self.watch_resources);
        visitor.visit_u64("frame_interval_ms", &mut self.frame_interval_ms);
        visitor.visit_u64("max_frames", &mut self.max_frames);
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file on top of the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let mut config = Self::default();
        let mismatched = settings::load_file(path.as_ref(), &mut config)?;
        if !mismatched.is_empty() {
            log::warn!(
                "Config {} has {} ignored key(s): {}",
                path.as_ref().display(),
                mismatched.len(),
                mismatched.join(", ")
            );
        }
        Ok(config)
    }

    /// Write configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let mut copy = self.clone();
        settings::save_file(path, &mut copy)
    }

    pub fn module_path(&self) -> PathBuf {
        PathBuf::from(&self.module_path)
    }

    pub fn runtime_dir(&self) -> PathBuf {
        PathBuf::from(&self.runtime_dir)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn reload_queue_capacity(&self) -> usize {
        usize::try_from(self.reload_queue_capacity).unwrap_or(usize::MAX).max(1)
    }

    pub fn id_retry_limit(&self) -> u32 {
        u32::try_from(self.id_retry_limit).unwrap_or(u32::MAX).max(1)
    }
}
