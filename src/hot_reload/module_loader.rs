//! Module hot-reload loader
//!
//! A module is a dynamic library exporting a fixed set of entry points. The
//! build system writes the library to its output path; the loader never
//! opens that file. Each load copies it to a fresh runtime path and loads
//! the copy, so the linker can overwrite the original while the process
//! still maps the previous copy.
//!
//! States: `Unloaded -> Loaded -> Unloading -> Loaded (new copy)`, or
//! `Loaded -> Unloaded` at shutdown.

use std::ffi::c_void;
use std::fmt;
use std::path::{Path, PathBuf};

use super::platform::{ModuleProc, Platform};
use super::{ModuleLoadError, ModuleResult};
use crate::config::EngineConfig;

/// Exported entry point names
pub const SYMBOL_INIT: &str = "module_init";
pub const SYMBOL_UPDATE: &str = "module_update";
pub const SYMBOL_SHUTDOWN: &str = "module_shutdown";
pub const SYMBOL_ON_LIBRARY_LOADED: &str = "on_library_loaded";
pub const SYMBOL_ON_LIBRARY_UNLOADED: &str = "on_library_unloaded";

/// Resolved entry points of a loaded module
///
/// Either every entry point resolves or the load fails; there is no
/// partially bound table.
#[derive(Clone, Copy)]
pub struct ModuleApi {
    pub init: ModuleProc,
    pub update: ModuleProc,
    pub shutdown: ModuleProc,
    pub on_library_loaded: ModuleProc,
    pub on_library_unloaded: ModuleProc,
}

impl ModuleApi {
    pub fn resolve<P: Platform>(platform: &P, library: &P::Library, module: &str) -> ModuleResult<Self> {
        let lookup = |symbol: &'static str| {
            platform
                .procedure_address(library, symbol)
                .ok_or_else(|| ModuleLoadError::MissingSymbol {
                    module: module.to_string(),
                    symbol,
                })
        };

        Ok(Self {
            init: lookup(SYMBOL_INIT)?,
            update: lookup(SYMBOL_UPDATE)?,
            shutdown: lookup(SYMBOL_SHUTDOWN)?,
            on_library_loaded: lookup(SYMBOL_ON_LIBRARY_LOADED)?,
            on_library_unloaded: lookup(SYMBOL_ON_LIBRARY_UNLOADED)?,
        })
    }
}

impl fmt::Debug for ModuleApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleApi").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Unloaded,
    Loaded,
    Unloading,
}

/// One dynamically loaded code unit
///
/// Built once and repopulated in place on every reload.
pub struct Module<L> {
    name: String,
    library: Option<L>,
    api: Option<ModuleApi>,
    loaded_path: Option<PathBuf>,
    last_write_time: u64,
    user_data: *mut c_void,
    state: ModuleState,
}

impl<L> Module<L> {
    fn new(name: String) -> Self {
        Self {
            name,
            library: None,
            api: None,
            loaded_path: None,
            last_write_time: 0,
            user_data: std::ptr::null_mut(),
            state: ModuleState::Unloaded,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ModuleState {
        self.state
    }

    pub fn api(&self) -> Option<&ModuleApi> {
        self.api.as_ref()
    }

    /// Runtime copy currently mapped
    pub fn loaded_path(&self) -> Option<&Path> {
        self.loaded_path.as_deref()
    }

    /// Write time of the build output when it was last loaded
    pub fn last_write_time(&self) -> u64 {
        self.last_write_time
    }

    pub fn user_data(&self) -> *mut c_void {
        self.user_data
    }
}

impl<L> fmt::Debug for Module<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("loaded_path", &self.loaded_path)
            .field("last_write_time", &self.last_write_time)
            .finish()
    }
}

/// Load/unload/poll state machine around one [`Module`]
pub struct ModuleLoader<P: Platform> {
    platform: P,
    module: Module<P::Library>,
    source_path: PathBuf,
    runtime_dir: PathBuf,
    settle_delay: u64,
    load_counter: u64,
    reload_count: u64,
}

impl<P: Platform> ModuleLoader<P> {
    pub fn new(config: &EngineConfig, platform: P) -> Self {
        Self::with_paths(
            config.module_path(),
            config.runtime_dir(),
            config.settle_delay_ms,
            platform,
        )
    }

    pub fn with_paths(
        source_path: impl Into<PathBuf>,
        runtime_dir: impl Into<PathBuf>,
        settle_delay: u64,
        platform: P,
    ) -> Self {
        let source_path = source_path.into();
        let name = source_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            platform,
            module: Module::new(name),
            source_path,
            runtime_dir: runtime_dir.into(),
            settle_delay,
            load_counter: 0,
            reload_count: 0,
        }
    }

    pub fn module(&self) -> &Module<P::Library> {
        &self.module
    }

    pub fn state(&self) -> ModuleState {
        self.module.state
    }

    pub fn is_loaded(&self) -> bool {
        self.module.library.is_some()
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Completed hot reloads since construction
    pub fn reload_count(&self) -> u64 {
        self.reload_count
    }

    /// Opaque pointer passed to every module entry point
    pub fn set_user_data(&mut self, user_data: *mut c_void) {
        self.module.user_data = user_data;
    }

    fn runtime_path(&self) -> ModuleResult<PathBuf> {
        let stem = self
            .source_path
            .file_stem()
            .ok_or_else(|| ModuleLoadError::InvalidPath(self.source_path.clone()))?
            .to_string_lossy();
        let file_name = match self.source_path.extension() {
            Some(ext) => format!("{}_{}.{}", stem, self.load_counter, ext.to_string_lossy()),
            None => format!("{}_{}", stem, self.load_counter),
        };
        Ok(self.runtime_dir.join(file_name))
    }

    /// Copy the build output to a fresh runtime path, load the copy and bind
    /// its entry points
    pub fn load_game_api(&mut self) -> ModuleResult<()> {
        if self.module.library.is_some() {
            return Err(ModuleLoadError::AlreadyLoaded(self.module.name.clone()));
        }

        let write_time = self
            .platform
            .file_last_write_time(&self.source_path)
            .map_err(|source| ModuleLoadError::Timestamp {
                path: self.source_path.clone(),
                source,
            })?;
        // a failed attempt still consumes this write so the next poll waits
        // for a new build instead of retrying the same broken one
        self.module.last_write_time = write_time;

        self.load_counter += 1;
        let runtime_path = self.runtime_path()?;

        self.platform
            .create_dir_all(&self.runtime_dir)
            .and_then(|()| self.platform.duplicate_file(&self.source_path, &runtime_path))
            .map_err(|source| ModuleLoadError::Copy {
                from: self.source_path.clone(),
                to: runtime_path.clone(),
                source,
            })?;

        let library = match self.platform.load_dynamic_library(&runtime_path) {
            Ok(library) => library,
            Err(reason) => {
                self.discard_copy(&runtime_path);
                return Err(ModuleLoadError::LibraryLoad {
                    path: runtime_path,
                    reason,
                });
            }
        };

        let api = match ModuleApi::resolve(&self.platform, &library, &self.module.name) {
            Ok(api) => api,
            Err(e) => {
                self.platform.unload_dynamic_library(library);
                self.discard_copy(&runtime_path);
                return Err(e);
            }
        };

        self.module.library = Some(library);
        self.module.api = Some(api);
        self.module.loaded_path = Some(runtime_path);
        self.module.state = ModuleState::Loaded;

        // SAFETY: the library backing `api` is held in `self.module` and
        // stays mapped until `unload_game_api` clears the table.
        unsafe { (api.on_library_loaded)(self.module.user_data) };

        log::info!(
            "Loaded module '{}' from {}",
            self.module.name,
            self.module.loaded_path().map(|p| p.display().to_string()).unwrap_or_default()
        );
        Ok(())
    }

    /// Let the module externalise its state, then unmap it
    pub fn unload_game_api(&mut self) -> ModuleResult<()> {
        let Some(library) = self.module.library.take() else {
            return Err(ModuleLoadError::NotLoaded(self.module.name.clone()));
        };

        self.module.state = ModuleState::Unloading;
        if let Some(api) = self.module.api.take() {
            // SAFETY: `library` is still mapped at this point.
            unsafe { (api.on_library_unloaded)(self.module.user_data) };
        }
        self.platform.unload_dynamic_library(library);

        if let Some(path) = self.module.loaded_path.take() {
            self.discard_copy(&path);
        }
        self.module.state = ModuleState::Unloaded;

        log::info!("Unloaded module '{}'", self.module.name);
        Ok(())
    }

    /// True when the build output changed and has been quiet for at least
    /// the settle delay
    pub fn poll_change(&self) -> bool {
        let write_time = match self.platform.file_last_write_time(&self.source_path) {
            Ok(time) => time,
            Err(e) => {
                // the linker may have deleted the file mid-build
                log::trace!("Module {} not readable yet: {}", self.source_path.display(), e);
                return false;
            }
        };

        if write_time == self.module.last_write_time {
            return false;
        }

        let age = self.platform.current_time().saturating_sub(write_time);
        if age < self.settle_delay {
            log::trace!(
                "Module '{}' changed {}ms ago, waiting for {}ms settle delay",
                self.module.name,
                age,
                self.settle_delay
            );
            return false;
        }

        true
    }

    /// Unload (if loaded) and load the current build output
    pub fn reload(&mut self) -> ModuleResult<()> {
        if self.module.library.is_some() {
            self.unload_game_api()?;
        }
        self.load_game_api()?;
        self.reload_count += 1;
        log::info!("Hot reloaded module '{}' (#{})", self.module.name, self.reload_count);
        Ok(())
    }

    /// Poll once and reload if the build output settled on a new version
    ///
    /// Returns whether a reload happened.
    pub fn watch_game_api(&mut self) -> ModuleResult<bool> {
        if !self.poll_change() {
            return Ok(false);
        }
        self.reload()?;
        Ok(true)
    }

    pub fn call_init(&self) -> ModuleResult<()> {
        self.call(|api| api.init)
    }

    pub fn call_update(&self) -> ModuleResult<()> {
        self.call(|api| api.update)
    }

    pub fn call_shutdown(&self) -> ModuleResult<()> {
        self.call(|api| api.shutdown)
    }

    fn call(&self, select: impl Fn(&ModuleApi) -> ModuleProc) -> ModuleResult<()> {
        let api = self
            .module
            .api
            .as_ref()
            .ok_or_else(|| ModuleLoadError::NotLoaded(self.module.name.clone()))?;
        let proc_ = select(api);
        // SAFETY: a bound table implies the library is mapped.
        unsafe { proc_(self.module.user_data) };
        Ok(())
    }

    fn discard_copy(&mut self, path: &Path) {
        if let Err(e) = self.platform.remove_file(path) {
            log::debug!("Could not remove runtime copy {}: {}", path.display(), e);
        }
    }
}

impl<P: Platform> Drop for ModuleLoader<P> {
    fn drop(&mut self) {
        if self.module.library.is_some() {
            if let Err(e) = self.unload_game_api() {
                log::warn!("Failed to unload module on drop: {}", e);
            }
        }
    }
}
