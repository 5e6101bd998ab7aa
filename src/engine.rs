//! Engine orchestration
//!
//! Drives one frame at a time on the main thread: apply queued resource
//! reloads, swap the module if its build output settled on a new version,
//! then update applications and the module.
//!
//! A module swap runs as: pause watchers, `before_reload` on every
//! application, unload, load, `after_reload`, resume watchers. While it runs
//! [`EngineContext::is_ready`] reports false.

use std::ffi::c_void;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::hot_reload::{ModuleLoadError, ModuleLoader, ModuleResult, Platform, StatePreserver};
use crate::resource::ResourceManager;

/// Lifecycle state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Created,
    Running,
    Reloading,
    ShutDown,
}

/// Explicitly passed engine context
#[derive(Debug)]
pub struct EngineContext {
    config: EngineConfig,
    state: EngineState,
    frame: u64,
}

impl EngineContext {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: EngineState::Created,
            frame: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// False before startup, after shutdown and during a module swap
    pub fn is_ready(&self) -> bool {
        self.state == EngineState::Running
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

/// What an application sees from its hooks
pub struct AppContext<'a> {
    pub engine: &'a EngineContext,
    pub resources: &'a mut ResourceManager,
    pub preserved: &'a mut StatePreserver,
}

/// Host-side consumer of engine frames
///
/// `before_reload` must move anything that depends on module code (function
/// pointers, trait objects created by the module, cached type ids) into
/// plain data; `after_reload` rebuilds it from that data.
pub trait Application {
    fn name(&self) -> &str;

    fn start(&mut self, _ctx: &mut AppContext<'_>) {}

    fn update(&mut self, _ctx: &mut AppContext<'_>) {}

    fn before_reload(&mut self, _ctx: &mut AppContext<'_>) {}

    fn after_reload(&mut self, _ctx: &mut AppContext<'_>) {}

    fn shutdown(&mut self, _ctx: &mut AppContext<'_>) {}
}

/// Outcome of one frame
#[derive(Debug, Default)]
pub struct FrameReport {
    pub frame: u64,
    pub resources_reloaded: usize,
    pub module_reloaded: bool,

    /// Set when this frame's module swap failed; the rest of the frame
    /// still ran, without the module
    pub module_error: Option<ModuleLoadError>,
}

/// Top-level driver owning the resource registry and the module loader
pub struct Engine<P: Platform> {
    context: EngineContext,
    resources: ResourceManager,
    module: ModuleLoader<P>,
    applications: Vec<Box<dyn Application>>,
    preserved: StatePreserver,
}

impl<P: Platform> Engine<P> {
    pub fn new(config: EngineConfig, platform: P) -> Self {
        let context = EngineContext::new(config);
        let resources = ResourceManager::new(context.config());
        let module = ModuleLoader::new(context.config(), platform);

        Self {
            context,
            resources,
            module,
            applications: Vec::new(),
            preserved: StatePreserver::default(),
        }
    }

    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceManager {
        &mut self.resources
    }

    pub fn module(&self) -> &ModuleLoader<P> {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut ModuleLoader<P> {
        &mut self.module
    }

    pub fn preserved(&self) -> &StatePreserver {
        &self.preserved
    }

    /// Opaque pointer handed to every module entry point, kept across swaps
    ///
    /// The pointee must stay valid for as long as the module may be called.
    pub fn set_module_user_data(&mut self, user_data: *mut c_void) {
        self.module.set_user_data(user_data);
    }

    pub fn add_application(&mut self, application: Box<dyn Application>) {
        log::info!("Added application '{}'", application.name());
        self.applications.push(application);
    }

    /// Load the module, call its init and start every application
    pub fn startup(&mut self) -> EngineResult<()> {
        self.module.load_game_api()?;
        self.module.call_init()?;
        self.context.state = EngineState::Running;

        for app in &mut self.applications {
            let mut ctx = AppContext {
                engine: &self.context,
                resources: &mut self.resources,
                preserved: &mut self.preserved,
            };
            app.start(&mut ctx);
        }

        log::info!("Engine started with module '{}'", self.module.module().name());
        Ok(())
    }

    /// Run one frame
    ///
    /// A failed module swap does not cut the frame short: it is reported in
    /// [`FrameReport::module_error`] and the engine keeps running without the
    /// module until the next build settles.
    pub fn update(&mut self) -> EngineResult<FrameReport> {
        if self.context.state != EngineState::Running {
            return Err(EngineError::NotRunning);
        }

        self.context.frame += 1;
        let mut report = FrameReport {
            frame: self.context.frame,
            ..Default::default()
        };

        report.resources_reloaded = self.resources.reload_changed_resources().len();

        if self.module.poll_change() {
            match self.swap_module() {
                Ok(()) => report.module_reloaded = true,
                Err(e) => report.module_error = Some(e),
            }
        }

        for app in &mut self.applications {
            let mut ctx = AppContext {
                engine: &self.context,
                resources: &mut self.resources,
                preserved: &mut self.preserved,
            };
            app.update(&mut ctx);
        }

        if self.module.is_loaded() {
            self.module.call_update()?;
        }

        Ok(report)
    }

    /// Swap the module now, regardless of its timestamp
    pub fn reload_module(&mut self) -> EngineResult<()> {
        Ok(self.swap_module()?)
    }

    fn swap_module(&mut self) -> ModuleResult<()> {
        self.before_reload();
        let result = self.module.reload();
        self.after_reload();

        if let Err(e) = &result {
            log::error!("Module reload failed, continuing without it: {}", e);
        }
        result
    }

    fn before_reload(&mut self) {
        self.context.state = EngineState::Reloading;
        self.resources.pause_watchers();

        for app in &mut self.applications {
            let mut ctx = AppContext {
                engine: &self.context,
                resources: &mut self.resources,
                preserved: &mut self.preserved,
            };
            app.before_reload(&mut ctx);
        }
    }

    fn after_reload(&mut self) {
        for app in &mut self.applications {
            let mut ctx = AppContext {
                engine: &self.context,
                resources: &mut self.resources,
                preserved: &mut self.preserved,
            };
            app.after_reload(&mut ctx);
        }

        self.resources.resume_watchers();
        self.context.state = EngineState::Running;
    }

    /// Shut applications and the module down, then release every resource
    pub fn shutdown(&mut self) -> EngineResult<()> {
        if self.context.state == EngineState::ShutDown {
            return Ok(());
        }

        for app in &mut self.applications {
            let mut ctx = AppContext {
                engine: &self.context,
                resources: &mut self.resources,
                preserved: &mut self.preserved,
            };
            app.shutdown(&mut ctx);
        }

        if self.module.is_loaded() {
            self.module.call_shutdown()?;
            self.module.unload_game_api()?;
        }

        self.resources.stop_all_watches();
        let flushed = self.resources.flush_resources();
        self.context.state = EngineState::ShutDown;

        log::info!(
            "Engine shut down after {} frame(s), {} resource(s) flushed",
            self.context.frame,
            flushed
        );
        Ok(())
    }
}
