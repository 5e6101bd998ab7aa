//! Scripted platform shared by the engine tests

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::c_void;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use reload_engine::hot_reload::{
    ModuleProc, Platform, SYMBOL_INIT, SYMBOL_ON_LIBRARY_LOADED, SYMBOL_ON_LIBRARY_UNLOADED,
    SYMBOL_SHUTDOWN, SYMBOL_UPDATE,
};
use reload_engine::EngineConfig;

pub const SOURCE: &str = "/build/out/libgame.so";
pub const SETTLE_MS: u64 = 500;

thread_local! {
    static CALLS: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
    static LAST_USER_DATA: Cell<usize> = const { Cell::new(0) };
}

fn record(name: &'static str, user_data: *mut c_void) {
    CALLS.with(|calls| calls.borrow_mut().push(name));
    LAST_USER_DATA.with(|last| last.set(user_data as usize));
}

/// Module entry points called on this thread since the last call
pub fn take_calls() -> Vec<&'static str> {
    CALLS.with(|calls| std::mem::take(&mut *calls.borrow_mut()))
}

/// User-data pointer received by the most recent entry point call
pub fn last_user_data() -> usize {
    LAST_USER_DATA.with(Cell::get)
}

unsafe extern "C" fn module_init(user_data: *mut c_void) {
    record("init", user_data);
}

unsafe extern "C" fn module_update(user_data: *mut c_void) {
    record("update", user_data);
}

unsafe extern "C" fn module_shutdown(user_data: *mut c_void) {
    record("shutdown", user_data);
}

unsafe extern "C" fn on_library_loaded(user_data: *mut c_void) {
    record("loaded", user_data);
}

unsafe extern "C" fn on_library_unloaded(user_data: *mut c_void) {
    record("unloaded", user_data);
}

#[derive(Default)]
pub struct FakeState {
    pub now: u64,
    pub write_times: HashMap<PathBuf, u64>,
    pub loaded: Vec<PathBuf>,
    pub unloads: usize,
    pub fail_load: bool,
}

#[derive(Clone, Default)]
pub struct FakePlatform {
    pub state: Rc<RefCell<FakeState>>,
}

pub struct FakeLibrary;

impl FakePlatform {
    /// Simulate the build system writing the module at `time`
    pub fn write_module(&self, time: u64) {
        self.state
            .borrow_mut()
            .write_times
            .insert(PathBuf::from(SOURCE), time);
    }

    pub fn set_now(&self, now: u64) {
        self.state.borrow_mut().now = now;
    }

    pub fn set_fail_load(&self, fail: bool) {
        self.state.borrow_mut().fail_load = fail;
    }

    pub fn loaded_paths(&self) -> Vec<PathBuf> {
        self.state.borrow().loaded.clone()
    }
}

impl Platform for FakePlatform {
    type Library = FakeLibrary;

    fn load_dynamic_library(&mut self, path: &Path) -> Result<FakeLibrary, String> {
        let mut state = self.state.borrow_mut();
        if state.fail_load {
            return Err("truncated image".to_string());
        }
        state.loaded.push(path.to_path_buf());
        Ok(FakeLibrary)
    }

    fn procedure_address(&self, _library: &FakeLibrary, name: &str) -> Option<ModuleProc> {
        let proc_: ModuleProc = match name {
            SYMBOL_INIT => module_init,
            SYMBOL_UPDATE => module_update,
            SYMBOL_SHUTDOWN => module_shutdown,
            SYMBOL_ON_LIBRARY_LOADED => on_library_loaded,
            SYMBOL_ON_LIBRARY_UNLOADED => on_library_unloaded,
            _ => return None,
        };
        Some(proc_)
    }

    fn unload_dynamic_library(&mut self, _library: FakeLibrary) {
        self.state.borrow_mut().unloads += 1;
    }

    fn file_last_write_time(&self, path: &Path) -> io::Result<u64> {
        self.state
            .borrow()
            .write_times
            .get(path)
            .copied()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    fn current_time(&self) -> u64 {
        self.state.borrow().now
    }

    fn duplicate_file(&mut self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        let time = state
            .write_times
            .get(from)
            .copied()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))?;
        state.write_times.insert(to.to_path_buf(), time);
        Ok(())
    }

    fn remove_file(&mut self, path: &Path) -> io::Result<()> {
        self.state.borrow_mut().write_times.remove(path);
        Ok(())
    }

    fn create_dir_all(&mut self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        module_path: SOURCE.to_string(),
        runtime_dir: "/run/modules".to_string(),
        settle_delay_ms: SETTLE_MS,
        watch_resources: false,
        ..Default::default()
    }
}

/// Platform with a module built at t=1000 and the clock at t=5000
pub fn platform() -> FakePlatform {
    let platform = FakePlatform::default();
    platform.write_module(1_000);
    platform.set_now(5_000);
    take_calls();
    platform
}
