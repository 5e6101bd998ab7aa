//! Operating-system services used by the module loader
//!
//! The loader never touches the OS directly; it goes through [`Platform`],
//! which lets tests substitute a scripted implementation.

use std::ffi::c_void;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use libloading::Library;

/// Procedure exported by a module
///
/// Every entry point takes the opaque user-data pointer of the module.
pub type ModuleProc = unsafe extern "C" fn(user_data: *mut c_void);

/// Dynamic library and file services
pub trait Platform {
    /// OS handle of a loaded library
    type Library;

    fn load_dynamic_library(&mut self, path: &Path) -> Result<Self::Library, String>;

    /// Resolve an exported procedure; `None` when the symbol is absent
    fn procedure_address(&self, library: &Self::Library, name: &str) -> Option<ModuleProc>;

    fn unload_dynamic_library(&mut self, library: Self::Library);

    /// Last write time of `path`, comparable only to other values from
    /// this method and [`Platform::current_time`]
    fn file_last_write_time(&self, path: &Path) -> io::Result<u64>;

    /// Current time in the same units and epoch as
    /// [`Platform::file_last_write_time`]
    fn current_time(&self) -> u64;

    fn duplicate_file(&mut self, from: &Path, to: &Path) -> io::Result<()>;

    fn remove_file(&mut self, path: &Path) -> io::Result<()>;

    fn create_dir_all(&mut self, path: &Path) -> io::Result<()>;
}

/// Platform backed by `libloading` and the standard file system
///
/// Timestamps are milliseconds since the Unix epoch.
#[derive(Debug, Default)]
pub struct NativePlatform;

impl NativePlatform {
    pub fn new() -> Self {
        Self
    }
}

impl Platform for NativePlatform {
    type Library = Library;

    fn load_dynamic_library(&mut self, path: &Path) -> Result<Library, String> {
        // SAFETY: loading runs the library's initialisers; modules are
        // expected to be built for this host and free of load-time side
        // effects beyond their own statics.
        unsafe { Library::new(path) }.map_err(|e| e.to_string())
    }

    fn procedure_address(&self, library: &Library, name: &str) -> Option<ModuleProc> {
        let mut symbol = Vec::with_capacity(name.len() + 1);
        symbol.extend_from_slice(name.as_bytes());
        symbol.push(0);

        // SAFETY: the module ABI fixes the signature of every exported
        // entry point to `ModuleProc`. The raw pointer outlives the
        // `Symbol` guard but not the library, which the loader keeps alive
        // until after it has dropped the function table.
        unsafe { library.get::<ModuleProc>(&symbol).ok().map(|symbol| *symbol) }
    }

    fn unload_dynamic_library(&mut self, library: Library) {
        if let Err(e) = library.close() {
            log::warn!("Failed to unload library: {}", e);
        }
    }

    fn file_last_write_time(&self, path: &Path) -> io::Result<u64> {
        let modified = std::fs::metadata(path)?.modified()?;
        Ok(millis_since_epoch(modified))
    }

    fn current_time(&self) -> u64 {
        millis_since_epoch(SystemTime::now())
    }

    fn duplicate_file(&mut self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::copy(from, to).map(|_| ())
    }

    fn remove_file(&mut self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn create_dir_all(&mut self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }
}

fn millis_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_time_is_not_in_future() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lib.bin");
        std::fs::write(&path, b"\x7fELF").unwrap();

        let platform = NativePlatform::new();
        let written = platform.file_last_write_time(&path).unwrap();
        // allow for coarse file system clocks
        assert!(written <= platform.current_time() + 2_000);
    }

    #[test]
    fn test_duplicate_and_remove() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("original.so");
        let to = dir.path().join("copies").join("original_1.so");
        std::fs::write(&from, b"payload").unwrap();

        let mut platform = NativePlatform::new();
        platform.create_dir_all(to.parent().unwrap()).unwrap();
        platform.duplicate_file(&from, &to).unwrap();
        assert_eq!(std::fs::read(&to).unwrap(), b"payload");

        platform.remove_file(&to).unwrap();
        assert!(!to.exists());
    }

    #[test]
    fn test_loading_garbage_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("not_a_library.so");
        std::fs::write(&path, b"definitely not a shared object").unwrap();

        let mut platform = NativePlatform::new();
        assert!(platform.load_dynamic_library(&path).is_err());
    }

    #[test]
    fn test_missing_file_timestamp_errors() {
        let platform = NativePlatform::new();
        assert!(platform
            .file_last_write_time(Path::new("/no/such/module.so"))
            .is_err());
    }
}
