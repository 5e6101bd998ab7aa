//! Built-in file-backed resource kinds
//!
//! Both kinds treat their registered name as the path to read, so
//! `find_or_create_resource::<FileResource>("assets/logo.png")` just works.

use std::path::{Path, PathBuf};

use toml::Table;

use super::{LoadContext, ResourceContent, ResourceKind};

/// Raw bytes of a file
#[derive(Debug)]
pub struct FileResource {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl FileResource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            bytes: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Contents as UTF-8, if they are valid
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

impl ResourceContent for FileResource {
    fn do_load(&mut self, ctx: &mut LoadContext<'_>) {
        match std::fs::read(&self.path) {
            Ok(bytes) => {
                ctx.info(format!("read {} bytes from {}", bytes.len(), self.path.display()));
                self.bytes = bytes;
            }
            Err(e) => ctx.error(format!("failed to read {}: {}", self.path.display(), e)),
        }
    }

    fn do_unload(&mut self) {
        self.bytes = Vec::new();
    }

    fn kind_name(&self) -> &'static str {
        "file"
    }
}

impl ResourceKind for FileResource {
    fn create(name: &str) -> Self {
        Self::new(name)
    }
}

/// Parsed TOML document
#[derive(Debug)]
pub struct TomlResource {
    path: PathBuf,
    table: Option<Table>,
}

impl TomlResource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            table: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    /// Dotted key lookup, e.g. `"window.width"`
    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        let mut parts = key.split('.');
        let first = parts.next()?;
        let mut current = self.table.as_ref()?.get(first)?;
        for part in parts {
            current = current.as_table()?.get(part)?;
        }
        Some(current)
    }
}

impl ResourceContent for TomlResource {
    fn do_load(&mut self, ctx: &mut LoadContext<'_>) {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                ctx.error(format!("failed to read {}: {}", self.path.display(), e));
                return;
            }
        };

        match raw.parse::<Table>() {
            Ok(table) => {
                if table.is_empty() {
                    ctx.warning(format!("{} contains no keys", self.path.display()));
                }
                self.table = Some(table);
            }
            Err(e) => ctx.error(format!("failed to parse {}: {}", self.path.display(), e)),
        }
    }

    fn do_unload(&mut self) {
        self.table = None;
    }

    fn kind_name(&self) -> &'static str {
        "toml"
    }
}

impl ResourceKind for TomlResource {
    fn create(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Resource, ResourceId};
    use tempfile::TempDir;

    #[test]
    fn test_file_resource_reads_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("greeting.txt");
        std::fs::write(&path, "hello").unwrap();

        let mut resource = Resource::new(ResourceId(7), "greeting", Box::new(FileResource::new(&path)));
        resource.use_load();

        assert!(resource.is_loaded());
        assert_eq!(resource.content_as::<FileResource>().unwrap().text(), Some("hello"));

        resource.release_unuse();
        assert!(resource.content_as::<FileResource>().unwrap().bytes().is_empty());
    }

    #[test]
    fn test_missing_file_is_logged_not_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.bin");

        let mut resource = Resource::new(ResourceId(8), "absent", Box::new(FileResource::new(&path)));
        resource.use_load();

        assert!(resource.is_resident());
        assert!(!resource.is_loaded());
        assert_eq!(resource.logs().error_count(), 1);

        resource.release_unuse();
    }

    #[test]
    fn test_toml_resource_lookup_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tuning.toml");
        std::fs::write(&path, "[player]\nspeed = 4\n").unwrap();

        let mut resource = Resource::new(ResourceId(9), "tuning", Box::new(TomlResource::new(&path)));
        resource.use_load();
        let speed = resource.content_as::<TomlResource>().unwrap().get("player.speed").cloned();
        assert_eq!(speed, Some(toml::Value::Integer(4)));

        std::fs::write(&path, "[player]\nspeed = 9\n").unwrap();
        resource.reload();
        let speed = resource.content_as::<TomlResource>().unwrap().get("player.speed").cloned();
        assert_eq!(speed, Some(toml::Value::Integer(9)));

        resource.release_unuse();
    }

    #[test]
    fn test_toml_parse_error_and_empty_warning() {
        let dir = TempDir::new().unwrap();
        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "this is = = not toml").unwrap();
        let empty = dir.path().join("empty.toml");
        std::fs::write(&empty, "").unwrap();

        let mut broken = Resource::new(ResourceId(10), "broken", Box::new(TomlResource::new(&broken)));
        broken.load();
        assert_eq!(broken.logs().error_count(), 1);
        broken.release();

        let mut empty = Resource::new(ResourceId(11), "empty", Box::new(TomlResource::new(&empty)));
        empty.load();
        assert!(empty.is_loaded());
        assert_eq!(empty.logs().warning_count(), 1);
        empty.release();
    }
}
