use std::any::Any;

use super::{LogKind, ResourceId, ResourceLogs};

/// Upcast helper so content can be downcast to its concrete kind
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Load/unload hooks of a resource kind
///
/// `do_load` runs once on the first outstanding load and `do_unload` once
/// when the last load is released. Failures are reported through the
/// [`LoadContext`], never by panicking.
pub trait ResourceContent: AsAny {
    fn do_load(&mut self, ctx: &mut LoadContext<'_>);

    fn do_unload(&mut self);

    /// Short name of the kind, used in diagnostics
    fn kind_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Resource kinds that can be created from a name by the registry
pub trait ResourceKind: ResourceContent + Sized {
    fn create(name: &str) -> Self;
}

/// Handle given to a load hook while the resource is loading
pub struct LoadContext<'a> {
    id: ResourceId,
    name: &'a str,
    logs: &'a mut ResourceLogs,
}

impl LoadContext<'_> {
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn log(&mut self, kind: LogKind, message: impl Into<String>) {
        let message = message.into();
        match kind {
            LogKind::Log => log::debug!("[{}] {}", self.name, message),
            LogKind::Warning => log::warn!("[{}] {}", self.name, message),
            LogKind::Error => log::error!("[{}] {}", self.name, message),
        }
        self.logs.push(kind, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogKind::Log, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.log(LogKind::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log(LogKind::Error, message);
    }
}

/// Named, reference-counted, lazily loaded unit of content
///
/// Two independent counters drive the lifecycle: the use count tracks how
/// many holders keep the resource registered, the load count tracks how many
/// of them need the content resident. A resource may only be dropped when
/// both are zero.
pub struct Resource {
    id: ResourceId,
    name: String,
    use_count: u32,
    load_count: u32,
    logs: ResourceLogs,
    content: Box<dyn ResourceContent>,
}

impl Resource {
    pub fn new(id: ResourceId, name: impl Into<String>, content: Box<dyn ResourceContent>) -> Self {
        Self {
            id,
            name: name.into(),
            use_count: 0,
            load_count: 0,
            logs: ResourceLogs::default(),
            content,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn use_count(&self) -> u32 {
        self.use_count
    }

    pub fn load_count(&self) -> u32 {
        self.load_count
    }

    /// Content is resident, whether or not the last load succeeded
    pub fn is_resident(&self) -> bool {
        self.load_count > 0
    }

    /// Content is resident and the last load reported no error
    pub fn is_loaded(&self) -> bool {
        self.load_count > 0 && self.logs.error_count() == 0
    }

    pub fn logs(&self) -> &ResourceLogs {
        &self.logs
    }

    pub fn kind_name(&self) -> &'static str {
        self.content.kind_name()
    }

    pub fn content(&self) -> &dyn ResourceContent {
        &*self.content
    }

    pub fn content_as<T: ResourceContent>(&self) -> Option<&T> {
        (*self.content).as_any().downcast_ref::<T>()
    }

    pub fn content_as_mut<T: ResourceContent>(&mut self) -> Option<&mut T> {
        (*self.content).as_any_mut().downcast_mut::<T>()
    }

    pub fn add_use(&mut self) {
        self.use_count += 1;
    }

    pub fn remove_use(&mut self) {
        assert!(
            self.use_count > 0,
            "unmatched remove_use on resource '{}'",
            self.name
        );
        self.use_count -= 1;
    }

    pub fn load(&mut self) {
        self.load_count += 1;
        if self.load_count == 1 {
            self.run_load();
        }
    }

    pub fn release(&mut self) {
        assert!(
            self.load_count > 0,
            "unmatched release on resource '{}'",
            self.name
        );
        self.load_count -= 1;
        if self.load_count == 0 {
            self.run_unload();
        }
    }

    pub fn use_load(&mut self) {
        self.add_use();
        self.load();
    }

    pub fn release_unuse(&mut self) {
        assert!(
            self.use_count > 0 && self.load_count > 0,
            "unmatched release_unuse on resource '{}'",
            self.name
        );
        self.release();
        self.remove_use();
    }

    /// Refresh content in place, leaving both counters untouched
    ///
    /// Returns false when nothing is resident, in which case the next load
    /// picks up the new content anyway.
    pub fn reload(&mut self) -> bool {
        if self.load_count == 0 {
            log::trace!("Skipping reload of '{}': not resident", self.name);
            return false;
        }

        self.run_unload();
        self.run_load();
        log::info!("Reloaded resource '{}'", self.name);
        true
    }

    /// Release every outstanding load, used when the registry sweeps a
    /// resource nobody uses any more
    pub(crate) fn force_release(&mut self) {
        if self.load_count > 0 {
            self.load_count = 0;
            self.run_unload();
        }
    }

    fn run_load(&mut self) {
        self.logs.clear();
        let mut ctx = LoadContext {
            id: self.id,
            name: &self.name,
            logs: &mut self.logs,
        };
        self.content.do_load(&mut ctx);

        if self.logs.error_count() > 0 {
            log::warn!(
                "Resource '{}' loaded with {} error(s), {} warning(s)",
                self.name,
                self.logs.error_count(),
                self.logs.warning_count()
            );
        }
    }

    fn run_unload(&mut self) {
        self.content.do_unload();
    }
}

impl Drop for Resource {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            debug_assert!(
                self.use_count == 0 && self.load_count == 0,
                "resource '{}' dropped while in use (use {}, load {})",
                self.name,
                self.use_count,
                self.load_count
            );
        }
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind_name())
            .field("use_count", &self.use_count)
            .field("load_count", &self.load_count)
            .field("errors", &self.logs.error_count())
            .finish()
    }
}
