use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use super::{
    ReloadQueue, ReloadSender, Resource, ResourceContent, ResourceError, ResourceId,
    ResourceIdGenerator, ResourceKind, ResourceResult,
};
use crate::config::EngineConfig;
use crate::hot_reload::{FileWatcher, WatchError, WatchEvent, WatchEventType};

/// Watched file -> resources flagged when it is modified
type WatchTargets = Arc<Mutex<FxHashMap<PathBuf, Vec<ResourceId>>>>;

/// File watch driving reloads of one resource
struct ResourceWatch {
    /// Path as given by the caller
    path: PathBuf,

    /// Key in the target map
    target: PathBuf,

    /// Directory actually watched
    directory: PathBuf,
}

/// Registry of every resource, plus the dependency graph used for
/// cascading reloads
///
/// All methods run on the main thread. The one exception is the
/// [`ReloadSender`] handed out by [`ResourceManager::reload_sender`], which
/// watcher threads use to flag changed resources.
pub struct ResourceManager {
    /// Owned resources
    resources: FxHashMap<ResourceId, Resource>,

    /// Registration order
    order: Vec<ResourceId>,

    /// Name index
    by_name: FxHashMap<String, ResourceId>,

    /// dependency -> dependents
    dependents: FxHashMap<ResourceId, Vec<ResourceId>>,

    /// Pending reloads
    queue: ReloadQueue,

    /// Id source for registrations without a preset id
    ids: ResourceIdGenerator,

    /// Active file watches
    watches: FxHashMap<ResourceId, ResourceWatch>,

    /// Single watcher shared by every resource watch, created on first use
    watcher: Option<FileWatcher>,

    /// Read by the watcher callback to map changed files to resources
    watch_targets: WatchTargets,

    /// Watched directory -> number of resource watches inside it
    watched_dirs: FxHashMap<PathBuf, usize>,

    /// Debounce applied to file watches
    debounce: Duration,

    /// Whether file watches are actually started
    watch_enabled: bool,

    /// Watches are paused (e.g. during a module swap)
    watches_paused: bool,
}

impl ResourceManager {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            resources: FxHashMap::default(),
            order: Vec::new(),
            by_name: FxHashMap::default(),
            dependents: FxHashMap::default(),
            queue: ReloadQueue::new(config.reload_queue_capacity()),
            ids: ResourceIdGenerator::new(config.id_retry_limit()),
            watches: FxHashMap::default(),
            watcher: None,
            watch_targets: WatchTargets::default(),
            watched_dirs: FxHashMap::default(),
            debounce: config.debounce(),
            watch_enabled: config.watch_resources,
            watches_paused: false,
        }
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Ids in registration order
    pub fn ids(&self) -> &[ResourceId] {
        &self.order
    }

    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(&id)
    }

    pub fn get_mut(&mut self, id: ResourceId) -> Option<&mut Resource> {
        self.resources.get_mut(&id)
    }

    pub fn find_resource(&self, name: &str) -> Option<ResourceId> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, id: ResourceId) -> bool {
        self.resources.contains_key(&id)
    }

    pub fn content<T: ResourceContent>(&self, id: ResourceId) -> Option<&T> {
        self.resources.get(&id)?.content_as::<T>()
    }

    pub fn content_mut<T: ResourceContent>(&mut self, id: ResourceId) -> Option<&mut T> {
        self.resources.get_mut(&id)?.content_as_mut::<T>()
    }

    /// Register a resource under `name`
    ///
    /// When `id` is `None` a fresh id is drawn from the generator.
    pub fn register_resource(
        &mut self,
        name: &str,
        content: Box<dyn ResourceContent>,
        id: Option<ResourceId>,
    ) -> ResourceResult<ResourceId> {
        if self.by_name.contains_key(name) {
            return Err(ResourceError::DuplicateName(name.to_string()));
        }

        let id = match id {
            Some(id) if !id.is_valid() || self.resources.contains_key(&id) => {
                return Err(ResourceError::DuplicateId(id));
            }
            Some(id) => id,
            None => {
                let resources = &self.resources;
                self.ids.next(name, |candidate| resources.contains_key(&candidate))?
            }
        };

        let resource = Resource::new(id, name, content);
        log::debug!("Registered {} resource '{}' as {}", resource.kind_name(), name, id);

        self.resources.insert(id, resource);
        self.by_name.insert(name.to_string(), id);
        self.order.push(id);
        Ok(id)
    }

    /// Remove a resource from the registry and hand it back to the caller
    ///
    /// Its dependency edges and file watch go with it.
    pub fn unregister_resource(&mut self, id: ResourceId) -> ResourceResult<Resource> {
        let resource = self.resources.remove(&id).ok_or(ResourceError::NotFound(id))?;

        self.by_name.remove(resource.name());
        self.order.retain(|other| *other != id);
        self.dependents.remove(&id);
        for list in self.dependents.values_mut() {
            list.retain(|other| *other != id);
        }
        self.dependents.retain(|_, list| !list.is_empty());
        self.stop_reload_on_file_changed(id);

        log::debug!("Unregistered resource '{}' ({})", resource.name(), id);
        Ok(resource)
    }

    /// Look up `name`, creating and registering a `T` if it does not exist
    pub fn find_or_create_resource<T: ResourceKind>(&mut self, name: &str) -> ResourceResult<ResourceId> {
        if let Some(id) = self.find_resource(name) {
            let resource = &self.resources[&id];
            if resource.content_as::<T>().is_none() {
                return Err(ResourceError::TypeMismatch {
                    name: name.to_string(),
                    expected: std::any::type_name::<T>(),
                    found: resource.kind_name(),
                });
            }
            return Ok(id);
        }

        self.register_resource(name, Box::new(T::create(name)), None)
    }

    pub fn rename_resource(&mut self, id: ResourceId, new_name: &str) -> ResourceResult<()> {
        if let Some(existing) = self.by_name.get(new_name) {
            if *existing == id {
                return Ok(());
            }
            return Err(ResourceError::DuplicateName(new_name.to_string()));
        }

        let resource = self.resources.get_mut(&id).ok_or(ResourceError::NotFound(id))?;
        let old_name = resource.name().to_string();
        resource.set_name(new_name.to_string());

        self.by_name.remove(&old_name);
        self.by_name.insert(new_name.to_string(), id);
        log::debug!("Renamed resource '{}' to '{}'", old_name, new_name);
        Ok(())
    }

    pub fn use_load(&mut self, id: ResourceId) -> ResourceResult<()> {
        self.resources
            .get_mut(&id)
            .ok_or(ResourceError::NotFound(id))?
            .use_load();
        Ok(())
    }

    pub fn release_unuse(&mut self, id: ResourceId) -> ResourceResult<()> {
        self.resources
            .get_mut(&id)
            .ok_or(ResourceError::NotFound(id))?
            .release_unuse();
        Ok(())
    }

    /// Destroy every resource nobody uses
    ///
    /// Candidates are collected first and destroyed afterwards. A candidate
    /// that still has outstanding loads is force-released before it goes.
    pub fn flush_resources(&mut self) -> usize {
        let unused: Vec<ResourceId> = self
            .order
            .iter()
            .copied()
            .filter(|id| self.resources.get(id).is_some_and(|r| r.use_count() == 0))
            .collect();

        for id in &unused {
            if let Ok(mut resource) = self.unregister_resource(*id) {
                if resource.load_count() > 0 {
                    log::warn!(
                        "Flushing resource '{}' with {} outstanding load(s)",
                        resource.name(),
                        resource.load_count()
                    );
                    resource.force_release();
                }
            }
        }

        if !unused.is_empty() {
            log::info!("Flushed {} unused resource(s)", unused.len());
        }
        unused.len()
    }

    /// Record that `dependent` must reload whenever `dependency` does
    pub fn add_dependency(&mut self, dependency: ResourceId, dependent: ResourceId) -> ResourceResult<()> {
        for id in [dependency, dependent] {
            if !self.resources.contains_key(&id) {
                return Err(ResourceError::NotFound(id));
            }
        }

        let list = self.dependents.entry(dependency).or_default();
        if !list.contains(&dependent) {
            list.push(dependent);
        }
        Ok(())
    }

    pub fn remove_dependency(&mut self, dependency: ResourceId, dependent: ResourceId) -> bool {
        let Some(list) = self.dependents.get_mut(&dependency) else {
            return false;
        };

        let before = list.len();
        list.retain(|other| *other != dependent);
        let removed = list.len() != before;
        if list.is_empty() {
            self.dependents.remove(&dependency);
        }
        removed
    }

    pub fn dependents_of(&self, dependency: ResourceId) -> &[ResourceId] {
        self.dependents
            .get(&dependency)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Handle for flagging resources from other threads
    pub fn reload_sender(&self) -> ReloadSender {
        self.queue.sender()
    }

    pub fn flag_resource_for_reload(&self, id: ResourceId) {
        self.queue.flag(id);
    }

    pub fn has_pending_reloads(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Reload every flagged resource and everything that depends on it
    ///
    /// Returns the ids whose reload ran, each at most once per pass.
    pub fn reload_changed_resources(&mut self) -> Vec<ResourceId> {
        let flagged = self.queue.drain();
        if flagged.is_empty() {
            return Vec::new();
        }

        let closure = self.reload_closure(&flagged);
        let mut reloaded = Vec::with_capacity(closure.len());
        for id in closure {
            if let Some(resource) = self.resources.get_mut(&id) {
                resource.reload();
                reloaded.push(id);
            }
        }

        log::info!(
            "Reload pass: {} flagged, {} reloaded",
            flagged.len(),
            reloaded.len()
        );
        reloaded
    }

    /// Breadth-first expansion of `seeds` over the dependents graph
    ///
    /// Membership is checked before anything is enqueued, so cycles end the
    /// walk instead of looping.
    pub fn reload_closure(&self, seeds: &[ResourceId]) -> Vec<ResourceId> {
        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::new();
        let mut closure = Vec::new();

        for id in seeds {
            if self.resources.contains_key(id) && visited.insert(*id) {
                queue.push_back(*id);
            }
        }

        while let Some(id) = queue.pop_front() {
            closure.push(id);
            for dependent in self.dependents_of(id) {
                if self.resources.contains_key(dependent) && visited.insert(*dependent) {
                    queue.push_back(*dependent);
                }
            }
        }

        closure
    }

    /// Flag `id` for reload whenever the file at `path` is modified
    ///
    /// The watch is placed on the parent directory so editors that replace
    /// files on save are still seen. All resources share one watcher and each
    /// directory is watched once, however many files in it are watched.
    pub fn start_reload_on_file_changed(&mut self, id: ResourceId, path: impl AsRef<Path>) -> ResourceResult<()> {
        if !self.resources.contains_key(&id) {
            return Err(ResourceError::NotFound(id));
        }

        let path = path.as_ref().to_path_buf();
        if !self.watch_enabled {
            log::debug!("File watches disabled, not watching {}", path.display());
            return Ok(());
        }

        let (directory, target) = watch_location(&path).ok_or_else(|| ResourceError::Watch {
            id,
            source: WatchError::InvalidPath(path.display().to_string()),
        })?;

        self.stop_reload_on_file_changed(id);

        if self.watcher.is_none() {
            let watcher = self.create_watcher().map_err(|source| ResourceError::Watch { id, source })?;
            self.watcher = Some(watcher);
        }
        if !self.watched_dirs.contains_key(&directory) {
            if let Some(watcher) = self.watcher.as_mut() {
                watcher
                    .watch_path(&directory, false)
                    .map_err(|source| ResourceError::Watch { id, source })?;
            }
        }
        *self.watched_dirs.entry(directory.clone()).or_insert(0) += 1;

        self.watch_targets
            .lock()
            .entry(target.clone())
            .or_default()
            .push(id);

        log::info!("Watching {} for resource {}", path.display(), id);
        self.watches.insert(
            id,
            ResourceWatch {
                path,
                target,
                directory,
            },
        );
        Ok(())
    }

    fn create_watcher(&self) -> Result<FileWatcher, WatchError> {
        let targets = self.watch_targets.clone();
        let sender = self.queue.sender();

        let watcher = FileWatcher::new(self.debounce, move |event: &WatchEvent| {
            if event.event_type != WatchEventType::Modified {
                return;
            }

            let targets = targets.lock();
            let ids = targets.get(&event.path).or_else(|| {
                // backends may report a different spelling of the directory
                let canonical = event
                    .path
                    .parent()
                    .and_then(|dir| std::fs::canonicalize(dir).ok())
                    .zip(event.path.file_name())
                    .map(|(dir, name)| dir.join(name))?;
                targets.get(&canonical)
            });

            for id in ids.into_iter().flatten() {
                sender.flag(*id);
            }
        })?;

        if self.watches_paused {
            watcher.pause();
        }
        Ok(watcher)
    }

    pub fn stop_reload_on_file_changed(&mut self, id: ResourceId) -> bool {
        let Some(watch) = self.watches.remove(&id) else {
            return false;
        };

        {
            let mut targets = self.watch_targets.lock();
            if let Some(ids) = targets.get_mut(&watch.target) {
                ids.retain(|other| *other != id);
                if ids.is_empty() {
                    targets.remove(&watch.target);
                }
            }
        }

        let remaining = match self.watched_dirs.get_mut(&watch.directory) {
            Some(count) => {
                *count -= 1;
                *count
            }
            None => 0,
        };
        if remaining == 0 {
            self.watched_dirs.remove(&watch.directory);
            if let Some(watcher) = self.watcher.as_mut() {
                if let Err(e) = watcher.unwatch(&watch.directory) {
                    log::warn!("Failed to unwatch {}: {}", watch.directory.display(), e);
                }
            }
        }

        log::info!("Stopped watching {} for resource {}", watch.path.display(), id);
        true
    }

    pub fn watched_path(&self, id: ResourceId) -> Option<&Path> {
        self.watches.get(&id).map(|watch| watch.path.as_path())
    }

    pub fn watch_count(&self) -> usize {
        self.watches.len()
    }

    /// Directories currently registered with the shared watcher
    pub fn watched_directory_count(&self) -> usize {
        self.watched_dirs.len()
    }

    pub fn stop_all_watches(&mut self) {
        let count = self.watches.len();
        self.watches.clear();
        self.watch_targets.lock().clear();
        self.watched_dirs.clear();
        // dropping the watcher also ends its delivery thread
        self.watcher = None;
        if count > 0 {
            log::info!("Stopped {} resource watch(es)", count);
        }
    }

    /// Suspend every file watch; changes made meanwhile are not reported
    pub fn pause_watchers(&mut self) {
        self.watches_paused = true;
        if let Some(watcher) = &self.watcher {
            watcher.pause();
        }
    }

    pub fn resume_watchers(&mut self) {
        self.watches_paused = false;
        if let Some(watcher) = &self.watcher {
            watcher.resume();
        }
    }

    pub fn watchers_paused(&self) -> bool {
        self.watches_paused
    }
}

/// Directory to watch and target-map key for a watched file
fn watch_location(path: &Path) -> Option<(PathBuf, PathBuf)> {
    let file_name = path.file_name()?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let directory = std::fs::canonicalize(&directory).unwrap_or(directory);
    let target = directory.join(file_name);
    Some((directory, target))
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        self.stop_all_watches();
        // release whatever holders forgot so the resources drop cleanly
        for resource in self.resources.values_mut() {
            if resource.use_count() > 0 || resource.load_count() > 0 {
                log::warn!(
                    "Resource '{}' still held at shutdown (use {}, load {})",
                    resource.name(),
                    resource.use_count(),
                    resource.load_count()
                );
                resource.force_release();
                while resource.use_count() > 0 {
                    resource.remove_use();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::LoadContext;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct Counted {
        reloads: Arc<AtomicU32>,
        loaded: bool,
    }

    impl ResourceContent for Counted {
        fn do_load(&mut self, _ctx: &mut LoadContext<'_>) {
            if self.loaded {
                return;
            }
            self.loaded = true;
            self.reloads.fetch_add(1, Ordering::SeqCst);
        }

        fn do_unload(&mut self) {
            self.loaded = false;
        }
    }

    impl ResourceKind for Counted {
        fn create(_name: &str) -> Self {
            Self {
                reloads: Arc::new(AtomicU32::new(0)),
                loaded: false,
            }
        }
    }

    fn manager() -> ResourceManager {
        ResourceManager::new(&EngineConfig {
            watch_resources: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_register_find_unregister() {
        let mut manager = manager();
        let id = manager
            .register_resource("atlas", Box::new(Counted::create("atlas")), None)
            .unwrap();

        assert_eq!(manager.find_resource("atlas"), Some(id));
        assert_eq!(manager.get(id).unwrap().name(), "atlas");

        let resource = manager.unregister_resource(id).unwrap();
        assert_eq!(resource.id(), id);
        assert_eq!(manager.find_resource("atlas"), None);
        assert!(manager.get(id).is_none());
        assert!(manager.ids().is_empty());
    }

    #[test]
    fn test_duplicate_name_and_id_rejected() {
        let mut manager = manager();
        let id = manager
            .register_resource("a", Box::new(Counted::create("a")), Some(ResourceId(42)))
            .unwrap();
        assert_eq!(id, ResourceId(42));

        assert!(matches!(
            manager.register_resource("a", Box::new(Counted::create("a")), None),
            Err(ResourceError::DuplicateName(_))
        ));
        assert!(matches!(
            manager.register_resource("b", Box::new(Counted::create("b")), Some(ResourceId(42))),
            Err(ResourceError::DuplicateId(_))
        ));
        assert!(matches!(
            manager.register_resource("c", Box::new(Counted::create("c")), Some(ResourceId::INVALID)),
            Err(ResourceError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_find_or_create_reuses_and_checks_kind() {
        let mut manager = manager();
        let first = manager.find_or_create_resource::<Counted>("mesh").unwrap();
        let second = manager.find_or_create_resource::<Counted>("mesh").unwrap();
        assert_eq!(first, second);
        assert_eq!(manager.len(), 1);

        let mismatch = manager.find_or_create_resource::<crate::resource::FileResource>("mesh");
        assert!(matches!(mismatch, Err(ResourceError::TypeMismatch { .. })));
    }

    #[test]
    fn test_rename_keeps_id() {
        let mut manager = manager();
        let id = manager.find_or_create_resource::<Counted>("old").unwrap();
        manager.find_or_create_resource::<Counted>("taken").unwrap();

        manager.rename_resource(id, "new").unwrap();
        assert_eq!(manager.find_resource("new"), Some(id));
        assert_eq!(manager.find_resource("old"), None);
        assert!(matches!(
            manager.rename_resource(id, "taken"),
            Err(ResourceError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_flush_only_removes_unused() {
        let mut manager = manager();
        let kept = manager.find_or_create_resource::<Counted>("kept").unwrap();
        let dropped = manager.find_or_create_resource::<Counted>("dropped").unwrap();
        let loaded_only = manager.find_or_create_resource::<Counted>("loaded_only").unwrap();

        manager.use_load(kept).unwrap();
        manager.get_mut(loaded_only).unwrap().load();

        assert_eq!(manager.flush_resources(), 2);
        assert!(manager.contains(kept));
        assert!(!manager.contains(dropped));
        assert!(!manager.contains(loaded_only));

        manager.release_unuse(kept).unwrap();
        assert_eq!(manager.flush_resources(), 1);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_dependency_edges() {
        let mut manager = manager();
        let a = manager.find_or_create_resource::<Counted>("a").unwrap();
        let b = manager.find_or_create_resource::<Counted>("b").unwrap();

        manager.add_dependency(a, b).unwrap();
        manager.add_dependency(a, b).unwrap();
        assert_eq!(manager.dependents_of(a), &[b]);

        assert!(manager.remove_dependency(a, b));
        assert!(!manager.remove_dependency(a, b));
        assert!(manager.dependents_of(a).is_empty());

        assert!(matches!(
            manager.add_dependency(a, ResourceId(999)),
            Err(ResourceError::NotFound(_))
        ));
    }

    #[test]
    fn test_closure_handles_cycles() {
        let mut manager = manager();
        let a = manager.find_or_create_resource::<Counted>("a").unwrap();
        let b = manager.find_or_create_resource::<Counted>("b").unwrap();
        let c = manager.find_or_create_resource::<Counted>("c").unwrap();
        let lone = manager.find_or_create_resource::<Counted>("lone").unwrap();

        manager.add_dependency(a, b).unwrap();
        manager.add_dependency(b, c).unwrap();
        manager.add_dependency(c, a).unwrap();

        let closure = manager.reload_closure(&[b]);
        assert_eq!(closure, vec![b, c, a]);
        assert!(!closure.contains(&lone));
    }

    #[test]
    fn test_unregister_drops_edges() {
        let mut manager = manager();
        let a = manager.find_or_create_resource::<Counted>("a").unwrap();
        let b = manager.find_or_create_resource::<Counted>("b").unwrap();
        manager.add_dependency(a, b).unwrap();

        manager.unregister_resource(b).unwrap();
        assert!(manager.dependents_of(a).is_empty());
        assert_eq!(manager.reload_closure(&[a]), vec![a]);
    }

    #[test]
    fn test_reload_pass_cascades_once() {
        let mut manager = manager();
        let a = manager.find_or_create_resource::<Counted>("a").unwrap();
        let b = manager.find_or_create_resource::<Counted>("b").unwrap();
        manager.use_load(a).unwrap();
        manager.use_load(b).unwrap();
        manager.add_dependency(a, b).unwrap();

        manager.flag_resource_for_reload(a);
        manager.flag_resource_for_reload(a);
        let reloaded = manager.reload_changed_resources();

        assert_eq!(reloaded, vec![a, b]);
        for id in [a, b] {
            let counted = manager.content::<Counted>(id).unwrap();
            assert_eq!(counted.reloads.load(Ordering::SeqCst), 2);
        }
        assert!(manager.reload_changed_resources().is_empty());

        manager.release_unuse(a).unwrap();
        manager.release_unuse(b).unwrap();
    }

    #[test]
    fn test_flag_of_unregistered_id_is_ignored() {
        let mut manager = manager();
        manager.flag_resource_for_reload(ResourceId(12345));
        assert!(manager.reload_changed_resources().is_empty());
    }

    #[test]
    fn test_watch_disabled_is_noop() {
        let mut manager = manager();
        let id = manager.find_or_create_resource::<Counted>("cfg").unwrap();
        manager.start_reload_on_file_changed(id, "cfg.toml").unwrap();
        assert!(manager.watched_path(id).is_none());
        assert!(!manager.stop_reload_on_file_changed(id));
    }

    #[test]
    fn test_directory_watched_once_per_file_set() {
        let dir = tempfile::TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();

        let mut manager = ResourceManager::new(&EngineConfig::default());
        let a = manager.find_or_create_resource::<Counted>("a").unwrap();
        let b = manager.find_or_create_resource::<Counted>("b").unwrap();
        let c = manager.find_or_create_resource::<Counted>("c").unwrap();

        manager.start_reload_on_file_changed(a, dir.path().join("a.toml")).unwrap();
        manager.start_reload_on_file_changed(b, dir.path().join("b.toml")).unwrap();
        manager.start_reload_on_file_changed(c, sub.join("c.toml")).unwrap();
        assert_eq!(manager.watch_count(), 3);
        assert_eq!(manager.watched_directory_count(), 2);

        // re-pointing a watch does not leak its old directory
        manager.start_reload_on_file_changed(c, dir.path().join("c.toml")).unwrap();
        assert_eq!(manager.watch_count(), 3);
        assert_eq!(manager.watched_directory_count(), 1);
        assert_eq!(manager.watcher.as_ref().unwrap().watched_paths().len(), 1);

        assert!(manager.stop_reload_on_file_changed(a));
        assert_eq!(manager.watched_directory_count(), 1);
        assert!(manager.stop_reload_on_file_changed(b));
        assert!(manager.stop_reload_on_file_changed(c));
        assert_eq!(manager.watched_directory_count(), 0);
        assert_eq!(manager.watch_count(), 0);
        assert!(manager.watcher.as_ref().unwrap().watched_paths().is_empty());
    }

    #[test]
    fn test_watch_location_uses_parent_directory() {
        let (directory, target) = watch_location(Path::new("settings.toml")).unwrap();
        assert_eq!(target, directory.join("settings.toml"));
        assert!(watch_location(Path::new("/")).is_none());
    }
}
