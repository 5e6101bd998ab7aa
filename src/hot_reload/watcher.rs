use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::WatchError;

/// Type of file change event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventType {
    Added,
    Removed,
    Modified,
    RenamedOld,
    RenamedNew,
}

/// File watch event
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub event_type: WatchEventType,
    pub timestamp: Instant,
}

/// Convert a notify event into zero or more watch events
pub fn classify(event: Event, now: Instant) -> Vec<WatchEvent> {
    let make = |path: PathBuf, event_type: WatchEventType| WatchEvent {
        path,
        event_type,
        timestamp: now,
    };

    match event.kind {
        EventKind::Create(_) => event
            .paths
            .into_iter()
            .map(|path| make(path, WatchEventType::Added))
            .collect(),
        EventKind::Remove(_) => event
            .paths
            .into_iter()
            .map(|path| make(path, WatchEventType::Removed))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => event
            .paths
            .into_iter()
            .map(|path| make(path, WatchEventType::RenamedOld))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event
            .paths
            .into_iter()
            .map(|path| make(path, WatchEventType::RenamedNew))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            // paths are [from, to]
            let mut paths = event.paths.into_iter();
            let mut events = Vec::with_capacity(2);
            if let Some(from) = paths.next() {
                events.push(make(from, WatchEventType::RenamedOld));
            }
            if let Some(to) = paths.next() {
                events.push(make(to, WatchEventType::RenamedNew));
            }
            events
        }
        EventKind::Modify(_) => event
            .paths
            .into_iter()
            .map(|path| make(path, WatchEventType::Modified))
            .collect(),
        _ => Vec::new(),
    }
}

/// Trailing-edge debounce keyed by (path, kind)
///
/// An event is held until its key has been quiet for the window; repeats
/// inside the window replace the held event and push its deadline back. The
/// last event of a burst is therefore always delivered, and delivered keys
/// are forgotten.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: HashMap<(PathBuf, WatchEventType), (WatchEvent, Instant)>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    /// Hold `event` until its key has been quiet for the window
    pub fn push(&mut self, event: WatchEvent) {
        let key = (event.path.clone(), event.event_type);
        let deadline = event.timestamp + self.window;
        self.pending.insert(key, (event, deadline));
    }

    /// Remove and return every held event whose deadline is at or before `now`
    pub fn take_ready(&mut self, now: Instant) -> Vec<WatchEvent> {
        let mut ready = Vec::new();
        self.pending.retain(|_, (event, deadline)| {
            if *deadline <= now {
                ready.push(event.clone());
                false
            } else {
                true
            }
        });
        ready.sort_by_key(|event| event.timestamp);
        ready
    }

    /// Earliest deadline among held events
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|(_, deadline)| *deadline).min()
    }

    /// Remove and return every held event regardless of deadline
    pub fn flush(&mut self) -> Vec<WatchEvent> {
        let mut all: Vec<WatchEvent> = self.pending.drain().map(|(_, (event, _))| event).collect();
        all.sort_by_key(|event| event.timestamp);
        all
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// File watcher with debouncing
///
/// The notify backend thread only classifies events and hands them to a
/// delivery thread, which applies the debounce and runs the callback. The
/// callback never runs on the thread that created the watcher. Keep it short
/// and thread-safe; flagging work for the main thread is the intended use.
pub struct FileWatcher {
    /// Notify watcher instance
    watcher: RecommendedWatcher,

    /// Events are dropped while set
    paused: Arc<AtomicBool>,

    /// Active watch paths
    watched_paths: Vec<PathBuf>,
}

impl FileWatcher {
    /// Create new file watcher delivering events to `callback`
    pub fn new<F>(debounce: Duration, callback: F) -> Result<Self, WatchError>
    where
        F: Fn(&WatchEvent) + Send + 'static,
    {
        let paused = Arc::new(AtomicBool::new(false));
        let (tx, rx) = crossbeam_channel::unbounded::<WatchEvent>();

        // exits once the notify watcher, and with it `tx`, is dropped
        std::thread::Builder::new()
            .name("file-watch-delivery".to_string())
            .spawn(move || deliver_events(rx, debounce, callback))
            .map_err(WatchError::Spawn)?;

        let paused_flag = paused.clone();
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    log::warn!("File watcher error: {}", e);
                    return;
                }
            };

            if paused_flag.load(Ordering::Acquire) {
                return;
            }

            for watch_event in classify(event, Instant::now()) {
                if tx.send(watch_event).is_err() {
                    return;
                }
            }
        })
        .map_err(WatchError::Create)?;

        Ok(Self {
            watcher,
            paused,
            watched_paths: Vec::new(),
        })
    }

    pub fn watch_path(&mut self, path: impl AsRef<Path>, recursive: bool) -> Result<(), WatchError> {
        let path = path.as_ref().to_path_buf();
        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        self.watcher
            .watch(&path, mode)
            .map_err(|source| WatchError::Watch {
                path: path.clone(),
                source,
            })?;
        log::debug!("Watching {} ({:?})", path.display(), mode);
        self.watched_paths.push(path);
        Ok(())
    }

    /// Stop watching a path
    pub fn unwatch(&mut self, path: impl AsRef<Path>) -> Result<(), WatchError> {
        let path = path.as_ref();
        self.watched_paths.retain(|p| p != path);
        self.watcher
            .unwatch(path)
            .map_err(|source| WatchError::Watch {
                path: path.to_path_buf(),
                source,
            })?;
        log::debug!("Stopped watching {}", path.display());
        Ok(())
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Get watched paths
    pub fn watched_paths(&self) -> &[PathBuf] {
        &self.watched_paths
    }
}

fn deliver_events<F>(rx: Receiver<WatchEvent>, debounce: Duration, callback: F)
where
    F: Fn(&WatchEvent),
{
    let mut debouncer = Debouncer::new(debounce);
    loop {
        let received = match debouncer.next_deadline() {
            Some(deadline) => rx.recv_deadline(deadline),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(event) => debouncer.push(event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                for event in debouncer.flush() {
                    callback(&event);
                }
                return;
            }
        }

        for event in debouncer.take_ready(Instant::now()) {
            callback(&event);
        }
    }
}
