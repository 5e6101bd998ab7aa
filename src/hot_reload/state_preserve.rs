use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use thiserror::Error;
use toml::{Table, Value};

use crate::settings::{Settings, TableReader, TableWriter};

/// State that must outlive a module swap
///
/// Anything derived from code in the module (closures, vtables, type ids)
/// is gone after the swap. Implementors describe the plain data needed to
/// rebuild it through [`Settings`].
pub trait PreservedState: Settings {
    /// Get state identifier
    fn state_id(&self) -> &str;

    /// Get state version (for compatibility checking)
    fn version(&self) -> u32 {
        1
    }
}

/// State snapshot
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    /// State identifier
    pub id: String,

    /// Captured fields
    pub data: Table,

    /// State version
    pub version: u32,

    /// Capture time
    pub taken_at: Instant,
}

/// State preservation manager
pub struct StatePreserver {
    /// Latest snapshot per id
    snapshots: HashMap<String, StateSnapshot>,

    /// Snapshot history
    history: Vec<StateSnapshot>,

    /// Maximum history size
    max_history: usize,
}

impl StatePreserver {
    /// Create new state preserver
    pub fn new(max_history: usize) -> Self {
        Self {
            snapshots: HashMap::new(),
            history: Vec::new(),
            max_history,
        }
    }

    /// Capture `state` into plain data
    pub fn preserve(&mut self, state: &mut dyn PreservedState) {
        let mut writer = TableWriter::new();
        state.visit_fields(&mut writer);

        let snapshot = StateSnapshot {
            id: state.state_id().to_string(),
            data: writer.into_table(),
            version: state.version(),
            taken_at: Instant::now(),
        };
        log::debug!("Preserved state '{}' v{}", snapshot.id, snapshot.version);

        self.history.push(snapshot.clone());
        if self.history.len() > self.max_history {
            let excess = self.history.len() - self.max_history;
            self.history.drain(0..excess);
        }
        self.snapshots.insert(snapshot.id.clone(), snapshot);
    }

    /// Copy the latest snapshot back into `state`
    ///
    /// Returns false when there is no snapshot or its version differs.
    pub fn restore(&self, state: &mut dyn PreservedState) -> bool {
        let Some(snapshot) = self.snapshots.get(state.state_id()) else {
            return false;
        };

        if snapshot.version != state.version() {
            log::warn!(
                "State version mismatch for {}: snapshot v{}, current v{}",
                snapshot.id,
                snapshot.version,
                state.version()
            );
            return false;
        }

        let mut reader = TableReader::new(&snapshot.data);
        state.visit_fields(&mut reader);
        log::info!("Restored state: {}", snapshot.id);
        true
    }

    pub fn snapshot(&self, id: &str) -> Option<&StateSnapshot> {
        self.snapshots.get(id)
    }

    pub fn history(&self) -> &[StateSnapshot] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Clear all snapshots
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.history.clear();
    }

    /// Save snapshots to disk
    pub fn save_to_disk(&self, path: impl AsRef<Path>) -> Result<(), StateError> {
        let mut root = Table::new();
        for snapshot in self.snapshots.values() {
            let mut entry = Table::new();
            entry.insert("version".to_string(), Value::Integer(i64::from(snapshot.version)));
            entry.insert("data".to_string(), Value::Table(snapshot.data.clone()));
            root.insert(snapshot.id.clone(), Value::Table(entry));
        }

        std::fs::write(path, toml::to_string(&root)?)?;
        Ok(())
    }

    /// Load snapshots from disk, replacing the current ones
    pub fn load_from_disk(&mut self, path: impl AsRef<Path>) -> Result<usize, StateError> {
        let raw = std::fs::read_to_string(path)?;
        let root = raw.parse::<Table>()?;

        self.snapshots.clear();
        for (id, entry) in root {
            let Value::Table(mut entry) = entry else {
                return Err(StateError::Malformed(id));
            };
            let version = match entry.get("version") {
                Some(Value::Integer(v)) => u32::try_from(*v).map_err(|_| StateError::Malformed(id.clone()))?,
                _ => return Err(StateError::Malformed(id)),
            };
            let data = match entry.remove("data") {
                Some(Value::Table(data)) => data,
                _ => return Err(StateError::Malformed(id)),
            };

            self.snapshots.insert(
                id.clone(),
                StateSnapshot {
                    id,
                    data,
                    version,
                    taken_at: Instant::now(),
                },
            );
        }

        Ok(self.snapshots.len())
    }
}

impl Default for StatePreserver {
    fn default() -> Self {
        Self::new(32)
    }
}

/// State error types
#[derive(Debug, Error)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] toml::de::Error),

    #[error("Malformed snapshot entry: {0}")]
    Malformed(String),
}
