//! Explicit per-type serialization
//!
//! Types that need to be persisted (engine configuration, application state
//! that must survive a module swap) describe their fields by walking a
//! [`SettingsVisitor`]. The same description drives both directions: the
//! [`TableWriter`] collects values into a TOML table and the [`TableReader`]
//! copies values from a table back into the fields.

use std::path::Path;
use thiserror::Error;
use toml::{Table, Value};

/// Settings error types
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// A type that can describe its persisted fields
pub trait Settings {
    fn visit_fields(&mut self, visitor: &mut dyn SettingsVisitor);
}

/// Receives every persisted field of a [`Settings`] type
pub trait SettingsVisitor {
    fn visit_bool(&mut self, name: &str, value: &mut bool);
    fn visit_i64(&mut self, name: &str, value: &mut i64);
    fn visit_u64(&mut self, name: &str, value: &mut u64);
    fn visit_f64(&mut self, name: &str, value: &mut f64);
    fn visit_string(&mut self, name: &str, value: &mut String);
    fn visit_section(&mut self, name: &str, section: &mut dyn Settings);
}

/// Collects field values into a TOML table
#[derive(Debug, Default)]
pub struct TableWriter {
    table: Table,
    /// Keys whose unsigned value did not fit a TOML integer
    clamped: Vec<String>,
}

impl TableWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clamped(&self) -> &[String] {
        &self.clamped
    }

    pub fn into_table(self) -> Table {
        self.table
    }
}

impl SettingsVisitor for TableWriter {
    fn visit_bool(&mut self, name: &str, value: &mut bool) {
        self.table.insert(name.to_string(), Value::Boolean(*value));
    }

    fn visit_i64(&mut self, name: &str, value: &mut i64) {
        self.table.insert(name.to_string(), Value::Integer(*value));
    }

    fn visit_u64(&mut self, name: &str, value: &mut u64) {
        // TOML integers are signed; saturate rather than wrap
        let stored = i64::try_from(*value).unwrap_or_else(|_| {
            log::warn!(
                "Setting '{}' = {} exceeds the TOML integer range, stored as {}",
                name,
                value,
                i64::MAX
            );
            self.clamped.push(name.to_string());
            i64::MAX
        });
        self.table.insert(name.to_string(), Value::Integer(stored));
    }

    fn visit_f64(&mut self, name: &str, value: &mut f64) {
        self.table.insert(name.to_string(), Value::Float(*value));
    }

    fn visit_string(&mut self, name: &str, value: &mut String) {
        self.table.insert(name.to_string(), Value::String(value.clone()));
    }

    fn visit_section(&mut self, name: &str, section: &mut dyn Settings) {
        let mut nested = TableWriter::new();
        section.visit_fields(&mut nested);
        self.clamped
            .extend(nested.clamped.drain(..).map(|key| format!("{}.{}", name, key)));
        self.table.insert(name.to_string(), Value::Table(nested.into_table()));
    }
}

/// Copies values from a TOML table into fields
///
/// Missing keys leave the field untouched. Keys with the wrong type are
/// recorded in [`TableReader::mismatched`] and also left untouched.
pub struct TableReader<'a> {
    table: &'a Table,
    prefix: String,
    mismatched: Vec<String>,
}

impl<'a> TableReader<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self {
            table,
            prefix: String::new(),
            mismatched: Vec::new(),
        }
    }

    /// Fully qualified keys whose value had an unexpected type
    pub fn mismatched(&self) -> &[String] {
        &self.mismatched
    }

    fn lookup(&self, name: &str) -> Option<&'a Value> {
        self.table.get(name)
    }

    fn mismatch(&mut self, name: &str, value: &Value) {
        let key = format!("{}{}", self.prefix, name);
        log::warn!(
            "[TableReader] Key '{}' has unexpected type {}, keeping default",
            key,
            value.type_str()
        );
        self.mismatched.push(key);
    }
}

impl SettingsVisitor for TableReader<'_> {
    fn visit_bool(&mut self, name: &str, value: &mut bool) {
        match self.lookup(name) {
            Some(Value::Boolean(v)) => *value = *v,
            Some(other) => self.mismatch(name, other),
            None => {}
        }
    }

    fn visit_i64(&mut self, name: &str, value: &mut i64) {
        match self.lookup(name) {
            Some(Value::Integer(v)) => *value = *v,
            Some(other) => self.mismatch(name, other),
            None => {}
        }
    }

    fn visit_u64(&mut self, name: &str, value: &mut u64) {
        match self.lookup(name) {
            Some(Value::Integer(v)) if *v >= 0 => *value = *v as u64,
            Some(other) => self.mismatch(name, other),
            None => {}
        }
    }

    fn visit_f64(&mut self, name: &str, value: &mut f64) {
        match self.lookup(name) {
            Some(Value::Float(v)) => *value = *v,
            Some(Value::Integer(v)) => *value = *v as f64,
            Some(other) => self.mismatch(name, other),
            None => {}
        }
    }

    fn visit_string(&mut self, name: &str, value: &mut String) {
        match self.lookup(name) {
            Some(Value::String(v)) => value.clone_from(v),
            Some(other) => self.mismatch(name, other),
            None => {}
        }
    }

    fn visit_section(&mut self, name: &str, section: &mut dyn Settings) {
        match self.lookup(name) {
            Some(Value::Table(nested)) => {
                let mut reader = TableReader {
                    table: nested,
                    prefix: format!("{}{}.", self.prefix, name),
                    mismatched: Vec::new(),
                };
                section.visit_fields(&mut reader);
                self.mismatched.append(&mut reader.mismatched);
            }
            Some(other) => self.mismatch(name, other),
            None => {}
        }
    }
}

/// Capture the fields of `settings` as a table
pub fn to_table(settings: &mut dyn Settings) -> Table {
    let mut writer = TableWriter::new();
    settings.visit_fields(&mut writer);
    writer.into_table()
}

/// Apply a table to `settings`, returning the mismatched keys
pub fn apply_table(table: &Table, settings: &mut dyn Settings) -> Vec<String> {
    let mut reader = TableReader::new(table);
    settings.visit_fields(&mut reader);
    reader.mismatched
}

pub fn to_toml_string(settings: &mut dyn Settings) -> Result<String, SettingsError> {
    Ok(toml::to_string(&to_table(settings))?)
}

pub fn from_toml_str(content: &str, settings: &mut dyn Settings) -> Result<Vec<String>, SettingsError> {
    let table = content.parse::<Table>()?;
    Ok(apply_table(&table, settings))
}

/// Load settings from a TOML file
pub fn load_file(path: impl AsRef<Path>, settings: &mut dyn Settings) -> Result<Vec<String>, SettingsError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    from_toml_str(&content, settings)
}

/// Save settings to a TOML file
pub fn save_file(path: impl AsRef<Path>, settings: &mut dyn Settings) -> Result<(), SettingsError> {
    let path = path.as_ref();
    let content = to_toml_string(settings)?;
    std::fs::write(path, content).map_err(|source| SettingsError::Io {
        path: path.display().to_string(),
        source,
    })
}
