use std::fmt;

/// Severity of a resource log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    Log,
    Warning,
    Error,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogKind::Log => write!(f, "log"),
            LogKind::Warning => write!(f, "warning"),
            LogKind::Error => write!(f, "error"),
        }
    }
}

/// Single message recorded while loading a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub kind: LogKind,
    pub message: String,
}

/// Messages produced by the most recent load of a resource
#[derive(Debug, Clone, Default)]
pub struct ResourceLogs {
    entries: Vec<LogEntry>,
    warning_count: u32,
    error_count: u32,
}

impl ResourceLogs {
    pub fn push(&mut self, kind: LogKind, message: impl Into<String>) {
        match kind {
            LogKind::Warning => self.warning_count += 1,
            LogKind::Error => self.error_count += 1,
            LogKind::Log => {}
        }
        self.entries.push(LogEntry {
            kind,
            message: message.into(),
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.warning_count = 0;
        self.error_count = 0;
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn warning_count(&self) -> u32 {
        self.warning_count
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
