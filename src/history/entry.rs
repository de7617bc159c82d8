use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::command::Command;
use crate::catalog_store::{new_id, now_timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        })
    }
}

/// One line of the project's history feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum HistoryEntry {
    Operation {
        id: String,
        created_at: String,
        message: String,
        command: Command,
        inverse: Command,
        #[serde(default)]
        undone: bool,
    },
    Undo {
        id: String,
        created_at: String,
        message: String,
        target_id: String,
    },
    Redo {
        id: String,
        created_at: String,
        message: String,
        target_id: String,
    },
    Log {
        id: String,
        created_at: String,
        level: LogLevel,
        message: String,
        #[serde(default)]
        details: Option<Value>,
    },
}

impl HistoryEntry {
    pub fn operation(message: String, command: Command, inverse: Command) -> Self {
        HistoryEntry::Operation {
            id: new_id(),
            created_at: now_timestamp(),
            message,
            command,
            inverse,
            undone: false,
        }
    }

    pub fn undo(message: String, target_id: &str) -> Self {
        HistoryEntry::Undo {
            id: new_id(),
            created_at: now_timestamp(),
            message,
            target_id: target_id.to_string(),
        }
    }

    pub fn redo(message: String, target_id: &str) -> Self {
        HistoryEntry::Redo {
            id: new_id(),
            created_at: now_timestamp(),
            message,
            target_id: target_id.to_string(),
        }
    }

    pub fn log(level: LogLevel, message: String, details: Option<Value>) -> Self {
        HistoryEntry::Log {
            id: new_id(),
            created_at: now_timestamp(),
            level,
            message,
            details,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            HistoryEntry::Operation { id, .. }
            | HistoryEntry::Undo { id, .. }
            | HistoryEntry::Redo { id, .. }
            | HistoryEntry::Log { id, .. } => id,
        }
    }

    pub fn created_at(&self) -> &str {
        match self {
            HistoryEntry::Operation { created_at, .. }
            | HistoryEntry::Undo { created_at, .. }
            | HistoryEntry::Redo { created_at, .. }
            | HistoryEntry::Log { created_at, .. } => created_at,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            HistoryEntry::Operation { message, .. }
            | HistoryEntry::Undo { message, .. }
            | HistoryEntry::Redo { message, .. }
            | HistoryEntry::Log { message, .. } => message,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HistoryEntry::Operation { .. } => "operation",
            HistoryEntry::Undo { .. } => "undo",
            HistoryEntry::Redo { .. } => "redo",
            HistoryEntry::Log { .. } => "log",
        }
    }

    /// `Some(undone)` for operations, `None` for every other entry.
    pub fn undone(&self) -> Option<bool> {
        match self {
            HistoryEntry::Operation { undone, .. } => Some(*undone),
            _ => None,
        }
    }
}
