// Command Log
//
// Commands committed for a class, in the order the consensus layer
// decided. Indices start at 1 and have no gaps.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::command::Command;

/// Position of a command in the applied log.
pub type Index = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub index: Index,
    pub command: Command,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LogError {
    #[error("index conflict: expected {expected}, got {actual}")]
    IndexConflict { expected: Index, actual: Index },
}

#[derive(Debug, Default)]
pub struct CommandLog {
    entries: VecDeque<LogEntry>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_index(&self) -> Index {
        self.last_index() + 1
    }

    /// Append an entry carrying its own index. The index must follow the
    /// last one exactly.
    pub fn append(&mut self, entry: LogEntry) -> Result<(), LogError> {
        let expected = self.next_index();
        if entry.index != expected {
            return Err(LogError::IndexConflict {
                expected,
                actual: entry.index,
            });
        }
        self.entries.push_back(entry);
        Ok(())
    }

    /// Append a command at the next free index.
    pub fn push(&mut self, command: Command) -> Index {
        let index = self.next_index();
        self.entries.push_back(LogEntry { index, command });
        index
    }

    pub fn replay(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn last_index(&self) -> Index {
        self.entries.back().map_or(0, |e| e.index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build a log from entries decoded elsewhere, rejecting the first gap,
/// duplicate or out-of-order index.
impl TryFrom<Vec<LogEntry>> for CommandLog {
    type Error = LogError;

    fn try_from(entries: Vec<LogEntry>) -> Result<Self, Self::Error> {
        let mut log = CommandLog::new();
        for entry in entries {
            log.append(entry)?;
        }
        Ok(log)
    }
}
