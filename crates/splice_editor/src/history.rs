// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo command stack.
//!
//! A successful execute pushes onto the undo stack and clears the redo stack.
//! Undo and redo shuttle entries between the two. When the undo stack grows
//! past its capacity the oldest entry is dropped for good and the caller is
//! told which one.

use crate::commands::{Command, CommandError, CommandKind};
use serde::{Deserialize, Serialize};
use splice_timeline::Timeline;
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum undo history depth
pub const MAX_HISTORY: usize = 100;

/// A command that has been applied, with the time it was recorded
#[derive(Debug)]
pub struct HistoryEntry {
    /// The command
    pub command: Box<dyn Command>,
    /// Timestamp (seconds since the Unix epoch)
    pub timestamp: u64,
}

impl HistoryEntry {
    fn new(command: Box<dyn Command>) -> Self {
        Self {
            command,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }
}

/// Result of a successful execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    /// Description of the executed command
    pub description: String,
    /// Kind of the executed command
    pub kind: CommandKind,
    /// Description of the oldest entry if capacity forced it out
    pub evicted: Option<String>,
}

/// Snapshot of the stack for menus and toolbars
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
    /// Whether undo is available
    pub can_undo: bool,
    /// Whether redo is available
    pub can_redo: bool,
    /// Description of the next undo
    pub undo_description: Option<String>,
    /// Description of the next redo
    pub redo_description: Option<String>,
    /// Entries on the undo stack
    pub history_size: usize,
}

/// Undo/redo stack of commands
#[derive(Debug)]
pub struct CommandStack {
    /// Undo stack, most recent at the back
    undo_stack: VecDeque<HistoryEntry>,
    /// Redo stack, most recent at the back
    redo_stack: Vec<HistoryEntry>,
    /// Maximum undo depth
    max_depth: usize,
}

impl CommandStack {
    /// Create a stack with the default depth
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Execute a command and record it.
    ///
    /// A failed command is not recorded and leaves both stacks untouched.
    pub fn execute(
        &mut self,
        mut command: Box<dyn Command>,
        timeline: &mut Timeline,
    ) -> Result<Committed, CommandError> {
        if let Err(e) = command.execute(timeline) {
            tracing::warn!("Command '{}' rejected: {}", command.description(), e);
            return Err(e);
        }

        let description = command.description();
        let kind = command.kind();
        tracing::debug!("Executed '{}'", description);

        self.redo_stack.clear();
        self.undo_stack.push_back(HistoryEntry::new(command));

        let mut evicted = None;
        while self.undo_stack.len() > self.max_depth {
            if let Some(old) = self.undo_stack.pop_front() {
                let old_description = old.command.description();
                tracing::debug!("History full, dropped '{}'", old_description);
                evicted = Some(old_description);
            }
        }

        Ok(Committed {
            description,
            kind,
            evicted,
        })
    }

    /// Undo the most recent command. Returns false when there is nothing to undo.
    pub fn undo(&mut self, timeline: &mut Timeline) -> Result<bool, CommandError> {
        let Some(mut entry) = self.undo_stack.pop_back() else {
            return Ok(false);
        };

        if let Err(e) = entry.command.undo(timeline) {
            tracing::warn!("Undo of '{}' failed: {}", entry.command.description(), e);
            self.undo_stack.push_back(entry);
            return Err(e);
        }

        tracing::debug!("Undid '{}'", entry.command.description());
        self.redo_stack.push(entry);
        Ok(true)
    }

    /// Redo the most recently undone command. Returns false when there is nothing to redo.
    pub fn redo(&mut self, timeline: &mut Timeline) -> Result<bool, CommandError> {
        let Some(mut entry) = self.redo_stack.pop() else {
            return Ok(false);
        };

        if let Err(e) = entry.command.redo(timeline) {
            tracing::warn!("Redo of '{}' failed: {}", entry.command.description(), e);
            self.redo_stack.push(entry);
            return Err(e);
        }

        tracing::debug!("Redid '{}'", entry.command.description());
        self.undo_stack.push_back(entry);
        Ok(true)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get undo stack depth
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get redo stack depth
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Maximum undo depth
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Get description of next undo operation
    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.back().map(|e| e.command.description())
    }

    /// Get description of next redo operation
    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.last().map(|e| e.command.description())
    }

    /// Recorded entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.undo_stack.iter()
    }

    /// Current state for UI
    pub fn state(&self) -> HistoryState {
        HistoryState {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            undo_description: self.undo_description(),
            redo_description: self.redo_description(),
            history_size: self.undo_stack.len(),
        }
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new()
    }
}
