//! In-memory session history.

use serde_json::Value;

/// One history entry: a document-relative URL and its state object.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub url: String,
    pub state: Value,
}

/// A linear session history with a cursor.
///
/// Pushing while the cursor is not at the end drops the forward entries.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<HistoryEntry>,
    index: usize,
}

impl History {
    pub fn new(initial_url: impl Into<String>) -> Self {
        Self {
            entries: vec![HistoryEntry {
                url: initial_url.into(),
                state: Value::Null,
            }],
            index: 0,
        }
    }

    pub fn current(&self) -> &HistoryEntry {
        &self.entries[self.index]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn push(&mut self, state: Value, url: impl Into<String>) {
        self.entries.truncate(self.index + 1);
        self.entries.push(HistoryEntry {
            url: url.into(),
            state,
        });
        self.index = self.entries.len() - 1;
    }

    /// Move the cursor by `delta`. Returns the new entry, or `None` if the
    /// target is out of range (cursor unchanged).
    pub fn go(&mut self, delta: isize) -> Option<&HistoryEntry> {
        let target = self.index.checked_add_signed(delta)?;
        if delta == 0 || target >= self.entries.len() {
            return None;
        }
        self.index = target;
        Some(&self.entries[target])
    }
}
