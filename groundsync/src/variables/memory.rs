//! In-memory variable backend.
//!
//! Plays the part of both simulated backends in tests and dry runs. Values set
//! through [`MemoryBackend::set`] model the *other side* changing a variable;
//! writes made through the [`VariableBackend`] trait are recorded so callers
//! can assert on exactly what was actuated.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::backend::{BackendError, VariableBackend};
use super::value::VarValue;

#[derive(Default)]
struct MemoryState {
    values: HashMap<String, VarValue>,
    failing: HashSet<String>,
    writes: Vec<(String, VarValue)>,
    reads: HashMap<String, u64>,
}

/// Variable backend backed by a hash map.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value without recording a write.
    pub fn set(&self, name: &str, value: impl Into<VarValue>) {
        self.state
            .lock()
            .values
            .insert(name.to_string(), value.into());
    }

    /// Current value of a variable.
    pub fn get(&self, name: &str) -> Option<VarValue> {
        self.state.lock().values.get(name).cloned()
    }

    /// Make reads of `name` fail (or succeed again).
    pub fn fail_reads(&self, name: &str, failing: bool) {
        let mut state = self.state.lock();
        if failing {
            state.failing.insert(name.to_string());
        } else {
            state.failing.remove(name);
        }
    }

    /// All writes in the order they were made.
    pub fn writes(&self) -> Vec<(String, VarValue)> {
        self.state.lock().writes.clone()
    }

    /// Values written to one variable, oldest first.
    pub fn writes_to(&self, name: &str) -> Vec<VarValue> {
        self.state
            .lock()
            .writes
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Forget recorded writes.
    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }

    /// Number of reads of a variable so far.
    pub fn read_count(&self, name: &str) -> u64 {
        self.state.lock().reads.get(name).copied().unwrap_or(0)
    }
}

#[async_trait]
impl VariableBackend for MemoryBackend {
    async fn read(&self, name: &str) -> Result<VarValue, BackendError> {
        let mut state = self.state.lock();
        *state.reads.entry(name.to_string()).or_insert(0) += 1;
        if state.failing.contains(name) {
            return Err(BackendError::Transport(format!("read of '{}' failed", name)));
        }
        state
            .values
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(name.to_string()))
    }

    async fn write(&self, name: &str, value: VarValue) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.writes.push((name.to_string(), value.clone()));
        state.values.insert(name.to_string(), value);
        Ok(())
    }
}
