//! Execution-context-scoped reentrancy tracking.

use std::sync::Mutex;

/// Records which lock keys the owning execution context currently holds.
///
/// Every lock handle embeds one registry and consults it before contacting
/// the store: if the key is already entered, acquisition succeeds locally.
/// Handles are driven by a single logical context, so the registry is scoped
/// to that context by construction rather than by thread-local storage.
///
/// Reentrancy is only valid for call stacks that stay on the context owning
/// the handle. It does not survive handing work off to another task or
/// worker, and it is never a substitute for store-side mutual exclusion
/// between contexts.
#[derive(Debug, Default)]
pub struct ReentrancyRegistry {
    held: Mutex<Vec<String>>,
}

impl ReentrancyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is currently entered at least once.
    pub fn is_entered(&self, key: &str) -> bool {
        self.held
            .lock()
            .expect("reentrancy registry poisoned")
            .iter()
            .any(|held| held == key)
    }

    /// Registers one more entry for `key`. Always appends, so nested
    /// acquisitions stack one entry each.
    pub fn enter(&self, key: &str) {
        self.held
            .lock()
            .expect("reentrancy registry poisoned")
            .push(key.to_string());
    }

    /// Removes at most one occurrence of `key`.
    pub fn exit(&self, key: &str) {
        let mut held = self.held.lock().expect("reentrancy registry poisoned");
        if let Some(position) = held.iter().position(|h| h == key) {
            held.remove(position);
        }
    }
}
