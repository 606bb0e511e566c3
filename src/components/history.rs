use std::collections::VecDeque;
use std::sync::Arc;

// ============================================================================
// SNAPSHOT HISTORY
// ============================================================================

/// Linear undo/redo over whole-document snapshots.
///
/// Entries are `Arc`s, so a snapshot handed out by [`History::snapshot`] (to
/// autosave, a background job, or the proposal overlay) stays valid however
/// the history moves afterwards.
///
/// `past` is oldest-first, `future[0]` is the next redo target.
#[derive(Debug, Clone)]
pub struct History<T> {
    past: Vec<Arc<T>>,
    present: Arc<T>,
    future: VecDeque<Arc<T>>,
}

impl<T> History<T> {
    /// Start a history at `initial` with nothing to undo or redo.
    pub fn new(initial: T) -> Self {
        Self {
            past: Vec::new(),
            present: Arc::new(initial),
            future: VecDeque::new(),
        }
    }

    pub fn present(&self) -> &T {
        &self.present
    }

    /// Shared handle to the current snapshot.
    pub fn snapshot(&self) -> Arc<T> {
        Arc::clone(&self.present)
    }

    /// Make `value` the present. The old present moves onto the undo stack
    /// and the redo stack is dropped. Equal values still make a new entry.
    pub fn set(&mut self, value: T) {
        let prev = std::mem::replace(&mut self.present, Arc::new(value));
        self.past.push(prev);
        self.future.clear();
    }

    /// `set(f(present))`.
    pub fn update(&mut self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.present);
        self.set(next);
    }

    /// Overwrite the present without making a new entry. Redo is still
    /// dropped, since the branch it belonged to no longer exists.
    pub fn replace_present(&mut self, value: T) {
        self.present = Arc::new(value);
        self.future.clear();
    }

    /// Step back. Returns false (and changes nothing) when there is nothing
    /// to undo.
    pub fn undo(&mut self) -> bool {
        match self.past.pop() {
            Some(prev) => {
                let current = std::mem::replace(&mut self.present, prev);
                self.future.push_front(current);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.future.pop_front() {
            Some(next) => {
                let current = std::mem::replace(&mut self.present, next);
                self.past.push(current);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.past.len()
    }

    pub fn redo_count(&self) -> usize {
        self.future.len()
    }
}
