//! Undo/redo over an opaque value.
//!
//! A pointer drag is recorded as one step: `persist` once at drag start, then
//! every move goes through `replace`, which rewrites `present` without
//! touching the stacks.

pub const DEFAULT_LIMIT: usize = 200;

#[derive(Clone, Debug)]
pub struct History<T> {
    past: Vec<T>,
    present: T,
    future: Vec<T>,
    limit: usize,
}

impl<T: Clone + PartialEq> History<T> {
    pub fn new(initial: T) -> Self {
        Self::with_limit(initial, DEFAULT_LIMIT)
    }

    pub fn with_limit(initial: T, limit: usize) -> Self {
        Self {
            past: Vec::new(),
            present: initial,
            future: Vec::new(),
            limit: limit.max(1),
        }
    }

    pub fn present(&self) -> &T {
        &self.present
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    /// Install `next` as the present value.
    ///
    /// With `skip_history == false` the old present becomes an undo point and
    /// the redo stack is dropped; with `true` only `present` changes. Setting
    /// a value equal to the present one is a no-op either way.
    pub fn set(&mut self, next: T, skip_history: bool) {
        if next == self.present {
            return;
        }
        if skip_history {
            self.present = next;
            return;
        }
        let prev = std::mem::replace(&mut self.present, next);
        self.push_past(prev);
        self.future.clear();
    }

    /// Like [`History::set`], computing the next value from the present one.
    pub fn update(&mut self, f: impl FnOnce(&T) -> T, skip_history: bool) {
        let next = f(&self.present);
        self.set(next, skip_history);
    }

    /// Shorthand for `set(next, true)`.
    pub fn replace(&mut self, next: T) {
        self.set(next, true);
    }

    /// Snapshot the present value as an undo point without changing it and
    /// without clearing the redo stack.
    pub fn persist(&mut self) {
        let snapshot = self.present.clone();
        self.push_past(snapshot);
    }

    /// Drop the undo point recorded by the last `persist` and restore the
    /// value it captured.
    pub fn revert_persist(&mut self) {
        if let Some(prev) = self.past.pop() {
            self.present = prev;
        }
    }

    pub fn undo(&mut self) -> bool {
        let Some(prev) = self.past.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, prev);
        self.future.push(current);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.future.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, next);
        self.past.push(current);
        true
    }

    pub fn clear(&mut self, initial: T) {
        self.past.clear();
        self.future.clear();
        self.present = initial;
    }

    fn push_past(&mut self, value: T) {
        self.past.push(value);
        if self.past.len() > self.limit {
            let overflow = self.past.len() - self.limit;
            self.past.drain(0..overflow);
        }
    }
}
