//! Undo stack: bounded snapshot stack for the line editor's buffer.

pub const MIN_UNDO_DEPTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub buffer: String,
    pub cursor: usize,
}

#[derive(Debug, Clone)]
pub struct UndoStack {
    snapshots: Vec<Snapshot>,
    capacity: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        UndoStack::with_capacity(MIN_UNDO_DEPTH)
    }
}

impl UndoStack {
    pub fn with_capacity(capacity: usize) -> Self {
        UndoStack {
            snapshots: Vec::new(),
            capacity: capacity.max(MIN_UNDO_DEPTH),
        }
    }

    /// Snapshot the buffer/cursor before a mutating operation. Call this
    /// BEFORE applying the edit, so `pop` restores pre-edit state.
    pub fn push(&mut self, buffer: impl Into<String>, cursor: usize) {
        self.snapshots.push(Snapshot {
            buffer: buffer.into(),
            cursor,
        });
        if self.snapshots.len() > self.capacity {
            self.snapshots.remove(0);
        }
    }

    pub fn pop(&mut self) -> Option<Snapshot> {
        self.snapshots.pop()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_restores_exact_prior_state() {
        let mut stack = UndoStack::default();
        stack.push("hello", 5);
        // simulate an edit: buffer becomes "hello!" cursor 6
        let snap = stack.pop().unwrap();
        assert_eq!(snap.buffer, "hello");
        assert_eq!(snap.cursor, 5);
    }

    #[test]
    fn bounded_to_at_least_fifty_drops_oldest() {
        let mut stack = UndoStack::with_capacity(50);
        for i in 0..60 {
            stack.push(format!("state{i}"), i);
        }
        assert_eq!(stack.len(), 50);
        let top = stack.pop().unwrap();
        assert_eq!(top.buffer, "state59");
    }
}
