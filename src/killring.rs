//! Kill ring: bounded circular buffer of killed text fragments.

pub const MIN_KILL_RING_SLOTS: usize = 16;

#[derive(Debug, Clone)]
pub struct KillRing {
    slots: Vec<String>,
    capacity: usize,
    yank_index: usize,
}

impl Default for KillRing {
    fn default() -> Self {
        KillRing::with_capacity(MIN_KILL_RING_SLOTS)
    }
}

impl KillRing {
    pub fn with_capacity(capacity: usize) -> Self {
        KillRing {
            slots: Vec::new(),
            capacity: capacity.max(MIN_KILL_RING_SLOTS),
            yank_index: 0,
        }
    }

    /// Push a newly killed fragment; the yank index always points at the
    /// most recently killed slot.
    pub fn push(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        self.slots.push(text);
        if self.slots.len() > self.capacity {
            self.slots.remove(0);
        }
        self.yank_index = self.slots.len() - 1;
    }

    /// The text under the yank index — what Ctrl-Y inserts.
    pub fn yank(&self) -> Option<&str> {
        self.slots.get(self.yank_index).map(String::as_str)
    }

    /// Move the yank index to the previous (older) slot, wrapping; used
    /// by yank-pop (Ctrl-Y immediately repeated after a yank).
    pub fn yank_pop(&mut self) -> Option<&str> {
        if self.slots.is_empty() {
            return None;
        }
        self.yank_index = if self.yank_index == 0 {
            self.slots.len() - 1
        } else {
            self.yank_index - 1
        };
        self.slots.get(self.yank_index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yank_returns_exactly_the_killed_text() {
        let mut ring = KillRing::default();
        ring.push("deleted text");
        assert_eq!(ring.yank(), Some("deleted text"));
    }

    #[test]
    fn capacity_is_at_least_sixteen_and_drops_oldest() {
        let mut ring = KillRing::with_capacity(16);
        for i in 0..20 {
            ring.push(format!("frag{i}"));
        }
        assert_eq!(ring.len(), 16);
        // oldest (frag0..frag3) were evicted
        assert_eq!(ring.yank(), Some("frag19"));
    }

    #[test]
    fn empty_kill_is_ignored() {
        let mut ring = KillRing::default();
        ring.push("");
        assert!(ring.is_empty());
    }
}
