use serde::{Deserialize, Serialize};

/// Direction in which a thread's rings are played and nested.
///
/// The same value drives both the sequencer's "next ring" step and the
/// renderer's concentric sizing so the outermost ring is always the one the
/// sequence starts with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingOrder {
    /// Oldest ring first; the oldest ring is drawn outermost.
    #[default]
    OldestFirst,
    /// Newest ring first; the newest ring is drawn outermost.
    NewestFirst,
}

impl RingOrder {
    /// Ring index a full-sequence playback starts from.
    pub fn first_index(self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        match self {
            RingOrder::OldestFirst => Some(0),
            RingOrder::NewestFirst => Some(len - 1),
        }
    }

    /// Ring index that follows `current`, or `None` at the end of the
    /// sequence.
    pub fn next_index(self, current: usize, len: usize) -> Option<usize> {
        if current >= len {
            return None;
        }
        match self {
            RingOrder::OldestFirst => (current + 1 < len).then_some(current + 1),
            RingOrder::NewestFirst => current.checked_sub(1),
        }
    }

    /// Zero-based nesting depth of a ring, 0 being the outermost circle.
    pub fn concentric_position(self, index: usize, len: usize) -> usize {
        match self {
            RingOrder::OldestFirst => index,
            RingOrder::NewestFirst => len.saturating_sub(1).saturating_sub(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(order: RingOrder, len: usize) -> Vec<usize> {
        let mut indices = Vec::new();
        let mut cursor = order.first_index(len);
        while let Some(index) = cursor {
            indices.push(index);
            cursor = order.next_index(index, len);
        }
        indices
    }

    #[test]
    fn oldest_first_walks_forward() {
        let order = RingOrder::OldestFirst;
        assert_eq!(walk(order, 3), vec![0, 1, 2]);
        assert_eq!(order.next_index(2, 3), None);
        assert_eq!(order.concentric_position(0, 3), 0);
    }

    #[test]
    fn newest_first_walks_backward() {
        let order = RingOrder::NewestFirst;
        assert_eq!(walk(order, 4), vec![3, 2, 1, 0]);
        assert_eq!(order.next_index(0, 4), None);
        assert_eq!(order.concentric_position(3, 4), 0);
        assert_eq!(order.concentric_position(0, 4), 3);
    }

    #[test]
    fn empty_threads_have_no_sequence() {
        assert_eq!(RingOrder::OldestFirst.first_index(0), None);
        assert!(walk(RingOrder::NewestFirst, 0).is_empty());
        assert_eq!(RingOrder::OldestFirst.next_index(5, 3), None);
    }
}
