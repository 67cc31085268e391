use std::collections::{HashSet, VecDeque};

/// Number of message ids remembered by default
pub const DEFAULT_CAPACITY: usize = 5000;

/// Bounded record of recently seen message ids.
///
/// Holds at most `capacity` ids; inserting into a full window evicts the
/// oldest one.
#[derive(Debug, Clone)]
pub struct ReplayWindow {
    capacity: usize,
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl ReplayWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ReplayWindow {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Record `id`. Returns `false` without changing anything if it is
    /// already in the window.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }

        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }

        self.order.push_back(id.to_string());
        self.seen.insert(id.to_string());
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ReplayWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
