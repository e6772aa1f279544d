// SPDX-License-Identifier: GPL-3.0-only
use std::collections::VecDeque;

use crate::addon::AddonId;

/// Downloads currently in flight, in request order.
///
/// Only used for dedup of in-flight work and for progress display. Completions
/// may arrive in any order, so removal matches by id rather than popping the head.
#[derive(Debug, Default, Clone)]
pub struct DownloadQueue {
    items: VecDeque<AddonId>,
}

impl DownloadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: AddonId) {
        self.items.push_back(id);
    }

    /// Remove the earliest entry for `id`. Returns false if it was not queued.
    pub fn remove(&mut self, id: AddonId) -> bool {
        match self.items.iter().position(|queued| *queued == id) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: AddonId) -> bool {
        self.items.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = AddonId> + '_ {
        self.items.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> AddonId {
        AddonId::new(raw).unwrap()
    }

    #[test]
    fn test_remove_out_of_order() {
        let mut queue = DownloadQueue::new();
        queue.push(id(1));
        queue.push(id(2));
        queue.push(id(3));

        assert!(queue.remove(id(2)));
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec![id(1), id(3)]);
        assert!(!queue.remove(id(2)));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_empty_queue() {
        let mut queue = DownloadQueue::new();
        assert!(queue.is_empty());
        assert!(!queue.contains(id(9)));
        assert!(!queue.remove(id(9)));
    }
}
