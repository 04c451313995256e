use crate::Millis;
use std::cmp::Ordering;

/// Anything that can live in a `MinHeap`.
/// The heap only ever reads these two fields.
pub trait HeapNode {
    fn sort_index(&self) -> Millis;
    fn id(&self) -> u64;
}

fn compare<T: HeapNode>(a: &T, b: &T) -> Ordering {
    a.sort_index()
        .cmp(&b.sort_index())
        .then_with(|| a.id().cmp(&b.id()))
}

/// Array-backed binary min-heap ordered by `(sort_index, id)`.
///
/// Ties on `sort_index` go to the lower id, so equal deadlines come out in
/// submission order. Entries are never evicted by the heap itself.
#[derive(Debug, Clone)]
pub struct MinHeap<T> {
    nodes: Vec<T>,
}

impl<T> Default for MinHeap<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<T: HeapNode> MinHeap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn peek(&self) -> Option<&T> {
        self.nodes.first()
    }

    pub fn push(&mut self, node: T) {
        self.nodes.push(node);
        self.sift_up(self.nodes.len() - 1);
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.nodes.is_empty() {
            return None;
        }
        let first = self.nodes.swap_remove(0);
        if !self.nodes.is_empty() {
            self.sift_down(0);
        }
        Some(first)
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if compare(&self.nodes[parent], &self.nodes[index]) == Ordering::Greater {
                self.nodes.swap(parent, index);
                index = parent;
            } else {
                return;
            }
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.nodes.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            if left >= len {
                return;
            }

            // Pick the smaller child; the right one only wins when strictly smaller.
            let smaller = if right < len
                && compare(&self.nodes[right], &self.nodes[left]) == Ordering::Less
            {
                right
            } else {
                left
            };

            if compare(&self.nodes[smaller], &self.nodes[index]) == Ordering::Less {
                self.nodes.swap(smaller, index);
                index = smaller;
            } else {
                return;
            }
        }
    }
}
