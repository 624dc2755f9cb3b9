//! Traversal Queue - breadth-first work list
//!
//! Every entry already has its disk extent reserved, so popping order is
//! exactly record order in the blob.

use crate::object::ObjectId;
use std::collections::VecDeque;

/// An object whose record is reserved but not yet written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingObject {
    pub object: ObjectId,
    /// Total size, header included, raised to the minimum object size
    pub size: usize,
    /// Offset of the record's token field (`record start + W`)
    pub token_offset: usize,
}

/// FIFO of pending objects
#[derive(Debug, Default)]
pub struct TraversalQueue {
    queue: VecDeque<PendingObject>,
    enqueued: u64,
}

impl TraversalQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            enqueued: 0,
        }
    }

    pub fn push(&mut self, pending: PendingObject) {
        self.queue.push_back(pending);
        self.enqueued += 1;
    }

    pub fn pop(&mut self) -> Option<PendingObject> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Objects ever pushed
    pub fn enqueued(&self) -> u64 {
        self.enqueued
    }
}
