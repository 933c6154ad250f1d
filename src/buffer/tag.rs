use crate::domain::LogTag;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out strictly increasing tags, starting at 1.
///
/// Shared by every clone of a destination handle so that a tag is never
/// reused for the lifetime of the destination.
#[derive(Debug)]
pub struct TagAllocator {
    next: AtomicU64,
}

impl TagAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_tag(&self) -> LogTag {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for TagAllocator {
    fn default() -> Self {
        Self::new()
    }
}
