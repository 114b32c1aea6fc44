//! File identifiers.

use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Identifier of a source file known to a project.
///
/// File ids are dense small integers handed out by a [`FileIdAllocator`].
/// They carry no path; the host keeps the path mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(u32);

impl FileId {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn index(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

/// Thread-safe source of fresh [`FileId`]s.
#[derive(Debug, Default)]
pub struct FileIdAllocator {
    next: AtomicU32,
}

impl FileIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&self) -> FileId {
        FileId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_hands_out_distinct_ids() {
        let alloc = FileIdAllocator::new();
        let a = alloc.alloc();
        let b = alloc.alloc();
        assert_ne!(a, b);
        assert_eq!(a.index() + 1, b.index());
    }

    #[test]
    fn test_file_id_ordering() {
        assert!(FileId::new(1) < FileId::new(2));
        assert_eq!(FileId::new(7).to_string(), "file#7");
    }
}
