use crate::error::Result;
use crate::utils::RangeFreeList;
use crate::bind_bail;

/// Issues `u32` handle values for the resource registry.
///
/// Two policies:
/// - monotonic (default): values only grow, a released value is never
///   handed out again
/// - recycling: released values go into a [`RangeFreeList`] and are
///   reused (highest first) before the counter grows
///
/// # Example
///
/// ```ignore
/// let mut ids = HandleAllocator::recycling();
/// let a = ids.alloc()?;  // 0
/// let b = ids.alloc()?;  // 1
/// ids.free(a);           // 0 is now available
/// let c = ids.alloc()?;  // 0 (recycled)
/// ```
#[derive(Debug, Clone)]
pub struct HandleAllocator {
    free: RangeFreeList,
    recycle: bool,
    next_id: u32,
    len: u32,
}

impl HandleAllocator {
    /// Allocator that never reuses a released value
    pub fn monotonic() -> Self {
        Self {
            free: RangeFreeList::new(),
            recycle: false,
            next_id: 0,
            len: 0,
        }
    }

    /// Allocator that reuses released values
    pub fn recycling() -> Self {
        Self {
            recycle: true,
            ..Self::monotonic()
        }
    }

    /// Allocate the next handle value
    pub fn alloc(&mut self) -> Result<u32> {
        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                if self.next_id == u32::MAX {
                    bind_bail!(InvalidResource, "galaxy3d::HandleAllocator",
                        "handle space exhausted after {} allocations", self.next_id);
                }
                let id = self.next_id;
                self.next_id += 1;
                id
            }
        };
        self.len += 1;
        Ok(id)
    }

    /// Release a handle value
    pub fn free(&mut self, id: u32) {
        debug_assert!(id < self.next_id, "freeing an unallocated handle: {}", id);
        debug_assert!(!self.free.contains(id), "double free of handle: {}", id);
        self.len -= 1;
        if self.recycle {
            self.free.push(id);
        }
    }

    /// Whether released values are reused
    pub fn is_recycling(&self) -> bool {
        self.recycle
    }

    /// Highest value ever issued + 1
    pub fn high_water_mark(&self) -> u32 {
        self.next_id
    }

    /// Number of live handles
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether no handle is live
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::monotonic()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "handle_allocator_tests.rs"]
mod tests;
