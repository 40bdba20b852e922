/// Free set of `u32` ids stored as a minimal list of inclusive ranges.
///
/// Ranges are kept sorted ascending and never touch: two ranges that
/// become adjacent are merged on the spot, so `[4,4]` + push(5) + `[6,9]`
/// collapses into `[4,9]`.
///
/// # Example
///
/// ```ignore
/// let mut free = RangeFreeList::new();
/// free.push(5);
/// free.push(6);            // [5,6]
/// assert_eq!(free.pop(), Some(6));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeFreeList {
    ranges: Vec<IdRange>,
}

/// Inclusive range of free ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    pub start: u32,
    pub end: u32,
}

impl IdRange {
    /// Number of ids in the range
    pub fn count(&self) -> u64 {
        (self.end - self.start) as u64 + 1
    }
}

impl RangeFreeList {
    /// Create an empty free list
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Create a free list holding every id between `a` and `b`, inclusive.
    ///
    /// The bounds may be given in either order.
    pub fn with_range(a: u32, b: u32) -> Self {
        Self {
            ranges: vec![IdRange { start: a.min(b), end: a.max(b) }],
        }
    }

    /// Remove and return the highest free id
    pub fn pop(&mut self) -> Option<u32> {
        let last = self.ranges.last_mut()?;
        let id = last.end;
        if last.start == last.end {
            self.ranges.pop();
        } else {
            last.end -= 1;
        }
        Some(id)
    }

    /// Return `id` to the free set, merging with its neighbours.
    ///
    /// Pushing an id that is already free leaves the list unchanged.
    pub fn push(&mut self, id: u32) {
        // First range whose end is >= id - 1, i.e. the only candidate that
        // can absorb `id` from below; the one after it may absorb from above.
        let idx = self
            .ranges
            .partition_point(|r| r.end < id.saturating_sub(1));

        let Some(&current) = self.ranges.get(idx) else {
            self.ranges.push(IdRange { start: id, end: id });
            return;
        };

        if current.start <= id && id <= current.end {
            return;
        }

        if current.end.checked_add(1) == Some(id) {
            self.ranges[idx].end = id;
            let bridges = self
                .ranges
                .get(idx + 1)
                .is_some_and(|next| id.checked_add(1) == Some(next.start));
            if bridges {
                let next = self.ranges.remove(idx + 1);
                self.ranges[idx].end = next.end;
            }
        } else if id.checked_add(1) == Some(current.start) {
            self.ranges[idx].start = id;
        } else {
            self.ranges.insert(idx, IdRange { start: id, end: id });
        }
    }

    /// Whether `id` is currently free
    pub fn contains(&self, id: u32) -> bool {
        let idx = self.ranges.partition_point(|r| r.end < id);
        self.ranges.get(idx).is_some_and(|r| r.start <= id)
    }

    /// Number of free ids
    pub fn len(&self) -> u64 {
        self.ranges.iter().map(IdRange::count).sum()
    }

    /// Whether no id is free
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Current ranges, ascending
    pub fn ranges(&self) -> &[IdRange] {
        &self.ranges
    }

    /// Iterate over every free id, ascending
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.ranges.iter().flat_map(|r| r.start..=r.end)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "range_free_list_tests.rs"]
mod tests;
