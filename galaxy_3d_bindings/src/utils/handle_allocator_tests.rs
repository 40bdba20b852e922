use super::*;

// ============================================================================
// Monotonic policy
// ============================================================================

#[test]
fn test_monotonic_sequential_alloc() {
    let mut ids = HandleAllocator::monotonic();
    assert_eq!(ids.alloc().unwrap(), 0);
    assert_eq!(ids.alloc().unwrap(), 1);
    assert_eq!(ids.alloc().unwrap(), 2);
}

#[test]
fn test_monotonic_never_reuses() {
    let mut ids = HandleAllocator::monotonic();
    let a = ids.alloc().unwrap();
    let _b = ids.alloc().unwrap();
    ids.free(a);
    assert_eq!(ids.alloc().unwrap(), 2);
    assert_eq!(ids.len(), 2);
    assert_eq!(ids.high_water_mark(), 3);
}

#[test]
fn test_default_is_monotonic_and_empty() {
    let ids = HandleAllocator::default();
    assert!(!ids.is_recycling());
    assert!(ids.is_empty());
    assert_eq!(ids.high_water_mark(), 0);
}

// ============================================================================
// Recycling policy
// ============================================================================

#[test]
fn test_recycling_reuses_freed_value() {
    let mut ids = HandleAllocator::recycling();
    let a = ids.alloc().unwrap(); // 0
    let b = ids.alloc().unwrap(); // 1
    ids.free(a);
    assert_eq!(ids.alloc().unwrap(), 0);
    assert_eq!(b, 1);
}

#[test]
fn test_recycling_prefers_highest_free_value() {
    let mut ids = HandleAllocator::recycling();
    for _ in 0..5 {
        ids.alloc().unwrap();
    }
    ids.free(1);
    ids.free(3);
    ids.free(2); // bridges [1] and [3] into [1,3]

    assert_eq!(ids.alloc().unwrap(), 3);
    assert_eq!(ids.alloc().unwrap(), 2);
    assert_eq!(ids.alloc().unwrap(), 1);
    // Free values exhausted, next is fresh
    assert_eq!(ids.alloc().unwrap(), 5);
}

#[test]
fn test_len_and_high_water_mark() {
    let mut ids = HandleAllocator::recycling();
    let live: Vec<u32> = (0..100).map(|_| ids.alloc().unwrap()).collect();
    assert_eq!(ids.len(), 100);

    for &id in live.iter().filter(|id| *id % 2 == 1) {
        ids.free(id);
    }
    assert_eq!(ids.len(), 50);
    assert_eq!(ids.high_water_mark(), 100);

    for _ in 0..50 {
        let id = ids.alloc().unwrap();
        assert!(id % 2 == 1, "expected recycled odd id, got {}", id);
    }
    assert_eq!(ids.high_water_mark(), 100);
    assert_eq!(ids.alloc().unwrap(), 100);
}

#[test]
fn test_live_values_are_unique() {
    let mut ids = HandleAllocator::recycling();
    let mut seen = std::collections::HashSet::new();

    for _ in 0..50 {
        seen.insert(ids.alloc().unwrap());
    }
    for id in 0..10 {
        ids.free(id);
        seen.remove(&id);
    }
    for _ in 0..10 {
        let id = ids.alloc().unwrap();
        assert!(seen.insert(id), "duplicate handle: {}", id);
    }
    assert_eq!(seen.len(), 50);
}
