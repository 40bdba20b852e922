use super::*;
use crate::backend::{LayoutDesc, LayoutEntry, MockBackend, ShaderStages};
use crate::error::Error;

// ============================================================================
// Helpers
// ============================================================================

fn uniform_layout(backend: &mut MockBackend) -> <MockBackend as BindingBackend>::Layout {
    backend
        .create_layout(&LayoutDesc {
            entries: vec![LayoutEntry {
                binding: 0,
                descriptor_type: DescriptorType::UniformBuffer,
                count: 1,
                stages: ShaderStages::VERTEX,
            }],
        })
        .unwrap()
}

fn allocate_calls(backend: &MockBackend) -> usize {
    backend.commands.iter().filter(|c| *c == "allocate_set").count()
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_new_creates_one_pool() {
    let mut backend = MockBackend::new();
    let mut allocator = PoolAllocator::new(&mut backend, AllocatorConfig::with_initial_sets(2)).unwrap();

    assert_eq!(backend.created_pool_sizes(), &[2]);
    assert_eq!(allocator.ready_pools().len(), 1);
    assert!(allocator.exhausted_pools().is_empty());
    assert_eq!(allocator.growth_target(), 3);

    allocator.teardown(&mut backend);
}

#[test]
fn test_default_config() {
    let config = AllocatorConfig::default();
    assert_eq!(config.initial_sets, 16);
    assert_eq!(config.growth_factor, 1.5);
    assert_eq!(config.max_sets_per_pool, 4096);
    assert_eq!(config.pool_ratios.len(), 7);
}

#[test]
fn test_new_rejects_zero_initial_sets() {
    let mut backend = MockBackend::new();
    let result = PoolAllocator::new(&mut backend, AllocatorConfig::with_initial_sets(0));
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
    assert_eq!(backend.live_pool_count(), 0);
}

#[test]
fn test_new_rejects_shrinking_growth_factor() {
    let mut backend = MockBackend::new();
    for factor in [0.5, f32::NAN] {
        let config = AllocatorConfig { growth_factor: factor, ..AllocatorConfig::default() };
        let result = PoolAllocator::new(&mut backend, config);
        assert!(matches!(result, Err(Error::InitializationFailed(_))));
    }
}

#[test]
fn test_new_rejects_cap_below_initial() {
    let mut backend = MockBackend::new();
    let config = AllocatorConfig { max_sets_per_pool: 8, ..AllocatorConfig::with_initial_sets(16) };
    assert!(matches!(PoolAllocator::new(&mut backend, config), Err(Error::InitializationFailed(_))));
}

#[test]
fn test_new_rejects_empty_ratios() {
    let mut backend = MockBackend::new();
    let config = AllocatorConfig { pool_ratios: Vec::new(), ..AllocatorConfig::default() };
    assert!(matches!(PoolAllocator::new(&mut backend, config), Err(Error::InitializationFailed(_))));
}

// ============================================================================
// Allocation and growth
// ============================================================================

#[test]
fn test_third_allocation_grows_into_new_pool() {
    let mut backend = MockBackend::new();
    let layout = uniform_layout(&mut backend);
    let mut allocator = PoolAllocator::new(&mut backend, AllocatorConfig::with_initial_sets(2)).unwrap();

    let a = allocator.allocate(&mut backend, layout).unwrap();
    let b = allocator.allocate(&mut backend, layout).unwrap();
    let c = allocator.allocate(&mut backend, layout).unwrap();

    assert_eq!(backend.created_pool_sizes(), &[2, 3]);
    assert_eq!(backend.set_pool(a), backend.set_pool(b));
    assert_ne!(backend.set_pool(a), backend.set_pool(c));

    assert_eq!(allocator.exhausted_pools(), &[backend.set_pool(a).unwrap()]);
    assert_eq!(allocator.ready_pools(), &[backend.set_pool(c).unwrap()]);
    assert_eq!(allocator.growth_target(), 4);

    allocator.teardown(&mut backend);
}

#[test]
fn test_growth_is_capped() {
    let mut backend = MockBackend::new();
    let layout = uniform_layout(&mut backend);
    let config = AllocatorConfig {
        growth_factor: 2.0,
        max_sets_per_pool: 5,
        ..AllocatorConfig::with_initial_sets(4)
    };
    let mut allocator = PoolAllocator::new(&mut backend, config).unwrap();
    assert_eq!(allocator.growth_target(), 5);

    for _ in 0..(4 + 5 + 5) {
        allocator.allocate(&mut backend, layout).unwrap();
    }

    assert_eq!(backend.created_pool_sizes(), &[4, 5, 5]);
    assert_eq!(allocator.growth_target(), 5);

    allocator.teardown(&mut backend);
}

#[test]
fn test_growth_factor_one_still_grows() {
    let mut backend = MockBackend::new();
    let config = AllocatorConfig { growth_factor: 1.0, ..AllocatorConfig::with_initial_sets(3) };
    let mut allocator = PoolAllocator::new(&mut backend, config).unwrap();
    assert_eq!(allocator.growth_target(), 4);
    allocator.teardown(&mut backend);
}

#[test]
fn test_non_exhaustion_error_is_not_retried() {
    let mut backend = MockBackend::new();
    let layout = uniform_layout(&mut backend);
    let mut allocator = PoolAllocator::new(&mut backend, AllocatorConfig::with_initial_sets(2)).unwrap();

    backend.fail_next_allocation(Error::OutOfMemory);
    assert_eq!(allocator.allocate(&mut backend, layout), Err(Error::OutOfMemory));

    assert_eq!(allocate_calls(&backend), 1);
    assert_eq!(backend.created_pool_sizes(), &[2]);
    assert_eq!(allocator.ready_pools().len(), 1);
    assert!(allocator.exhausted_pools().is_empty());

    // The pool is still usable
    assert!(allocator.allocate(&mut backend, layout).is_ok());

    allocator.teardown(&mut backend);
}

#[test]
fn test_second_exhaustion_is_fatal() {
    let mut backend = MockBackend::new();
    let layout = uniform_layout(&mut backend);
    let mut allocator = PoolAllocator::new(&mut backend, AllocatorConfig::with_initial_sets(2)).unwrap();

    backend.fail_next_allocation(Error::PoolExhausted("fragmented".to_string()));
    backend.fail_next_allocation(Error::PoolExhausted("fragmented".to_string()));

    let err = allocator.allocate(&mut backend, layout).unwrap_err();
    assert!(matches!(err, Error::BackendError(_)));
    assert!(!err.is_exhaustion());

    assert_eq!(allocate_calls(&backend), 2);
    assert_eq!(allocator.exhausted_pools().len(), 2);
    assert!(allocator.ready_pools().is_empty());

    allocator.teardown(&mut backend);
}

#[test]
fn test_retry_failure_outside_exhaustion_propagates() {
    let mut backend = MockBackend::new();
    let layout = uniform_layout(&mut backend);
    let mut allocator = PoolAllocator::new(&mut backend, AllocatorConfig::with_initial_sets(2)).unwrap();

    backend.fail_next_allocation(Error::PoolExhausted("full".to_string()));
    backend.fail_next_allocation(Error::BackendError("device lost".to_string()));

    assert_eq!(
        allocator.allocate(&mut backend, layout),
        Err(Error::BackendError("device lost".to_string()))
    );
    assert_eq!(allocator.exhausted_pools().len(), 1);
    assert_eq!(allocator.ready_pools().len(), 1);

    allocator.teardown(&mut backend);
}

// ============================================================================
// Reset
// ============================================================================

#[test]
fn test_reset_recovers_exhausted_pools() {
    let mut backend = MockBackend::new();
    let layout = uniform_layout(&mut backend);
    let mut allocator = PoolAllocator::new(&mut backend, AllocatorConfig::with_initial_sets(2)).unwrap();

    let first = allocator.allocate(&mut backend, layout).unwrap();
    allocator.allocate(&mut backend, layout).unwrap();
    allocator.allocate(&mut backend, layout).unwrap();
    let first_pool = backend.set_pool(first).unwrap();

    allocator.reset(&mut backend).unwrap();

    assert!(allocator.exhausted_pools().is_empty());
    assert_eq!(allocator.ready_pools().len(), 2);
    assert_eq!(allocator.ready_pools().last(), Some(&first_pool));
    for &pool in allocator.ready_pools() {
        assert_eq!(backend.pool_stats(pool).unwrap().allocated_sets, 0);
        assert_eq!(backend.pool_stats(pool).unwrap().resets, 1);
    }
    assert_eq!(backend.live_set_count(), 0);

    // Recovered capacity is reused before any new pool is created
    for _ in 0..5 {
        allocator.allocate(&mut backend, layout).unwrap();
    }
    assert_eq!(backend.created_pool_sizes(), &[2, 3]);

    allocator.teardown(&mut backend);
}

#[test]
fn test_reset_without_allocations_is_harmless() {
    let mut backend = MockBackend::new();
    let mut allocator = PoolAllocator::new(&mut backend, AllocatorConfig::with_initial_sets(4)).unwrap();
    allocator.reset(&mut backend).unwrap();
    allocator.reset(&mut backend).unwrap();
    assert_eq!(allocator.pool_count(), 1);
    allocator.teardown(&mut backend);
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn test_teardown_destroys_every_pool() {
    let mut backend = MockBackend::new();
    let layout = uniform_layout(&mut backend);
    let mut allocator = PoolAllocator::new(&mut backend, AllocatorConfig::with_initial_sets(1)).unwrap();

    for _ in 0..4 {
        allocator.allocate(&mut backend, layout).unwrap();
    }
    assert!(backend.live_pool_count() > 1);

    allocator.teardown(&mut backend);
    assert_eq!(backend.live_pool_count(), 0);
    assert_eq!(allocator.pool_count(), 0);
    assert_eq!(backend.live_set_count(), 0);
}
