/// Growable descriptor pool allocator.
///
/// Hands out binding sets from a working set of backend pools:
/// - pools live in exactly one of two lists, *ready* or *exhausted*
/// - the most recently used ready pool is tried first
/// - an exhaustion-class failure parks the pool in *exhausted* and the
///   allocation is retried once against a fresh pool; each fresh pool is
///   `growth_factor` times larger than the previous one, up to
///   `max_sets_per_pool`
/// - `reset()` empties every pool and makes them all ready again
///
/// Pools are only destroyed by `teardown()`.

use crate::backend::{BindingBackend, DescriptorType, PoolSizeRatio};
use crate::error::Result;
use crate::{bind_bail, bind_debug, bind_err, bind_error, bind_info, bind_warn};

const SOURCE: &str = "galaxy3d::PoolAllocator";

/// Pool allocator configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AllocatorConfig {
    /// Sets in the first pool
    pub initial_sets: u32,
    /// Size multiplier applied to every new pool
    pub growth_factor: f32,
    /// Ceiling on the number of sets in a single pool
    pub max_sets_per_pool: u32,
    /// Per-type descriptor budget of a pool, relative to its set count
    pub pool_ratios: Vec<PoolSizeRatio>,
}

impl AllocatorConfig {
    /// Default ratios with a custom first pool size
    pub fn with_initial_sets(initial_sets: u32) -> Self {
        Self {
            initial_sets,
            ..Self::default()
        }
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            initial_sets: 16,
            growth_factor: 1.5,
            max_sets_per_pool: 4096,
            pool_ratios: vec![
                PoolSizeRatio::new(DescriptorType::UniformBuffer, 1.0),
                PoolSizeRatio::new(DescriptorType::StorageBuffer, 1.0),
                PoolSizeRatio::new(DescriptorType::UniformBufferDynamic, 0.5),
                PoolSizeRatio::new(DescriptorType::StorageBufferDynamic, 0.5),
                PoolSizeRatio::new(DescriptorType::CombinedImageSampler, 1.0),
                PoolSizeRatio::new(DescriptorType::SampledImage, 0.5),
                PoolSizeRatio::new(DescriptorType::StorageImage, 0.5),
            ],
        }
    }
}

/// Allocates binding sets from a growing set of backend pools
pub struct PoolAllocator<B: BindingBackend> {
    config: AllocatorConfig,
    ready: Vec<B::Pool>,
    exhausted: Vec<B::Pool>,
    growth_target: u32,
}

impl<B: BindingBackend> PoolAllocator<B> {
    /// Create the allocator and its first pool of `config.initial_sets` sets
    pub fn new(backend: &mut B, config: AllocatorConfig) -> Result<Self> {
        if config.initial_sets == 0 {
            bind_bail!(InitializationFailed, SOURCE, "initial_sets must be at least 1");
        }
        if config.growth_factor.is_nan() || config.growth_factor < 1.0 {
            bind_bail!(InitializationFailed, SOURCE,
                "growth_factor must be >= 1.0 (got {})", config.growth_factor);
        }
        if config.max_sets_per_pool < config.initial_sets {
            bind_bail!(InitializationFailed, SOURCE,
                "max_sets_per_pool ({}) is below initial_sets ({})",
                config.max_sets_per_pool, config.initial_sets);
        }
        if config.pool_ratios.is_empty() {
            bind_bail!(InitializationFailed, SOURCE, "pool_ratios must not be empty");
        }

        let pool = backend.create_pool(config.initial_sets, &config.pool_ratios)?;
        let mut allocator = Self {
            growth_target: config.initial_sets,
            config,
            ready: vec![pool],
            exhausted: Vec::new(),
        };
        allocator.growth_target = allocator.grown(allocator.growth_target);

        bind_debug!(SOURCE, "Created initial pool with {} sets (next pool: {} sets)",
            allocator.config.initial_sets, allocator.growth_target);
        Ok(allocator)
    }

    /// Next pool size after `sets`, clamped to the ceiling.
    ///
    /// Always grows by at least one set until the ceiling is reached.
    fn grown(&self, sets: u32) -> u32 {
        let scaled = (sets as f64 * self.config.growth_factor as f64) as u64;
        let scaled = scaled.max(sets as u64 + 1);
        scaled.min(self.config.max_sets_per_pool as u64) as u32
    }

    /// Most recently used ready pool, or a new one of `growth_target` sets
    fn take_pool(&mut self, backend: &mut B) -> Result<B::Pool> {
        if let Some(pool) = self.ready.pop() {
            return Ok(pool);
        }

        let sets = self.growth_target;
        let pool = backend.create_pool(sets, &self.config.pool_ratios)?;
        self.growth_target = self.grown(sets);

        bind_info!(SOURCE, "Created new pool with {} sets (total: {}, next: {})",
            sets, self.pool_count() + 1, self.growth_target);
        Ok(pool)
    }

    /// Allocate one set of `layout`.
    ///
    /// An exhaustion-class failure is retried exactly once against another
    /// pool. A second failure of any kind, or a first failure that is not
    /// exhaustion, is returned as fatal.
    pub fn allocate(&mut self, backend: &mut B, layout: B::Layout) -> Result<B::Set> {
        let pool = self.take_pool(backend)?;

        match backend.allocate_set(pool, layout) {
            Ok(set) => {
                self.ready.push(pool);
                Ok(set)
            }
            Err(err) if err.is_exhaustion() => {
                bind_debug!(SOURCE, "Pool {:?} exhausted ({}), retrying", pool, err);
                self.exhausted.push(pool);

                let retry_pool = self.take_pool(backend)?;
                match backend.allocate_set(retry_pool, layout) {
                    Ok(set) => {
                        self.ready.push(retry_pool);
                        Ok(set)
                    }
                    Err(retry_err) if retry_err.is_exhaustion() => {
                        self.exhausted.push(retry_pool);
                        Err(bind_err!(BackendError, SOURCE,
                            "Failed to allocate binding set after pool growth: {}", retry_err))
                    }
                    Err(retry_err) => {
                        self.ready.push(retry_pool);
                        bind_error!(SOURCE, "Failed to allocate binding set after pool growth: {}", retry_err);
                        Err(retry_err)
                    }
                }
            }
            Err(err) => {
                self.ready.push(pool);
                bind_error!(SOURCE, "Failed to allocate binding set: {}", err);
                Err(err)
            }
        }
    }

    /// Empty every pool and move exhausted pools back to ready.
    ///
    /// The caller must have waited for all GPU work reading sets from these
    /// pools. Sets previously allocated become invalid.
    pub fn reset(&mut self, backend: &mut B) -> Result<()> {
        for &pool in &self.ready {
            backend.reset_pool(pool)?;
        }

        let pending = std::mem::take(&mut self.exhausted);
        for (i, &pool) in pending.iter().enumerate() {
            if let Err(err) = backend.reset_pool(pool) {
                self.exhausted.extend_from_slice(&pending[i..]);
                return Err(err);
            }
            self.ready.push(pool);
        }

        if !pending.is_empty() {
            bind_debug!(SOURCE, "Reset recovered {} exhausted pool(s)", pending.len());
        }
        Ok(())
    }

    /// Destroy every pool
    pub fn teardown(&mut self, backend: &mut B) {
        let count = self.pool_count();
        for pool in self.ready.drain(..).chain(self.exhausted.drain(..)) {
            backend.destroy_pool(pool);
        }
        if count > 0 {
            bind_debug!(SOURCE, "Destroyed {} pool(s)", count);
        }
    }

    pub fn ready_pools(&self) -> &[B::Pool] {
        &self.ready
    }

    pub fn exhausted_pools(&self) -> &[B::Pool] {
        &self.exhausted
    }

    pub fn pool_count(&self) -> usize {
        self.ready.len() + self.exhausted.len()
    }

    /// Size of the next pool to be created
    pub fn growth_target(&self) -> u32 {
        self.growth_target
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }
}

impl<B: BindingBackend> Drop for PoolAllocator<B> {
    fn drop(&mut self) {
        if self.pool_count() > 0 {
            bind_warn!(SOURCE, "Dropped with {} pool(s) still alive (missing teardown)", self.pool_count());
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "pool_allocator_tests.rs"]
mod tests;
