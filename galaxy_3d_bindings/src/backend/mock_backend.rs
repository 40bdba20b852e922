/// Mock backend for tests (no GPU required)
///
/// Models descriptor pools with a set limit and per-type descriptor budgets,
/// so pool exhaustion happens exactly where a real driver would report
/// out-of-pool-memory. Failures can also be injected to exercise the fatal
/// paths. Buffers are plain byte vectors, always host-mappable unless
/// created with `MemoryKind::GpuOnly`.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::backend::{
    BindingBackend, BufferDesc, DescriptorType, ImageDesc, LayoutDesc, PoolSizeRatio, SlotWrite,
};
use crate::bind_bail;
use crate::error::{Error, Result};

// ============================================================================
// Handles
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockPool(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockSet(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockLayout(u64);

// ============================================================================
// Resources
// ============================================================================

/// CPU-side stand-in for a GPU buffer
#[derive(Debug)]
pub struct MockBuffer {
    pub id: u64,
    pub desc: BufferDesc,
    data: Vec<u8>,
    mapped: bool,
}

impl MockBuffer {
    /// Current contents (what the GPU would read)
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped
    }
}

/// CPU-side stand-in for an image + view + sampler
#[derive(Debug)]
pub struct MockImage {
    pub id: u64,
    pub desc: ImageDesc,
}

/// What a set slot currently points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockSlot {
    Buffer { id: u64, descriptor_type: DescriptorType, range: u64 },
    Image { id: u64, descriptor_type: DescriptorType },
}

/// Snapshot of one pool's bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPoolStats {
    pub max_sets: u32,
    pub allocated_sets: u32,
    pub resets: u32,
}

struct PoolState {
    max_sets: u32,
    capacity: Vec<(DescriptorType, u32)>,
    remaining: Vec<(DescriptorType, u32)>,
    sets: Vec<MockSet>,
    resets: u32,
}

struct SetState {
    pool: MockPool,
    slots: FxHashMap<u32, MockSlot>,
}

// ============================================================================
// Mock Backend
// ============================================================================

/// In-memory [`BindingBackend`]
#[derive(Default)]
pub struct MockBackend {
    next_id: u64,
    pools: FxHashMap<MockPool, PoolState>,
    layouts: FxHashMap<MockLayout, LayoutDesc>,
    sets: FxHashMap<MockSet, SetState>,
    live_buffers: u32,
    live_images: u32,
    map_count: u32,
    unmap_count: u32,
    created_pool_sizes: Vec<u32>,
    injected_failures: VecDeque<Error>,
    /// Call log, one entry per backend call
    pub commands: Vec<String>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Make the next `allocate_set` call fail with `error`.
    ///
    /// Calls queue up: each injected error is consumed by one allocation.
    pub fn fail_next_allocation(&mut self, error: Error) {
        self.injected_failures.push_back(error);
    }

    pub fn pool_stats(&self, pool: MockPool) -> Option<MockPoolStats> {
        self.pools.get(&pool).map(|p| MockPoolStats {
            max_sets: p.max_sets,
            allocated_sets: p.sets.len() as u32,
            resets: p.resets,
        })
    }

    /// Pool a live set was allocated from
    pub fn set_pool(&self, set: MockSet) -> Option<MockPool> {
        self.sets.get(&set).map(|s| s.pool)
    }

    /// What `binding` of `set` currently points at
    pub fn slot(&self, set: MockSet, binding: u32) -> Option<MockSlot> {
        self.sets.get(&set).and_then(|s| s.slots.get(&binding).copied())
    }

    pub fn is_set_live(&self, set: MockSet) -> bool {
        self.sets.contains_key(&set)
    }

    pub fn layout_desc(&self, layout: MockLayout) -> Option<&LayoutDesc> {
        self.layouts.get(&layout)
    }

    /// `max_sets` of every pool ever created, in creation order
    pub fn created_pool_sizes(&self) -> &[u32] {
        &self.created_pool_sizes
    }

    pub fn live_pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn live_layout_count(&self) -> usize {
        self.layouts.len()
    }

    pub fn live_set_count(&self) -> usize {
        self.sets.len()
    }

    pub fn live_buffer_count(&self) -> u32 {
        self.live_buffers
    }

    pub fn live_image_count(&self) -> u32 {
        self.live_images
    }

    pub fn map_count(&self) -> u32 {
        self.map_count
    }

    pub fn unmap_count(&self) -> u32 {
        self.unmap_count
    }
}

impl BindingBackend for MockBackend {
    type Pool = MockPool;
    type Set = MockSet;
    type Layout = MockLayout;
    type Buffer = MockBuffer;
    type Image = MockImage;

    fn create_pool(&mut self, max_sets: u32, ratios: &[PoolSizeRatio]) -> Result<MockPool> {
        if max_sets == 0 {
            bind_bail!(InvalidResource, "galaxy3d::MockBackend", "pool with zero sets");
        }
        let capacity: Vec<(DescriptorType, u32)> = ratios
            .iter()
            .map(|r| (r.descriptor_type, r.descriptor_count(max_sets)))
            .collect();
        let pool = MockPool(self.next_id());
        self.pools.insert(pool, PoolState {
            max_sets,
            remaining: capacity.clone(),
            capacity,
            sets: Vec::new(),
            resets: 0,
        });
        self.created_pool_sizes.push(max_sets);
        self.commands.push(format!("create_pool({})", max_sets));
        Ok(pool)
    }

    fn reset_pool(&mut self, pool: MockPool) -> Result<()> {
        let Some(state) = self.pools.get_mut(&pool) else {
            bind_bail!(BackendError, "galaxy3d::MockBackend", "reset of unknown pool {:?}", pool);
        };
        for set in state.sets.drain(..) {
            self.sets.remove(&set);
        }
        state.remaining = state.capacity.clone();
        state.resets += 1;
        self.commands.push("reset_pool".to_string());
        Ok(())
    }

    fn destroy_pool(&mut self, pool: MockPool) {
        if let Some(state) = self.pools.remove(&pool) {
            for set in state.sets {
                self.sets.remove(&set);
            }
        }
        self.commands.push("destroy_pool".to_string());
    }

    fn create_layout(&mut self, desc: &LayoutDesc) -> Result<MockLayout> {
        let layout = MockLayout(self.next_id());
        self.layouts.insert(layout, desc.clone());
        self.commands.push(format!("create_layout({} entries)", desc.entries.len()));
        Ok(layout)
    }

    fn destroy_layout(&mut self, layout: MockLayout) {
        self.layouts.remove(&layout);
        self.commands.push("destroy_layout".to_string());
    }

    fn allocate_set(&mut self, pool: MockPool, layout: MockLayout) -> Result<MockSet> {
        self.commands.push("allocate_set".to_string());
        if let Some(error) = self.injected_failures.pop_front() {
            return Err(error);
        }

        let Some(desc) = self.layouts.get(&layout) else {
            bind_bail!(BackendError, "galaxy3d::MockBackend", "unknown layout {:?}", layout);
        };
        let needed = desc.descriptor_counts();
        let Some(state) = self.pools.get_mut(&pool) else {
            bind_bail!(BackendError, "galaxy3d::MockBackend", "unknown pool {:?}", pool);
        };

        if state.sets.len() as u32 >= state.max_sets {
            return Err(Error::PoolExhausted(format!(
                "pool {:?} holds its maximum of {} sets", pool, state.max_sets
            )));
        }
        for (ty, count) in &needed {
            let available = state
                .remaining
                .iter()
                .find(|(t, _)| t == ty)
                .map_or(0, |(_, n)| *n);
            if available < *count {
                return Err(Error::PoolExhausted(format!(
                    "pool {:?} has {} {:?} descriptors left, {} needed", pool, available, ty, count
                )));
            }
        }
        for (ty, count) in &needed {
            if let Some((_, n)) = state.remaining.iter_mut().find(|(t, _)| t == ty) {
                *n -= count;
            }
        }

        self.next_id += 1;
        let set = MockSet(self.next_id);
        state.sets.push(set);
        self.sets.insert(set, SetState { pool, slots: FxHashMap::default() });
        Ok(set)
    }

    fn write_set(&mut self, set: MockSet, writes: &[SlotWrite<'_, Self>]) -> Result<()> {
        let Some(state) = self.sets.get_mut(&set) else {
            bind_bail!(BackendError, "galaxy3d::MockBackend", "write to freed set {:?}", set);
        };
        for write in writes {
            let slot = match write {
                SlotWrite::Buffer { descriptor_type, buffer, range, .. } => MockSlot::Buffer {
                    id: buffer.id,
                    descriptor_type: *descriptor_type,
                    range: *range,
                },
                SlotWrite::Image { descriptor_type, image, .. } => MockSlot::Image {
                    id: image.id,
                    descriptor_type: *descriptor_type,
                },
            };
            state.slots.insert(write.binding(), slot);
        }
        self.commands.push(format!("write_set({} writes)", writes.len()));
        Ok(())
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<MockBuffer> {
        let id = self.next_id();
        self.live_buffers += 1;
        self.commands.push(format!("create_buffer({})", desc.size));
        Ok(MockBuffer {
            id,
            desc: *desc,
            data: vec![0; desc.size as usize],
            mapped: false,
        })
    }

    fn destroy_buffer(&mut self, _buffer: MockBuffer) {
        self.live_buffers -= 1;
        self.commands.push("destroy_buffer".to_string());
    }

    fn create_image(&mut self, desc: &ImageDesc) -> Result<MockImage> {
        let id = self.next_id();
        self.live_images += 1;
        self.commands.push("create_image".to_string());
        Ok(MockImage { id, desc: *desc })
    }

    fn destroy_image(&mut self, _image: MockImage) {
        self.live_images -= 1;
        self.commands.push("destroy_image".to_string());
    }

    fn map_buffer(&mut self, buffer: &mut MockBuffer) -> Result<()> {
        if !buffer.desc.memory.is_host_visible() {
            bind_bail!(BackendError, "galaxy3d::MockBackend",
                "buffer {} is not CPU-accessible", buffer.id);
        }
        if buffer.mapped {
            bind_bail!(BackendError, "galaxy3d::MockBackend", "buffer {} is already mapped", buffer.id);
        }
        buffer.mapped = true;
        self.map_count += 1;
        Ok(())
    }

    fn mapped_slice<'b>(&self, buffer: &'b MockBuffer) -> &'b [u8] {
        if buffer.mapped { buffer.data.as_slice() } else { &[] }
    }

    fn mapped_slice_mut<'b>(&self, buffer: &'b mut MockBuffer) -> &'b mut [u8] {
        if buffer.mapped { buffer.data.as_mut_slice() } else { &mut [] }
    }

    fn unmap_buffer(&mut self, buffer: &mut MockBuffer) {
        buffer.mapped = false;
        self.unmap_count += 1;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "mock_backend_tests.rs"]
mod tests;
