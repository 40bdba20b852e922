/// Global binding state - composition root of the binding layer.
///
/// Owns the backend, the pool allocators, the resource registry, the layout
/// cache and the table of named binding sets. It is an ordinary value:
/// construct one per device and pass it by reference.
///
/// Named sets are write-once by key. They are allocated from the
/// persistent allocator, which is never reset, and live until
/// [`teardown`](GlobalBindingState::teardown). Per-frame copies of a named
/// set come from the transient allocator and are recycled by
/// [`reset_transient`](GlobalBindingState::reset_transient).

use rustc_hash::FxHashMap;

use crate::backend::{BindingBackend, BufferDesc, ImageDesc, SlotWrite};
use crate::binding::{
    validate_binding, AllocatorConfig, BindingDesc, BindingSetBuilder, BindingTarget, Blueprint,
    LayoutCache, PoolAllocator,
};
use crate::error::Result;
use crate::resource::{BufferHandle, ImageHandle, MappedBuffer, RegistryConfig, ResourceRegistry};
use crate::{bind_bail, bind_debug, bind_err, bind_info};

const SOURCE: &str = "galaxy3d::GlobalBindingState";

// ============================================================================
// Configuration
// ============================================================================

/// Binding state configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BindingStateConfig {
    /// Allocator for named sets (never reset)
    pub persistent: AllocatorConfig,
    /// Allocator for per-frame sets (reset by `reset_transient`)
    pub transient: AllocatorConfig,
    pub registry: RegistryConfig,
}

impl Default for BindingStateConfig {
    fn default() -> Self {
        Self {
            persistent: AllocatorConfig::default(),
            transient: AllocatorConfig::with_initial_sets(64),
            registry: RegistryConfig::default(),
        }
    }
}

// ============================================================================
// Named binding set
// ============================================================================

/// A realized binding set registered under a key
pub struct NamedBindingSet<B: BindingBackend> {
    layout: B::Layout,
    set: B::Set,
    blueprint: Blueprint,
}

impl<B: BindingBackend> NamedBindingSet<B> {
    pub fn layout(&self) -> B::Layout {
        self.layout
    }

    pub fn set(&self) -> B::Set {
        self.set
    }

    /// Blueprint the set was built from
    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    /// What `slot` is bound to
    pub fn slot(&self, slot: u32) -> Option<BindingTarget> {
        self.blueprint.binding(slot).map(|b| b.target)
    }

    pub fn slot_count(&self) -> usize {
        self.blueprint.len()
    }
}

// ============================================================================
// Global binding state
// ============================================================================

pub struct GlobalBindingState<B: BindingBackend> {
    backend: B,
    persistent: PoolAllocator<B>,
    transient: PoolAllocator<B>,
    registry: ResourceRegistry<B>,
    layouts: LayoutCache<B>,
    sets: FxHashMap<String, NamedBindingSet<B>>,
}

impl<B: BindingBackend> GlobalBindingState<B> {
    /// Take ownership of `backend` and create the first pool of each allocator
    pub fn new(mut backend: B, config: BindingStateConfig) -> Result<Self> {
        let mut persistent = PoolAllocator::new(&mut backend, config.persistent)?;
        let transient = match PoolAllocator::new(&mut backend, config.transient) {
            Ok(transient) => transient,
            Err(err) => {
                persistent.teardown(&mut backend);
                return Err(err);
            }
        };

        bind_info!(SOURCE, "Binding state initialized");
        Ok(Self {
            backend,
            persistent,
            transient,
            registry: ResourceRegistry::new(config.registry),
            layouts: LayoutCache::new(),
            sets: FxHashMap::default(),
        })
    }

    // ===== BUILDING =====

    /// New builder validating handles against this state's registry
    pub fn begin_build(&self) -> BindingSetBuilder<'_, B> {
        BindingSetBuilder::new(&self.registry)
    }

    /// New builder that may also create the buffers it binds
    /// (see [`BindingSetBuilder::add_create_buffer_binding`])
    pub fn begin_build_mut(&mut self) -> BindingSetBuilder<'_, B> {
        BindingSetBuilder::with_backend(&mut self.registry, &mut self.backend)
    }

    /// Realize `blueprint` and register it under `key`.
    ///
    /// Fails with `DuplicateKey` if `key` is taken (the existing set is left
    /// untouched) and `NotFound`/`TypeMismatch` if a bound resource was
    /// destroyed or no longer fits its slot.
    pub fn build(&mut self, key: &str, blueprint: &Blueprint) -> Result<&NamedBindingSet<B>> {
        if self.sets.contains_key(key) {
            bind_bail!(DuplicateKey, SOURCE, "Binding set '{}' already exists", key);
        }
        for binding in blueprint.bindings() {
            validate_binding(&self.registry, binding)?;
        }

        let layout = self.layouts.get_or_create(&mut self.backend, &blueprint.layout_desc())?;
        let set = self.persistent.allocate(&mut self.backend, layout)?;
        write_slots(&mut self.backend, &self.registry, set, blueprint.bindings())?;

        bind_info!(SOURCE, "Built binding set '{}' ({} slots)", key, blueprint.len());
        let named = NamedBindingSet { layout, set, blueprint: blueprint.clone() };
        Ok(&*self.sets.entry(key.to_string()).or_insert(named))
    }

    // ===== LOOKUPS =====

    pub fn get(&self, key: &str) -> Result<&NamedBindingSet<B>> {
        self.sets.get(key)
            .ok_or_else(|| bind_err!(NotFound, SOURCE, "Binding set '{}' has not been built", key))
    }

    /// Layout of the set registered under `key`
    pub fn get_layout(&self, key: &str) -> Result<B::Layout> {
        self.get(key).map(NamedBindingSet::layout)
    }

    /// Set registered under `key`
    pub fn get_set(&self, key: &str) -> Result<B::Set> {
        self.get(key).map(NamedBindingSet::set)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sets.contains_key(key)
    }

    /// Keys of every built set, in no particular order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    // ===== PER-FRAME UPDATES =====

    /// Copy `data` to the start of the buffer bound at `slot` of `key`.
    ///
    /// Fails with `NotFound` for an unbuilt key or unknown slot,
    /// `TypeMismatch` if the slot holds an image and `InvalidResource` if
    /// `data` is larger than the buffer.
    pub fn write(&mut self, key: &str, slot: u32, data: &[u8]) -> Result<()> {
        let named = self.sets.get(key)
            .ok_or_else(|| bind_err!(NotFound, SOURCE, "Binding set '{}' has not been built", key))?;
        let handle = match named.slot(slot) {
            Some(BindingTarget::Buffer(handle)) => handle,
            Some(BindingTarget::Image(handle, _)) => bind_bail!(TypeMismatch, SOURCE,
                "Slot {} of '{}' is bound to {}, not a buffer", slot, key, handle),
            None => bind_bail!(NotFound, SOURCE,
                "Binding set '{}' has no slot {} ({} slots)", key, slot, named.slot_count()),
        };

        self.registry.write_buffer(&mut self.backend, handle, data)
    }

    /// [`write`](Self::write) for plain-old-data values
    pub fn write_pod<T: bytemuck::Pod>(&mut self, key: &str, slot: u32, value: &T) -> Result<()> {
        self.write(key, slot, bytemuck::bytes_of(value))
    }

    /// Allocate a per-frame copy of the set registered under `key`.
    ///
    /// The copy shares the layout and points at the same resources. It stays
    /// valid until the next [`reset_transient`](Self::reset_transient).
    pub fn allocate_transient(&mut self, key: &str) -> Result<B::Set> {
        let named = self.sets.get(key)
            .ok_or_else(|| bind_err!(NotFound, SOURCE, "Binding set '{}' has not been built", key))?;
        for binding in named.blueprint.bindings() {
            validate_binding(&self.registry, binding)?;
        }

        let set = self.transient.allocate(&mut self.backend, named.layout)?;
        write_slots(&mut self.backend, &self.registry, set, named.blueprint.bindings())?;
        Ok(set)
    }

    /// Recycle every transient set.
    ///
    /// Call once per frame, after waiting for the GPU work that read them.
    pub fn reset_transient(&mut self) -> Result<()> {
        self.transient.reset(&mut self.backend)
    }

    // ===== RESOURCES =====

    pub fn create_buffer(&mut self, desc: BufferDesc) -> Result<BufferHandle> {
        self.registry.create_buffer(&mut self.backend, desc)
    }

    pub fn create_image_with_view(&mut self, desc: ImageDesc) -> Result<ImageHandle> {
        self.registry.create_image_with_view(&mut self.backend, desc)
    }

    /// Destroy a buffer that no named set is bound to
    pub fn destroy_buffer(&mut self, handle: BufferHandle) -> Result<()> {
        if let Some(key) = self.bound_by(|target| *target == BindingTarget::Buffer(handle)) {
            bind_bail!(InvalidResource, SOURCE, "{} is still bound by binding set '{}'", handle, key);
        }
        self.registry.destroy_buffer(&mut self.backend, handle)
    }

    /// Destroy an image that no named set is bound to
    pub fn destroy_image(&mut self, handle: ImageHandle) -> Result<()> {
        if let Some(key) = self.bound_by(|target| matches!(target, BindingTarget::Image(h, _) if *h == handle)) {
            bind_bail!(InvalidResource, SOURCE, "{} is still bound by binding set '{}'", handle, key);
        }
        self.registry.destroy_image(&mut self.backend, handle)
    }

    /// Key of a named set with a slot matching `uses`
    fn bound_by(&self, uses: impl Fn(&BindingTarget) -> bool) -> Option<&str> {
        self.sets
            .iter()
            .find(|(_, named)| named.blueprint.bindings().iter().any(|b| uses(&b.target)))
            .map(|(key, _)| key.as_str())
    }

    /// Map a host-visible buffer; see [`ResourceRegistry::map_for_write`]
    pub fn map_for_write(&mut self, handle: BufferHandle) -> Result<MappedBuffer<'_, B>> {
        self.registry.map_for_write(&mut self.backend, handle)
    }

    pub fn registry(&self) -> &ResourceRegistry<B> {
        &self.registry
    }

    // ===== BACKEND =====

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn persistent_allocator(&self) -> &PoolAllocator<B> {
        &self.persistent
    }

    pub fn transient_allocator(&self) -> &PoolAllocator<B> {
        &self.transient
    }

    pub fn layout_cache(&self) -> &LayoutCache<B> {
        &self.layouts
    }

    // ===== LIFETIME =====

    /// Release every set, pool, layout and resource.
    ///
    /// The caller must have waited for the GPU to go idle. Called by `Drop`;
    /// calling it twice is harmless.
    pub fn teardown(&mut self) {
        let sets = self.sets.len();
        self.sets.clear();
        self.transient.teardown(&mut self.backend);
        self.persistent.teardown(&mut self.backend);
        self.layouts.teardown(&mut self.backend);
        self.registry.teardown(&mut self.backend);
        if sets > 0 {
            bind_debug!(SOURCE, "Released {} named binding set(s)", sets);
        }
    }
}

impl<B: BindingBackend> Drop for GlobalBindingState<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Point every slot of `set` at the current resource behind its handle
fn write_slots<B: BindingBackend>(
    backend: &mut B,
    registry: &ResourceRegistry<B>,
    set: B::Set,
    bindings: &[BindingDesc],
) -> Result<()> {
    if bindings.is_empty() {
        return Ok(());
    }

    let mut writes = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let write = match binding.target {
            BindingTarget::Buffer(handle) => {
                let buffer = registry.buffer(handle)?;
                SlotWrite::Buffer {
                    binding: binding.slot,
                    descriptor_type: binding.descriptor_type,
                    buffer: buffer.raw(),
                    range: buffer.size(),
                }
            }
            BindingTarget::Image(handle, layout) => SlotWrite::Image {
                binding: binding.slot,
                descriptor_type: binding.descriptor_type,
                image: registry.image(handle)?.raw(),
                layout,
            },
        };
        writes.push(write);
    }
    backend.write_set(set, &writes)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "binding_state_tests.rs"]
mod tests;
