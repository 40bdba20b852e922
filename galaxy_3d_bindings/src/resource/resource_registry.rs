/// Resource registry - handle table for GPU buffers and images.
///
/// Callers never hold backend objects directly: they keep a
/// [`BufferHandle`] or [`ImageHandle`] and resolve it here when needed.
/// Destroying a resource erases its entry, so stale handles fail with
/// `Error::NotFound` instead of touching freed memory.
///
/// Handle values are monotonic unless [`RegistryConfig::recycle_handles`]
/// is set, in which case released values are reused (highest first).

use std::fmt;
use std::ops::{Deref, DerefMut};

use rustc_hash::FxHashMap;

use crate::backend::{
    BindingBackend, BufferDesc, BufferUsage, Extent3d, ImageDesc, ImageFormat, ImageUsage, MemoryKind,
};
use crate::error::Result;
use crate::utils::HandleAllocator;
use crate::{bind_bail, bind_debug, bind_err, bind_warn};

const SOURCE: &str = "galaxy3d::ResourceRegistry";

// ============================================================================
// Handles
// ============================================================================

/// Handle to a buffer owned by a [`ResourceRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(u32);

impl BufferHandle {
    pub fn id(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

/// Handle to an image owned by a [`ResourceRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageHandle(u32);

impl ImageHandle {
    pub fn id(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image#{}", self.0)
    }
}

// ============================================================================
// Resource records
// ============================================================================

/// Backend buffer plus the description it was created from
pub struct BufferResource<B: BindingBackend> {
    raw: B::Buffer,
    desc: BufferDesc,
}

impl<B: BindingBackend> BufferResource<B> {
    /// Backend buffer object
    pub fn raw(&self) -> &B::Buffer {
        &self.raw
    }

    pub fn desc(&self) -> &BufferDesc {
        &self.desc
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.desc.size
    }

    pub fn usage(&self) -> BufferUsage {
        self.desc.usage
    }

    pub fn memory(&self) -> MemoryKind {
        self.desc.memory
    }
}

/// Backend image (with its view and sampler) plus its description
pub struct ImageResource<B: BindingBackend> {
    raw: B::Image,
    desc: ImageDesc,
}

impl<B: BindingBackend> ImageResource<B> {
    pub fn raw(&self) -> &B::Image {
        &self.raw
    }

    pub fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    pub fn format(&self) -> ImageFormat {
        self.desc.format
    }

    pub fn usage(&self) -> ImageUsage {
        self.desc.usage
    }

    pub fn extent(&self) -> Extent3d {
        self.desc.extent
    }

    pub fn memory(&self) -> MemoryKind {
        self.desc.memory
    }
}

// ============================================================================
// Mapped buffer guard
// ============================================================================

/// Host-writable view of a buffer's memory.
///
/// Dereferences to the mapped bytes. The buffer is unmapped when the guard
/// is dropped, on every exit path.
pub struct MappedBuffer<'a, B: BindingBackend> {
    backend: &'a mut B,
    buffer: &'a mut B::Buffer,
}

impl<B: BindingBackend> Deref for MappedBuffer<'_, B> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.backend.mapped_slice(&*self.buffer)
    }
}

impl<B: BindingBackend> DerefMut for MappedBuffer<'_, B> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.backend.mapped_slice_mut(&mut *self.buffer)
    }
}

impl<B: BindingBackend> Drop for MappedBuffer<'_, B> {
    fn drop(&mut self) {
        self.backend.unmap_buffer(&mut *self.buffer);
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Registry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryConfig {
    /// Reuse the values of destroyed handles
    pub recycle_handles: bool,
}

/// Owns every buffer and image reachable from a binding set
pub struct ResourceRegistry<B: BindingBackend> {
    buffers: FxHashMap<BufferHandle, BufferResource<B>>,
    images: FxHashMap<ImageHandle, ImageResource<B>>,
    buffer_ids: HandleAllocator,
    image_ids: HandleAllocator,
}

impl<B: BindingBackend> ResourceRegistry<B> {
    pub fn new(config: RegistryConfig) -> Self {
        let ids = if config.recycle_handles {
            HandleAllocator::recycling
        } else {
            HandleAllocator::monotonic
        };
        Self {
            buffers: FxHashMap::default(),
            images: FxHashMap::default(),
            buffer_ids: ids(),
            image_ids: ids(),
        }
    }

    // ===== BUFFERS =====

    /// Create a buffer and register it
    pub fn create_buffer(&mut self, backend: &mut B, desc: BufferDesc) -> Result<BufferHandle> {
        if desc.size == 0 {
            bind_bail!(InvalidResource, SOURCE, "Cannot create a zero-sized buffer");
        }
        if desc.usage.is_empty() {
            bind_bail!(InvalidResource, SOURCE, "Buffer usage flags must not be empty");
        }

        let handle = BufferHandle(self.buffer_ids.alloc()?);
        let raw = match backend.create_buffer(&desc) {
            Ok(raw) => raw,
            Err(err) => {
                self.buffer_ids.free(handle.0);
                return Err(err);
            }
        };
        self.buffers.insert(handle, BufferResource { raw, desc });

        bind_debug!(SOURCE, "Created {} ({} bytes, {:?}, {:?})",
            handle, desc.size, desc.usage, desc.memory);
        Ok(handle)
    }

    /// Destroy a buffer and erase its entry
    pub fn destroy_buffer(&mut self, backend: &mut B, handle: BufferHandle) -> Result<()> {
        let resource = self.buffers.remove(&handle)
            .ok_or_else(|| bind_err!(NotFound, SOURCE, "Unknown buffer handle {}", handle))?;
        backend.destroy_buffer(resource.raw);
        self.buffer_ids.free(handle.0);
        bind_debug!(SOURCE, "Destroyed {}", handle);
        Ok(())
    }

    pub fn buffer(&self, handle: BufferHandle) -> Result<&BufferResource<B>> {
        self.buffers.get(&handle)
            .ok_or_else(|| bind_err!(NotFound, SOURCE, "Unknown buffer handle {}", handle))
    }

    pub fn contains_buffer(&self, handle: BufferHandle) -> bool {
        self.buffers.contains_key(&handle)
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Map a host-visible buffer for writing.
    ///
    /// The returned guard unmaps the buffer when dropped.
    pub fn map_for_write<'a>(
        &'a mut self,
        backend: &'a mut B,
        handle: BufferHandle,
    ) -> Result<MappedBuffer<'a, B>> {
        let Some(resource) = self.buffers.get_mut(&handle) else {
            bind_bail!(NotFound, SOURCE, "Unknown buffer handle {}", handle);
        };
        if !resource.desc.memory.is_host_visible() {
            bind_bail!(InvalidResource, SOURCE,
                "{} lives in {:?} memory and cannot be mapped", handle, resource.desc.memory);
        }

        backend.map_buffer(&mut resource.raw)?;
        Ok(MappedBuffer { backend, buffer: &mut resource.raw })
    }

    /// Copy `data` to the start of a host-visible buffer
    pub fn write_buffer(&mut self, backend: &mut B, handle: BufferHandle, data: &[u8]) -> Result<()> {
        let size = self.buffer(handle)?.size();
        if data.len() as u64 > size {
            bind_bail!(InvalidResource, SOURCE,
                "Write of {} bytes exceeds {} size ({} bytes)", data.len(), handle, size);
        }

        let mut mapped = self.map_for_write(backend, handle)?;
        mapped[..data.len()].copy_from_slice(data);
        Ok(())
    }

    // ===== IMAGES =====

    /// Create an image with its view and sampler and register it
    pub fn create_image_with_view(&mut self, backend: &mut B, desc: ImageDesc) -> Result<ImageHandle> {
        if desc.extent.is_empty() {
            bind_bail!(InvalidResource, SOURCE, "Image extent must be non-zero (got {:?})", desc.extent);
        }
        if desc.usage.is_empty() {
            bind_bail!(InvalidResource, SOURCE, "Image usage flags must not be empty");
        }

        let handle = ImageHandle(self.image_ids.alloc()?);
        let raw = match backend.create_image(&desc) {
            Ok(raw) => raw,
            Err(err) => {
                self.image_ids.free(handle.0);
                return Err(err);
            }
        };
        self.images.insert(handle, ImageResource { raw, desc });

        bind_debug!(SOURCE, "Created {} ({}x{}x{} {:?})",
            handle, desc.extent.width, desc.extent.height, desc.extent.depth, desc.format);
        Ok(handle)
    }

    /// Destroy an image (view and sampler included) and erase its entry
    pub fn destroy_image(&mut self, backend: &mut B, handle: ImageHandle) -> Result<()> {
        let resource = self.images.remove(&handle)
            .ok_or_else(|| bind_err!(NotFound, SOURCE, "Unknown image handle {}", handle))?;
        backend.destroy_image(resource.raw);
        self.image_ids.free(handle.0);
        bind_debug!(SOURCE, "Destroyed {}", handle);
        Ok(())
    }

    pub fn image(&self, handle: ImageHandle) -> Result<&ImageResource<B>> {
        self.images.get(&handle)
            .ok_or_else(|| bind_err!(NotFound, SOURCE, "Unknown image handle {}", handle))
    }

    pub fn contains_image(&self, handle: ImageHandle) -> bool {
        self.images.contains_key(&handle)
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    // ===== LIFETIME =====

    /// Destroy every remaining resource
    pub fn teardown(&mut self, backend: &mut B) {
        let buffers = self.buffers.len();
        let images = self.images.len();

        for (handle, resource) in self.buffers.drain() {
            backend.destroy_buffer(resource.raw);
            self.buffer_ids.free(handle.0);
        }
        for (handle, resource) in self.images.drain() {
            backend.destroy_image(resource.raw);
            self.image_ids.free(handle.0);
        }

        if buffers + images > 0 {
            bind_debug!(SOURCE, "Destroyed {} buffer(s) and {} image(s)", buffers, images);
        }
    }
}

impl<B: BindingBackend> Drop for ResourceRegistry<B> {
    fn drop(&mut self) {
        let alive = self.buffers.len() + self.images.len();
        if alive > 0 {
            bind_warn!(SOURCE, "Dropped with {} resource(s) still alive (missing teardown)", alive);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "resource_registry_tests.rs"]
mod tests;
