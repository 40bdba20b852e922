/// BindingBackend trait - contract with the graphics backend

use std::fmt;

use crate::backend::{BufferDesc, DescriptorType, ImageDesc, ImageLayout, LayoutDesc, PoolSizeRatio};
use crate::error::Result;

/// One slot of a binding set to (re)write.
///
/// Borrows the backend resource from the registry for the duration of
/// [`BindingBackend::write_set`].
pub enum SlotWrite<'a, B: BindingBackend> {
    Buffer {
        binding: u32,
        descriptor_type: DescriptorType,
        buffer: &'a B::Buffer,
        /// Bytes visible to the shader, starting at offset 0
        range: u64,
    },
    Image {
        binding: u32,
        descriptor_type: DescriptorType,
        image: &'a B::Image,
        layout: ImageLayout,
    },
}

impl<B: BindingBackend> SlotWrite<'_, B> {
    pub fn binding(&self) -> u32 {
        match self {
            SlotWrite::Buffer { binding, .. } | SlotWrite::Image { binding, .. } => *binding,
        }
    }

    pub fn descriptor_type(&self) -> DescriptorType {
        match self {
            SlotWrite::Buffer { descriptor_type, .. } | SlotWrite::Image { descriptor_type, .. } => *descriptor_type,
        }
    }
}

impl<B: BindingBackend> fmt::Debug for SlotWrite<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotWrite::Buffer { binding, descriptor_type, range, .. } => f
                .debug_struct("Buffer")
                .field("binding", binding)
                .field("descriptor_type", descriptor_type)
                .field("range", range)
                .finish(),
            SlotWrite::Image { binding, descriptor_type, layout, .. } => f
                .debug_struct("Image")
                .field("binding", binding)
                .field("descriptor_type", descriptor_type)
                .field("layout", layout)
                .finish(),
        }
    }
}

/// Graphics backend seen by the binding layer.
///
/// The binding layer only distinguishes three outcomes per call: success,
/// [`Error::PoolExhausted`](crate::galaxy3d::Error::PoolExhausted) from
/// [`allocate_set`](Self::allocate_set) (retried once by the pool
/// allocator), and any other error, which is fatal.
///
/// Pools, sets and layouts are plain copyable handles owned by the caller;
/// buffers and images are owned values handed back on destroy.
pub trait BindingBackend: Sized {
    /// Fixed-capacity arena binding sets are carved from
    type Pool: Copy + Eq + fmt::Debug;
    /// Realized binding set
    type Set: Copy + Eq + fmt::Debug;
    /// Binding set layout
    type Layout: Copy + Eq + fmt::Debug;
    /// Buffer with its backing allocation
    type Buffer;
    /// Image with its backing allocation, view and sampler
    type Image;

    /// Create a pool able to hold `max_sets` sets, sized per type by `ratios`
    fn create_pool(&mut self, max_sets: u32, ratios: &[PoolSizeRatio]) -> Result<Self::Pool>;

    /// Free every set allocated from the pool, keeping its capacity
    fn reset_pool(&mut self, pool: Self::Pool) -> Result<()>;

    fn destroy_pool(&mut self, pool: Self::Pool);

    fn create_layout(&mut self, desc: &LayoutDesc) -> Result<Self::Layout>;

    fn destroy_layout(&mut self, layout: Self::Layout);

    /// Allocate one set.
    ///
    /// Must return `Error::PoolExhausted` when the pool is out of space or
    /// too fragmented, and nothing else for those conditions.
    fn allocate_set(&mut self, pool: Self::Pool, layout: Self::Layout) -> Result<Self::Set>;

    /// Point the slots of `set` at the given resources
    fn write_set(&mut self, set: Self::Set, writes: &[SlotWrite<'_, Self>]) -> Result<()>;

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<Self::Buffer>;

    /// Release the buffer and its backing allocation
    fn destroy_buffer(&mut self, buffer: Self::Buffer);

    /// Create an image, its view and its sampler
    fn create_image(&mut self, desc: &ImageDesc) -> Result<Self::Image>;

    /// Release the image, view, sampler and backing allocation
    fn destroy_image(&mut self, image: Self::Image);

    /// Make the buffer's memory host-writable.
    ///
    /// Fails when the memory is not host visible.
    fn map_buffer(&mut self, buffer: &mut Self::Buffer) -> Result<()>;

    /// Mapped bytes of a buffer previously passed to `map_buffer`
    fn mapped_slice<'b>(&self, buffer: &'b Self::Buffer) -> &'b [u8];

    fn mapped_slice_mut<'b>(&self, buffer: &'b mut Self::Buffer) -> &'b mut [u8];

    /// Undo `map_buffer`. Called exactly once per successful map.
    fn unmap_buffer(&mut self, buffer: &mut Self::Buffer);
}
