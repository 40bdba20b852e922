/// Descriptor, layout and resource description types shared by every backend

use bitflags::bitflags;

// ============================================================================
// Descriptor types
// ============================================================================

/// Type of resource bound at a given slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DescriptorType {
    /// Uniform buffer (read-only structured data)
    UniformBuffer,
    /// Storage buffer (read/write)
    StorageBuffer,
    /// Uniform buffer with a dynamic offset supplied at bind time
    UniformBufferDynamic,
    /// Storage buffer with a dynamic offset supplied at bind time
    StorageBufferDynamic,
    /// Combined image sampler (texture + sampler in one binding)
    CombinedImageSampler,
    /// Sampled image without sampler
    SampledImage,
    /// Storage image (read/write)
    StorageImage,
}

impl DescriptorType {
    pub fn is_buffer(&self) -> bool {
        matches!(
            self,
            DescriptorType::UniformBuffer
                | DescriptorType::StorageBuffer
                | DescriptorType::UniformBufferDynamic
                | DescriptorType::StorageBufferDynamic
        )
    }

    /// Usage a buffer needs to be bound with this type, `None` for image types
    pub fn required_buffer_usage(&self) -> Option<BufferUsage> {
        match self {
            DescriptorType::UniformBuffer | DescriptorType::UniformBufferDynamic => Some(BufferUsage::UNIFORM),
            DescriptorType::StorageBuffer | DescriptorType::StorageBufferDynamic => Some(BufferUsage::STORAGE),
            _ => None,
        }
    }

    /// Usage an image needs to be bound with this type, `None` for buffer types
    pub fn required_image_usage(&self) -> Option<ImageUsage> {
        match self {
            DescriptorType::CombinedImageSampler | DescriptorType::SampledImage => Some(ImageUsage::SAMPLED),
            DescriptorType::StorageImage => Some(ImageUsage::STORAGE),
            _ => None,
        }
    }
}

/// How a buffer is exposed to shaders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferBindingType {
    Uniform,
    Storage,
    DynamicUniform,
    DynamicStorage,
}

impl BufferBindingType {
    pub fn descriptor_type(&self) -> DescriptorType {
        match self {
            BufferBindingType::Uniform => DescriptorType::UniformBuffer,
            BufferBindingType::Storage => DescriptorType::StorageBuffer,
            BufferBindingType::DynamicUniform => DescriptorType::UniformBufferDynamic,
            BufferBindingType::DynamicStorage => DescriptorType::StorageBufferDynamic,
        }
    }

    /// Usage a buffer created for this binding type gets
    pub fn buffer_usage(&self) -> BufferUsage {
        match self {
            BufferBindingType::Uniform | BufferBindingType::DynamicUniform => BufferUsage::UNIFORM,
            BufferBindingType::Storage | BufferBindingType::DynamicStorage => BufferUsage::STORAGE,
        }
    }
}

/// How an image is exposed to shaders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageBindingType {
    CombinedImageSampler,
    SampledImage,
    StorageImage,
}

impl ImageBindingType {
    pub fn descriptor_type(&self) -> DescriptorType {
        match self {
            ImageBindingType::CombinedImageSampler => DescriptorType::CombinedImageSampler,
            ImageBindingType::SampledImage => DescriptorType::SampledImage,
            ImageBindingType::StorageImage => DescriptorType::StorageImage,
        }
    }
}

/// Image layout the shader expects when reading the slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageLayout {
    General,
    #[default]
    ShaderReadOnly,
    DepthStencilReadOnly,
}

bitflags! {
    /// Shader stage visibility
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        const VERTEX = 0x01;
        const FRAGMENT = 0x02;
        const COMPUTE = 0x04;
        const VERTEX_FRAGMENT = Self::VERTEX.bits() | Self::FRAGMENT.bits();
        const ALL = Self::VERTEX.bits() | Self::FRAGMENT.bits() | Self::COMPUTE.bits();
    }
}

// ============================================================================
// Layouts and pools
// ============================================================================

/// Description of a single binding slot within a layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutEntry {
    /// Binding number (`layout(binding = N)` in GLSL)
    pub binding: u32,
    pub descriptor_type: DescriptorType,
    /// Number of descriptors at this binding (>1 for arrays)
    pub count: u32,
    pub stages: ShaderStages,
}

/// Description of a binding set layout, hashable so identical layouts can be shared
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct LayoutDesc {
    pub entries: Vec<LayoutEntry>,
}

impl LayoutDesc {
    /// Descriptors needed per type to allocate one set of this layout
    pub fn descriptor_counts(&self) -> Vec<(DescriptorType, u32)> {
        let mut counts: Vec<(DescriptorType, u32)> = Vec::new();
        for entry in &self.entries {
            match counts.iter_mut().find(|(ty, _)| *ty == entry.descriptor_type) {
                Some((_, n)) => *n += entry.count,
                None => counts.push((entry.descriptor_type, entry.count)),
            }
        }
        counts
    }
}

/// Share of a pool's capacity reserved for one descriptor type.
///
/// A pool created for `max_sets` sets holds `ratio * max_sets` descriptors
/// of `descriptor_type`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolSizeRatio {
    pub descriptor_type: DescriptorType,
    pub ratio: f32,
}

impl PoolSizeRatio {
    pub fn new(descriptor_type: DescriptorType, ratio: f32) -> Self {
        Self { descriptor_type, ratio }
    }

    /// Descriptor count for a pool of `max_sets` sets (never zero)
    pub fn descriptor_count(&self, max_sets: u32) -> u32 {
        ((self.ratio * max_sets as f32) as u32).max(1)
    }
}

// ============================================================================
// Resources
// ============================================================================

bitflags! {
    /// Buffer usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const UNIFORM = 0x01;
        const STORAGE = 0x02;
        const VERTEX = 0x04;
        const INDEX = 0x08;
        const TRANSFER_SRC = 0x10;
        const TRANSFER_DST = 0x20;
    }
}

bitflags! {
    /// Image usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        const SAMPLED = 0x01;
        const STORAGE = 0x02;
        const COLOR_ATTACHMENT = 0x04;
        const DEPTH_STENCIL_ATTACHMENT = 0x08;
        const TRANSFER_SRC = 0x10;
        const TRANSFER_DST = 0x20;
    }
}

/// Where a resource's memory lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    /// Device local, not host visible
    GpuOnly,
    /// Host visible, written by the CPU every frame
    CpuToGpu,
    /// Host visible, read back by the CPU
    GpuToCpu,
}

impl MemoryKind {
    pub fn is_host_visible(&self) -> bool {
        !matches!(self, MemoryKind::GpuOnly)
    }
}

/// Image formats supported by the binding layer
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    R16G16B16A16_SFLOAT,
    R32G32B32A32_SFLOAT,
    R32_SFLOAT,
    D32_SFLOAT,
}

impl ImageFormat {
    pub fn is_depth(&self) -> bool {
        matches!(self, ImageFormat::D32_SFLOAT)
    }
}

/// Size of an image in texels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent3d {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Extent3d {
    pub fn new_2d(width: u32, height: u32) -> Self {
        Self { width, height, depth: 1 }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    pub usage: BufferUsage,
    pub memory: MemoryKind,
}

/// Descriptor for creating an image together with its view and sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDesc {
    pub format: ImageFormat,
    pub usage: ImageUsage,
    pub extent: Extent3d,
    pub memory: MemoryKind,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
