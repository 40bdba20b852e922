/// VulkanBackend - BindingBackend implementation on top of ash and gpu-allocator
///
/// Pools, sets and layouts are raw Vulkan handles. Buffers and images own
/// their gpu-allocator allocation and are released through the backend.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use std::sync::Arc;
use galaxy_3d_bindings::galaxy3d::{Error, Result};
use galaxy_3d_bindings::galaxy3d::backend::{
    BindingBackend, BufferDesc, ImageDesc, ImageUsage, LayoutDesc, MemoryKind, PoolSizeRatio,
    SlotWrite,
};
use galaxy_3d_bindings::{bind_bail, bind_debug, bind_err, bind_error, bind_warn};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    aspect_mask, buffer_usage_to_vk, descriptor_type_to_vk, image_format_to_vk, image_layout_to_vk,
    image_type_for, image_usage_to_vk, is_pool_exhaustion, memory_kind_to_location,
    pool_sizes_to_vk, shader_stages_to_vk, vk_error,
};

// ===== RESOURCES =====

/// Vulkan buffer with its memory allocation
pub struct VulkanBuffer {
    buffer: vk::Buffer,
    /// Taken on destroy
    allocation: Option<Allocation>,
    size: u64,
    memory: MemoryKind,
    mapped: bool,
}

impl VulkanBuffer {
    pub fn raw(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn memory(&self) -> MemoryKind {
        self.memory
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped
    }
}

/// Vulkan image with its view, sampler and memory allocation
pub struct VulkanImage {
    image: vk::Image,
    view: vk::ImageView,
    /// Null unless the image was created with `ImageUsage::SAMPLED`
    sampler: vk::Sampler,
    allocation: Option<Allocation>,
    format: vk::Format,
}

impl VulkanImage {
    pub fn raw(&self) -> vk::Image {
        self.image
    }

    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    pub fn sampler(&self) -> vk::Sampler {
        self.sampler
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }
}

// ===== BACKEND =====

/// Vulkan binding backend
pub struct VulkanBackend {
    context: Arc<GpuContext>,
}

impl VulkanBackend {
    pub fn new(context: Arc<GpuContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<GpuContext> {
        &self.context
    }

    fn device(&self) -> &ash::Device {
        &self.context.device
    }

    fn allocate_memory(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        memory: MemoryKind,
        linear: bool,
    ) -> Result<Allocation> {
        self.context
            .lock_allocator()?
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location: memory_kind_to_location(memory),
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                bind_error!("galaxy3d::vulkan", "Out of GPU memory for {} (required: {:.2} MB): {}", name, size_mb, e);
                Error::OutOfMemory
            })
    }

    fn free_memory(&self, allocation: Option<Allocation>) {
        let Some(allocation) = allocation else { return };
        match self.context.lock_allocator() {
            Ok(mut allocator) => {
                if let Err(e) = allocator.free(allocation) {
                    bind_warn!("galaxy3d::vulkan", "Failed to free GPU allocation: {}", e);
                }
            }
            Err(_) => bind_warn!("galaxy3d::vulkan", "GPU allocation leaked, allocator unavailable"),
        }
    }

    fn create_sampler(&self) -> Result<vk::Sampler> {
        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::NEAREST)
            .min_filter(vk::Filter::NEAREST)
            .mipmap_mode(vk::SamplerMipmapMode::NEAREST)
            .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(vk::LOD_CLAMP_NONE)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .unnormalized_coordinates(false);

        unsafe {
            self.device()
                .create_sampler(&create_info, None)
                .map_err(|e| vk_error(e, "create_sampler"))
        }
    }
}

impl BindingBackend for VulkanBackend {
    type Pool = vk::DescriptorPool;
    type Set = vk::DescriptorSet;
    type Layout = vk::DescriptorSetLayout;
    type Buffer = VulkanBuffer;
    type Image = VulkanImage;

    fn create_pool(&mut self, max_sets: u32, ratios: &[PoolSizeRatio]) -> Result<vk::DescriptorPool> {
        let pool_sizes = pool_sizes_to_vk(max_sets, ratios);
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&pool_sizes)
            .max_sets(max_sets);

        let pool = unsafe {
            self.device()
                .create_descriptor_pool(&create_info, None)
                .map_err(|e| vk_error(e, "create_descriptor_pool"))?
        };
        bind_debug!("galaxy3d::vulkan", "Created descriptor pool {:?} ({} sets)", pool, max_sets);
        Ok(pool)
    }

    fn reset_pool(&mut self, pool: vk::DescriptorPool) -> Result<()> {
        unsafe {
            self.device()
                .reset_descriptor_pool(pool, vk::DescriptorPoolResetFlags::empty())
                .map_err(|e| vk_error(e, "reset_descriptor_pool"))
        }
    }

    fn destroy_pool(&mut self, pool: vk::DescriptorPool) {
        unsafe { self.device().destroy_descriptor_pool(pool, None) }
    }

    fn create_layout(&mut self, desc: &LayoutDesc) -> Result<vk::DescriptorSetLayout> {
        let bindings: Vec<vk::DescriptorSetLayoutBinding> = desc
            .entries
            .iter()
            .map(|entry| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(entry.binding)
                    .descriptor_type(descriptor_type_to_vk(entry.descriptor_type))
                    .descriptor_count(entry.count)
                    .stage_flags(shader_stages_to_vk(entry.stages))
            })
            .collect();

        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        unsafe {
            self.device()
                .create_descriptor_set_layout(&create_info, None)
                .map_err(|e| vk_error(e, "create_descriptor_set_layout"))
        }
    }

    fn destroy_layout(&mut self, layout: vk::DescriptorSetLayout) {
        unsafe { self.device().destroy_descriptor_set_layout(layout, None) }
    }

    fn allocate_set(&mut self, pool: vk::DescriptorPool, layout: vk::DescriptorSetLayout) -> Result<vk::DescriptorSet> {
        let layouts = [layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&layouts);

        let sets = match unsafe { self.device().allocate_descriptor_sets(&alloc_info) } {
            Ok(sets) => sets,
            // Expected when a pool fills up, the allocator grows and retries
            Err(e) if is_pool_exhaustion(e) => {
                return Err(Error::PoolExhausted(format!("descriptor pool {:?}: {:?}", pool, e)));
            }
            Err(e) => return Err(vk_error(e, "allocate_descriptor_sets")),
        };

        sets.first()
            .copied()
            .ok_or_else(|| bind_err!(BackendError, "galaxy3d::vulkan", "allocate_descriptor_sets returned no set"))
    }

    fn write_set(&mut self, set: vk::DescriptorSet, writes: &[SlotWrite<'_, Self>]) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }

        // Infos must outlive the WriteDescriptorSet array that points into them
        let mut buffer_infos = Vec::with_capacity(writes.len());
        let mut image_infos = Vec::with_capacity(writes.len());
        for write in writes {
            match write {
                SlotWrite::Buffer { buffer, range, .. } => buffer_infos.push(
                    vk::DescriptorBufferInfo::default()
                        .buffer(buffer.buffer)
                        .offset(0)
                        .range(*range),
                ),
                SlotWrite::Image { image, layout, .. } => image_infos.push(
                    vk::DescriptorImageInfo::default()
                        .sampler(image.sampler)
                        .image_view(image.view)
                        .image_layout(image_layout_to_vk(*layout)),
                ),
            }
        }

        let mut next_buffer = 0;
        let mut next_image = 0;
        let descriptor_writes: Vec<vk::WriteDescriptorSet> = writes
            .iter()
            .map(|write| {
                let base = vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(write.binding())
                    .dst_array_element(0)
                    .descriptor_type(descriptor_type_to_vk(write.descriptor_type()));
                match write {
                    SlotWrite::Buffer { .. } => {
                        let info = &buffer_infos[next_buffer];
                        next_buffer += 1;
                        base.buffer_info(std::slice::from_ref(info))
                    }
                    SlotWrite::Image { .. } => {
                        let info = &image_infos[next_image];
                        next_image += 1;
                        base.image_info(std::slice::from_ref(info))
                    }
                }
            })
            .collect();

        unsafe { self.device().update_descriptor_sets(&descriptor_writes, &[]) };
        Ok(())
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<VulkanBuffer> {
        let create_info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(buffer_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        unsafe {
            let buffer = self.device()
                .create_buffer(&create_info, None)
                .map_err(|e| vk_error(e, "create_buffer"))?;

            let requirements = self.device().get_buffer_memory_requirements(buffer);
            let allocation = match self.allocate_memory("binding buffer", requirements, desc.memory, true) {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.device().destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) = self.device().bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                self.free_memory(Some(allocation));
                self.device().destroy_buffer(buffer, None);
                return Err(vk_error(e, "bind_buffer_memory"));
            }

            Ok(VulkanBuffer {
                buffer,
                allocation: Some(allocation),
                size: desc.size,
                memory: desc.memory,
                mapped: false,
            })
        }
    }

    fn destroy_buffer(&mut self, mut buffer: VulkanBuffer) {
        self.free_memory(buffer.allocation.take());
        unsafe { self.device().destroy_buffer(buffer.buffer, None) }
    }

    fn create_image(&mut self, desc: &ImageDesc) -> Result<VulkanImage> {
        let format = image_format_to_vk(desc.format);
        let (image_type, view_type) = image_type_for(desc.extent);

        let create_info = vk::ImageCreateInfo::default()
            .image_type(image_type)
            .format(format)
            .extent(vk::Extent3D {
                width: desc.extent.width,
                height: desc.extent.height,
                depth: desc.extent.depth,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(image_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        unsafe {
            let image = self.device()
                .create_image(&create_info, None)
                .map_err(|e| vk_error(e, "create_image"))?;

            let requirements = self.device().get_image_memory_requirements(image);
            let allocation = match self.allocate_memory("binding image", requirements, desc.memory, false) {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.device().destroy_image(image, None);
                    return Err(e);
                }
            };

            if let Err(e) = self.device().bind_image_memory(image, allocation.memory(), allocation.offset()) {
                self.free_memory(Some(allocation));
                self.device().destroy_image(image, None);
                return Err(vk_error(e, "bind_image_memory"));
            }

            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(view_type)
                .format(format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: aspect_mask(desc.format),
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            let view = match self.device().create_image_view(&view_info, None) {
                Ok(view) => view,
                Err(e) => {
                    self.free_memory(Some(allocation));
                    self.device().destroy_image(image, None);
                    return Err(vk_error(e, "create_image_view"));
                }
            };

            let sampler = if desc.usage.contains(ImageUsage::SAMPLED) {
                match self.create_sampler() {
                    Ok(sampler) => sampler,
                    Err(e) => {
                        self.device().destroy_image_view(view, None);
                        self.free_memory(Some(allocation));
                        self.device().destroy_image(image, None);
                        return Err(e);
                    }
                }
            } else {
                vk::Sampler::null()
            };

            Ok(VulkanImage {
                image,
                view,
                sampler,
                allocation: Some(allocation),
                format,
            })
        }
    }

    fn destroy_image(&mut self, mut image: VulkanImage) {
        unsafe {
            if image.sampler != vk::Sampler::null() {
                self.device().destroy_sampler(image.sampler, None);
            }
            self.device().destroy_image_view(image.view, None);
        }
        self.free_memory(image.allocation.take());
        unsafe { self.device().destroy_image(image.image, None) }
    }

    fn map_buffer(&mut self, buffer: &mut VulkanBuffer) -> Result<()> {
        if buffer.mapped {
            bind_bail!(BackendError, "galaxy3d::vulkan", "buffer {:?} is already mapped", buffer.buffer);
        }
        // gpu-allocator keeps host-visible memory persistently mapped
        let host_visible = buffer
            .allocation
            .as_ref()
            .is_some_and(|a| a.mapped_ptr().is_some());
        if !host_visible {
            bind_bail!(BackendError, "galaxy3d::vulkan",
                "buffer {:?} ({:?}) is not host visible", buffer.buffer, buffer.memory);
        }
        buffer.mapped = true;
        Ok(())
    }

    fn mapped_slice<'b>(&self, buffer: &'b VulkanBuffer) -> &'b [u8] {
        let size = buffer.size as usize;
        match buffer.allocation.as_ref().and_then(|a| a.mapped_slice()) {
            Some(bytes) => &bytes[..bytes.len().min(size)],
            None => &[],
        }
    }

    fn mapped_slice_mut<'b>(&self, buffer: &'b mut VulkanBuffer) -> &'b mut [u8] {
        let size = buffer.size as usize;
        match buffer.allocation.as_mut().and_then(|a| a.mapped_slice_mut()) {
            Some(bytes) => {
                let len = bytes.len().min(size);
                &mut bytes[..len]
            }
            None => &mut [],
        }
    }

    fn unmap_buffer(&mut self, buffer: &mut VulkanBuffer) {
        // Host-visible locations are host coherent in gpu-allocator, no flush
        buffer.mapped = false;
    }
}
