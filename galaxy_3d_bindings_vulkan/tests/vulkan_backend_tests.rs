//! Tests for VulkanBackend against a real device
//!
//! These tests create a headless Vulkan device (no window, no surface).
//! All tests require a GPU and are marked with #[ignore].
//!
//! Run with: cargo test --test vulkan_backend_tests -- --ignored

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use std::sync::{Arc, Mutex};
use galaxy_3d_bindings::galaxy3d::backend::{
    BindingBackend, BufferDesc, BufferUsage, DescriptorType, Extent3d, ImageDesc, ImageFormat,
    ImageLayout, ImageUsage, LayoutDesc, LayoutEntry, MemoryKind, PoolSizeRatio, ShaderStages,
};
use galaxy_3d_bindings::galaxy3d::binding::AllocatorConfig;
use galaxy_3d_bindings::galaxy3d::{BindingStateConfig, Error, GlobalBindingState};
use galaxy_3d_bindings_vulkan::{GpuContext, VulkanBackend};

/// Headless device owning everything the backend borrows
struct TestDevice {
    _entry: ash::Entry,
    instance: ash::Instance,
    context: Option<Arc<GpuContext>>,
}

impl TestDevice {
    fn new() -> Self {
        unsafe {
            let entry = ash::Entry::load().unwrap();
            let app_info = vk::ApplicationInfo::default()
                .application_name(c"galaxy3d bindings test")
                .api_version(vk::API_VERSION_1_2);
            let instance = entry
                .create_instance(&vk::InstanceCreateInfo::default().application_info(&app_info), None)
                .unwrap();

            let physical_device = instance.enumerate_physical_devices().unwrap()[0];
            let queue_family = instance
                .get_physical_device_queue_family_properties(physical_device)
                .iter()
                .position(|p| p.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                .unwrap() as u32;

            let priorities = [1.0f32];
            let queue_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(queue_family)
                .queue_priorities(&priorities)];
            let device = instance
                .create_device(physical_device, &vk::DeviceCreateInfo::default().queue_create_infos(&queue_infos), None)
                .unwrap();

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .unwrap();

            let context = GpuContext::new(device, Arc::new(Mutex::new(allocator)));
            Self { _entry: entry, instance, context: Some(Arc::new(context)) }
        }
    }

    fn backend(&self) -> VulkanBackend {
        VulkanBackend::new(Arc::clone(self.context.as_ref().unwrap()))
    }
}

impl Drop for TestDevice {
    fn drop(&mut self) {
        // The allocator must go before the device it allocates from
        if let Some(context) = self.context.take() {
            let context = Arc::try_unwrap(context).ok().expect("backend still alive");
            context.wait_idle().unwrap();
            let GpuContext { device, allocator } = context;
            drop(allocator);
            unsafe {
                device.destroy_device(None);
                self.instance.destroy_instance(None);
            }
        }
    }
}

// ============================================================================
// POOL TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_pool_reports_exhaustion() {
    let device = TestDevice::new();
    let mut backend = device.backend();

    let ratios = [PoolSizeRatio::new(DescriptorType::UniformBuffer, 1.0)];
    let pool = backend.create_pool(1, &ratios).unwrap();
    let layout = backend
        .create_layout(&LayoutDesc {
            entries: vec![LayoutEntry {
                binding: 0,
                descriptor_type: DescriptorType::UniformBuffer,
                count: 1,
                stages: ShaderStages::ALL,
            }],
        })
        .unwrap();

    backend.allocate_set(pool, layout).unwrap();
    let second = backend.allocate_set(pool, layout);
    assert!(matches!(second, Err(Error::PoolExhausted(_))));

    backend.reset_pool(pool).unwrap();
    backend.allocate_set(pool, layout).unwrap();

    backend.destroy_layout(layout);
    backend.destroy_pool(pool);
}

// ============================================================================
// RESOURCE TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_map_and_write_buffer() {
    let device = TestDevice::new();
    let mut backend = device.backend();

    let mut buffer = backend
        .create_buffer(&BufferDesc { size: 64, usage: BufferUsage::UNIFORM, memory: MemoryKind::CpuToGpu })
        .unwrap();
    backend.map_buffer(&mut buffer).unwrap();
    backend.mapped_slice_mut(&mut buffer)[..4].copy_from_slice(&[1, 2, 3, 4]);
    assert_eq!(&backend.mapped_slice(&buffer)[..4], &[1, 2, 3, 4]);
    assert_eq!(backend.mapped_slice(&buffer).len(), 64);
    backend.unmap_buffer(&mut buffer);

    backend.destroy_buffer(buffer);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_gpu_only_buffer_cannot_be_mapped() {
    let device = TestDevice::new();
    let mut backend = device.backend();

    let mut buffer = backend
        .create_buffer(&BufferDesc { size: 256, usage: BufferUsage::STORAGE, memory: MemoryKind::GpuOnly })
        .unwrap();
    assert!(matches!(backend.map_buffer(&mut buffer), Err(Error::BackendError(_))));

    backend.destroy_buffer(buffer);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_image_has_view_and_sampler() {
    let device = TestDevice::new();
    let mut backend = device.backend();

    let image = backend
        .create_image(&ImageDesc {
            format: ImageFormat::R8G8B8A8_UNORM,
            usage: ImageUsage::SAMPLED,
            extent: Extent3d::new_2d(16, 16),
            memory: MemoryKind::GpuOnly,
        })
        .unwrap();
    assert_ne!(image.view(), vk::ImageView::null());
    assert_ne!(image.sampler(), vk::Sampler::null());

    backend.destroy_image(image);
}

// ============================================================================
// GLOBAL STATE TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_global_state_frame() {
    let device = TestDevice::new();
    let config = BindingStateConfig {
        persistent: AllocatorConfig::with_initial_sets(1),
        ..BindingStateConfig::default()
    };
    let mut state = GlobalBindingState::new(device.backend(), config).unwrap();

    let ubo = state
        .create_buffer(BufferDesc { size: 64, usage: BufferUsage::UNIFORM, memory: MemoryKind::CpuToGpu })
        .unwrap();
    let albedo = state
        .create_image_with_view(ImageDesc {
            format: ImageFormat::R8G8B8A8_SRGB,
            usage: ImageUsage::SAMPLED | ImageUsage::TRANSFER_DST,
            extent: Extent3d::new_2d(4, 4),
            memory: MemoryKind::GpuOnly,
        })
        .unwrap();

    let blueprint = state
        .begin_build()
        .add_buffer_binding(ubo).unwrap()
        .add_image_binding(albedo, ImageLayout::ShaderReadOnly).unwrap()
        .blueprint();
    state.build("a", &blueprint).unwrap();
    // Second build forces a new persistent pool
    state.build("b", &blueprint).unwrap();
    assert_eq!(state.persistent_allocator().pool_count(), 2);

    state.write("a", 0, &[7u8; 64]).unwrap();
    state.allocate_transient("b").unwrap();
    state.reset_transient().unwrap();

    state.teardown();
}
