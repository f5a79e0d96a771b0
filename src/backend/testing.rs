// In-process stand-in for the Vulkan driver
//
// Answers every VulkanApi call from a table, records the calls, and lets a
// test make any named call fail. Two physical devices are exposed:
//   #0 integrated, families [GRAPHICS]
//   #1 discrete,   families [TRANSFER, GRAPHICS|COMPUTE, GRAPHICS]

use ash::prelude::VkResult;
use ash::vk::{self, Handle as _};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::ffi::{c_char, CStr};
use std::mem;
use std::sync::Arc;

use super::api::VulkanApi;
use super::device::LogicalDeviceHandle;
use super::instance::{InstanceDescriptor, InstanceHandle};
use super::selector::SelectionPolicy;
use super::surface::{SurfaceDescriptor, SurfaceHandle};

/// Raw value written by the fake headless surface constructor
pub const HEADLESS_SURFACE: u64 = 0x5001;
/// Raw value written by the fake Win32 surface constructor
pub const WIN32_SURFACE: u64 = 0x5002;

const INSTANCE: u64 = 0x10;
const PHYSICAL_DEVICE_BASE: u64 = 0x1000;
const DEVICE_BASE: u64 = 0x2000;
const QUEUE_BASE: u64 = 0x3000;
const SWAPCHAIN_BASE: u64 = 0x6000;
const IMAGE_BASE: u64 = 0x7000;
const IMAGE_VIEW_BASE: u64 = 0x8000;

#[derive(Debug, Clone)]
pub struct FakePhysicalDevice {
    pub device_type: vk::PhysicalDeviceType,
    pub queue_families: Vec<vk::QueueFlags>,
}

#[derive(Debug, Clone)]
pub struct CreatedDevice {
    pub extensions: Vec<String>,
    pub queue_family_index: u32,
    pub queue_priorities: Vec<f32>,
    pub features: vk::PhysicalDeviceFeatures,
}

#[derive(Debug, Clone, Copy)]
pub struct CreatedSwapchain {
    pub surface: vk::SurfaceKHR,
    pub min_image_count: u32,
    pub format: vk::Format,
    pub color_space: vk::ColorSpaceKHR,
    pub extent: vk::Extent2D,
    pub usage: vk::ImageUsageFlags,
    pub present_mode: vk::PresentModeKHR,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
    pub clipped: bool,
}

pub struct FakeState {
    pub calls: Vec<String>,
    pub failures: HashMap<String, vk::Result>,
    pub with_allocator: Vec<String>,

    pub instance_extensions: Vec<&'static str>,
    pub instance_layers: Vec<&'static str>,
    pub instance_extensions_enabled: Vec<String>,
    pub instance_layers_enabled: Vec<String>,

    pub physical_devices: Vec<FakePhysicalDevice>,
    pub device_extensions: Vec<&'static str>,
    pub supported_features: vk::PhysicalDeviceFeatures,
    pub rejected_image_formats: Vec<vk::Format>,
    pub device_created: Option<CreatedDevice>,

    /// Queue families able to present, on every device
    pub present_support: Vec<u32>,
    pub surface_capabilities: vk::SurfaceCapabilitiesKHR,
    pub surface_formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,

    pub swapchain_image_count: u32,
    pub swapchain_created: Option<CreatedSwapchain>,
    pub image_views_created: Vec<(vk::Image, vk::Format)>,

    next_handle: u64,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            failures: HashMap::new(),
            with_allocator: Vec::new(),
            instance_extensions: vec![
                "VK_KHR_surface",
                "VK_EXT_headless_surface",
                "VK_KHR_win32_surface",
                "VK_EXT_debug_utils",
            ],
            instance_layers: vec!["VK_LAYER_KHRONOS_validation"],
            instance_extensions_enabled: Vec::new(),
            instance_layers_enabled: Vec::new(),
            physical_devices: vec![
                FakePhysicalDevice {
                    device_type: vk::PhysicalDeviceType::INTEGRATED_GPU,
                    queue_families: vec![vk::QueueFlags::GRAPHICS],
                },
                FakePhysicalDevice {
                    device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
                    queue_families: vec![
                        vk::QueueFlags::TRANSFER,
                        vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
                        vk::QueueFlags::GRAPHICS,
                    ],
                },
            ],
            device_extensions: vec!["VK_KHR_swapchain", "VK_EXT_memory_budget"],
            supported_features: vk::PhysicalDeviceFeatures {
                sampler_anisotropy: vk::TRUE,
                fill_mode_non_solid: vk::TRUE,
                ..Default::default()
            },
            rejected_image_formats: Vec::new(),
            device_created: None,
            present_support: vec![1, 2],
            surface_capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: vk::Extent2D {
                    width: 800,
                    height: 600,
                },
                min_image_extent: vk::Extent2D { width: 1, height: 1 },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                max_image_array_layers: 1,
                supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
                supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
            },
            surface_formats: vec![
                vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_SRGB,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
                vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_UNORM,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
            ],
            present_modes: vec![
                vk::PresentModeKHR::FIFO,
                vk::PresentModeKHR::MAILBOX,
                vk::PresentModeKHR::IMMEDIATE,
            ],
            swapchain_image_count: 3,
            swapchain_created: None,
            image_views_created: Vec::new(),
            next_handle: 0,
        }
    }
}

struct FakeDriver {
    state: Mutex<FakeState>,
}

/// Test-side view of the fake driver; clones share one state
#[derive(Clone)]
pub struct FakeApi {
    driver: Arc<FakeDriver>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            driver: Arc::new(FakeDriver {
                state: Mutex::new(FakeState::default()),
            }),
        }
    }

    pub fn api(&self) -> Arc<dyn VulkanApi> {
        self.driver.clone()
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.driver.state.lock()
    }

    /// Make every later call named `name` return `result`
    pub fn fail(&self, name: &str, result: vk::Result) {
        self.state().failures.insert(name.to_string(), result);
    }

    pub fn called(&self, name: &str) -> bool {
        self.state().calls.iter().any(|call| call == name)
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// The destroy_* calls, in the order they were made
    pub fn destroy_order(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter(|call| call.starts_with("destroy_"))
            .cloned()
            .collect()
    }

    pub fn physical_device(&self, index: usize) -> vk::PhysicalDevice {
        vk::PhysicalDevice::from_raw(PHYSICAL_DEVICE_BASE + index as u64)
    }
}

impl FakeState {
    fn record(&mut self, name: &str, allocator: Option<&vk::AllocationCallbacks>) -> Result<(), vk::Result> {
        self.calls.push(name.to_string());
        if allocator.is_some() {
            self.with_allocator.push(name.to_string());
        }
        match self.failures.get(name) {
            Some(&result) => Err(result),
            None => Ok(()),
        }
    }

    fn next(&mut self, base: u64) -> u64 {
        self.next_handle += 1;
        base + self.next_handle
    }

    fn physical_device(&self, physical_device: vk::PhysicalDevice) -> Option<&FakePhysicalDevice> {
        let index = physical_device.as_raw().checked_sub(PHYSICAL_DEVICE_BASE)?;
        self.physical_devices.get(index as usize)
    }
}

fn copy_name(dst: &mut [c_char], name: &str) {
    for (dst, &src) in dst.iter_mut().zip(name.as_bytes()) {
        *dst = src as c_char;
    }
}

fn extension(name: &str) -> vk::ExtensionProperties {
    let mut properties = vk::ExtensionProperties::default();
    copy_name(&mut properties.extension_name, name);
    properties
}

fn layer(name: &str) -> vk::LayerProperties {
    let mut properties = vk::LayerProperties::default();
    copy_name(&mut properties.layer_name, name);
    properties
}

/// Driver side of the two-call convention
unsafe fn fill<T: Copy>(items: &[T], count: &mut u32, out: *mut T) -> vk::Result {
    if out.is_null() {
        *count = items.len() as u32;
        return vk::Result::SUCCESS;
    }

    let written = (*count as usize).min(items.len());
    // SAFETY: caller provides `count` writable slots
    unsafe { std::ptr::copy_nonoverlapping(items.as_ptr(), out, written) };
    *count = written as u32;

    if written < items.len() {
        vk::Result::INCOMPLETE
    } else {
        vk::Result::SUCCESS
    }
}

unsafe fn names(pointers: *const *const c_char, count: u32) -> Vec<String> {
    if pointers.is_null() || count == 0 {
        return Vec::new();
    }
    // SAFETY: the create-info stores `count` nul-terminated names
    unsafe { std::slice::from_raw_parts(pointers, count as usize) }
        .iter()
        .map(|&name| unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned())
        .collect()
}

unsafe extern "system" fn fake_create_headless_surface(
    _instance: vk::Instance,
    _create_info: *const vk::HeadlessSurfaceCreateInfoEXT,
    _allocator: *const vk::AllocationCallbacks,
    surface: *mut vk::SurfaceKHR,
) -> vk::Result {
    // SAFETY: the caller passes a valid output slot
    unsafe { *surface = vk::SurfaceKHR::from_raw(HEADLESS_SURFACE) };
    vk::Result::SUCCESS
}

unsafe extern "system" fn fake_create_win32_surface(
    _instance: vk::Instance,
    _create_info: *const vk::Win32SurfaceCreateInfoKHR,
    _allocator: *const vk::AllocationCallbacks,
    surface: *mut vk::SurfaceKHR,
) -> vk::Result {
    // SAFETY: the caller passes a valid output slot
    unsafe { *surface = vk::SurfaceKHR::from_raw(WIN32_SURFACE) };
    vk::Result::SUCCESS
}

unsafe extern "system" fn fake_win32_presentation_support(
    _physical_device: vk::PhysicalDevice,
    _queue_family_index: u32,
) -> vk::Bool32 {
    vk::TRUE
}

impl VulkanApi for FakeDriver {
    unsafe fn enumerate_instance_extension_properties(
        &self,
        count: &mut u32,
        properties: *mut vk::ExtensionProperties,
    ) -> vk::Result {
        let mut state = self.state.lock();
        if let Err(result) = state.record("enumerate_instance_extension_properties", None) {
            return result;
        }
        let items: Vec<_> = state.instance_extensions.iter().map(|name| extension(name)).collect();
        // SAFETY: forwarded caller contract
        unsafe { fill(&items, count, properties) }
    }

    unsafe fn enumerate_instance_layer_properties(
        &self,
        count: &mut u32,
        properties: *mut vk::LayerProperties,
    ) -> vk::Result {
        let mut state = self.state.lock();
        if let Err(result) = state.record("enumerate_instance_layer_properties", None) {
            return result;
        }
        let items: Vec<_> = state.instance_layers.iter().map(|name| layer(name)).collect();
        // SAFETY: forwarded caller contract
        unsafe { fill(&items, count, properties) }
    }

    unsafe fn create_instance(
        &self,
        create_info: &vk::InstanceCreateInfo,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::Instance> {
        let mut state = self.state.lock();
        state.record("create_instance", allocator)?;
        // SAFETY: the create-info arrays are alive for this call
        unsafe {
            state.instance_extensions_enabled =
                names(create_info.pp_enabled_extension_names, create_info.enabled_extension_count);
            state.instance_layers_enabled = names(create_info.pp_enabled_layer_names, create_info.enabled_layer_count);
        }
        Ok(vk::Instance::from_raw(INSTANCE))
    }

    unsafe fn destroy_instance(&self, _instance: vk::Instance, allocator: Option<&vk::AllocationCallbacks>) {
        let _ = self.state.lock().record("destroy_instance", allocator);
    }

    unsafe fn get_instance_proc_addr(&self, _instance: vk::Instance, name: &CStr) -> vk::PFN_vkVoidFunction {
        let _ = self.state.lock().record("get_instance_proc_addr", None);

        // SAFETY: every PFN type is a plain function pointer
        unsafe {
            match name.to_bytes() {
                b"vkCreateHeadlessSurfaceEXT" => Some(mem::transmute::<
                    vk::PFN_vkCreateHeadlessSurfaceEXT,
                    unsafe extern "system" fn(),
                >(fake_create_headless_surface)),
                b"vkCreateWin32SurfaceKHR" => Some(mem::transmute::<
                    vk::PFN_vkCreateWin32SurfaceKHR,
                    unsafe extern "system" fn(),
                >(fake_create_win32_surface)),
                b"vkGetPhysicalDeviceWin32PresentationSupportKHR" => Some(mem::transmute::<
                    vk::PFN_vkGetPhysicalDeviceWin32PresentationSupportKHR,
                    unsafe extern "system" fn(),
                >(fake_win32_presentation_support)),
                _ => None,
            }
        }
    }

    unsafe fn enumerate_physical_devices(
        &self,
        _instance: vk::Instance,
        count: &mut u32,
        devices: *mut vk::PhysicalDevice,
    ) -> vk::Result {
        let mut state = self.state.lock();
        if let Err(result) = state.record("enumerate_physical_devices", None) {
            return result;
        }
        let items: Vec<_> = (0..state.physical_devices.len())
            .map(|index| vk::PhysicalDevice::from_raw(PHYSICAL_DEVICE_BASE + index as u64))
            .collect();
        // SAFETY: forwarded caller contract
        unsafe { fill(&items, count, devices) }
    }

    unsafe fn get_physical_device_properties(
        &self,
        _instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties {
        let mut state = self.state.lock();
        let _ = state.record("get_physical_device_properties", None);
        vk::PhysicalDeviceProperties {
            device_type: state
                .physical_device(physical_device)
                .map_or(vk::PhysicalDeviceType::OTHER, |device| device.device_type),
            ..Default::default()
        }
    }

    unsafe fn get_physical_device_queue_family_properties(
        &self,
        _instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        count: &mut u32,
        properties: *mut vk::QueueFamilyProperties,
    ) {
        let mut state = self.state.lock();
        let _ = state.record("get_physical_device_queue_family_properties", None);
        let items: Vec<_> = state
            .physical_device(physical_device)
            .map(|device| device.queue_families.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|&queue_flags| vk::QueueFamilyProperties {
                queue_flags,
                queue_count: 1,
                ..Default::default()
            })
            .collect();
        // SAFETY: forwarded caller contract
        unsafe { fill(&items, count, properties) };
    }

    unsafe fn enumerate_device_extension_properties(
        &self,
        _instance: vk::Instance,
        _physical_device: vk::PhysicalDevice,
        count: &mut u32,
        properties: *mut vk::ExtensionProperties,
    ) -> vk::Result {
        let mut state = self.state.lock();
        if let Err(result) = state.record("enumerate_device_extension_properties", None) {
            return result;
        }
        let items: Vec<_> = state.device_extensions.iter().map(|name| extension(name)).collect();
        // SAFETY: forwarded caller contract
        unsafe { fill(&items, count, properties) }
    }

    unsafe fn get_physical_device_features(
        &self,
        _instance: vk::Instance,
        _physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceFeatures {
        let mut state = self.state.lock();
        let _ = state.record("get_physical_device_features", None);
        state.supported_features
    }

    unsafe fn get_physical_device_image_format_properties(
        &self,
        _instance: vk::Instance,
        _physical_device: vk::PhysicalDevice,
        format: vk::Format,
        _usage: vk::ImageUsageFlags,
    ) -> VkResult<vk::ImageFormatProperties> {
        let mut state = self.state.lock();
        state.record("get_physical_device_image_format_properties", None)?;
        if state.rejected_image_formats.contains(&format) {
            return Err(vk::Result::ERROR_FORMAT_NOT_SUPPORTED);
        }
        Ok(vk::ImageFormatProperties {
            max_extent: vk::Extent3D {
                width: 4096,
                height: 4096,
                depth: 1,
            },
            max_mip_levels: 13,
            max_array_layers: 1,
            sample_counts: vk::SampleCountFlags::TYPE_1,
            max_resource_size: 1 << 31,
        })
    }

    unsafe fn create_device(
        &self,
        _instance: vk::Instance,
        _physical_device: vk::PhysicalDevice,
        create_info: &vk::DeviceCreateInfo,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::Device> {
        let mut state = self.state.lock();
        state.record("create_device", allocator)?;

        // SAFETY: the create-info arrays are alive for this call
        let created = unsafe {
            let queues = std::slice::from_raw_parts(
                create_info.p_queue_create_infos,
                create_info.queue_create_info_count as usize,
            );
            let queue = queues.first().ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
            CreatedDevice {
                extensions: names(create_info.pp_enabled_extension_names, create_info.enabled_extension_count),
                queue_family_index: queue.queue_family_index,
                queue_priorities: std::slice::from_raw_parts(queue.p_queue_priorities, queue.queue_count as usize)
                    .to_vec(),
                features: create_info.p_enabled_features.as_ref().copied().unwrap_or_default(),
            }
        };
        state.device_created = Some(created);

        let raw = state.next(DEVICE_BASE);
        Ok(vk::Device::from_raw(raw))
    }

    unsafe fn destroy_surface(
        &self,
        _instance: vk::Instance,
        _surface: vk::SurfaceKHR,
        allocator: Option<&vk::AllocationCallbacks>,
    ) {
        let _ = self.state.lock().record("destroy_surface", allocator);
    }

    unsafe fn get_physical_device_surface_support(
        &self,
        _instance: vk::Instance,
        _physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        let mut state = self.state.lock();
        state.record("get_physical_device_surface_support", None)?;
        Ok(state.present_support.contains(&queue_family_index))
    }

    unsafe fn get_physical_device_surface_capabilities(
        &self,
        _instance: vk::Instance,
        _physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        let mut state = self.state.lock();
        state.record("get_physical_device_surface_capabilities", None)?;
        Ok(state.surface_capabilities)
    }

    unsafe fn get_physical_device_surface_formats(
        &self,
        _instance: vk::Instance,
        _physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
        count: &mut u32,
        formats: *mut vk::SurfaceFormatKHR,
    ) -> vk::Result {
        let mut state = self.state.lock();
        if let Err(result) = state.record("get_physical_device_surface_formats", None) {
            return result;
        }
        // SAFETY: forwarded caller contract
        unsafe { fill(&state.surface_formats, count, formats) }
    }

    unsafe fn get_physical_device_surface_present_modes(
        &self,
        _instance: vk::Instance,
        _physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
        count: &mut u32,
        modes: *mut vk::PresentModeKHR,
    ) -> vk::Result {
        let mut state = self.state.lock();
        if let Err(result) = state.record("get_physical_device_surface_present_modes", None) {
            return result;
        }
        // SAFETY: forwarded caller contract
        unsafe { fill(&state.present_modes, count, modes) }
    }

    unsafe fn destroy_device(&self, _device: vk::Device, allocator: Option<&vk::AllocationCallbacks>) {
        let _ = self.state.lock().record("destroy_device", allocator);
    }

    unsafe fn get_device_queue(&self, _device: vk::Device, queue_family_index: u32, queue_index: u32) -> vk::Queue {
        let _ = self.state.lock().record("get_device_queue", None);
        vk::Queue::from_raw(QUEUE_BASE + u64::from(queue_family_index) * 16 + u64::from(queue_index))
    }

    unsafe fn create_swapchain(
        &self,
        _device: vk::Device,
        create_info: &vk::SwapchainCreateInfoKHR,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::SwapchainKHR> {
        let mut state = self.state.lock();
        state.record("create_swapchain", allocator)?;
        state.swapchain_created = Some(CreatedSwapchain {
            surface: create_info.surface,
            min_image_count: create_info.min_image_count,
            format: create_info.image_format,
            color_space: create_info.image_color_space,
            extent: create_info.image_extent,
            usage: create_info.image_usage,
            present_mode: create_info.present_mode,
            pre_transform: create_info.pre_transform,
            composite_alpha: create_info.composite_alpha,
            clipped: create_info.clipped == vk::TRUE,
        });
        let raw = state.next(SWAPCHAIN_BASE);
        Ok(vk::SwapchainKHR::from_raw(raw))
    }

    unsafe fn destroy_swapchain(
        &self,
        _device: vk::Device,
        _swapchain: vk::SwapchainKHR,
        allocator: Option<&vk::AllocationCallbacks>,
    ) {
        let _ = self.state.lock().record("destroy_swapchain", allocator);
    }

    unsafe fn get_swapchain_images(
        &self,
        _device: vk::Device,
        _swapchain: vk::SwapchainKHR,
        count: &mut u32,
        images: *mut vk::Image,
    ) -> vk::Result {
        let mut state = self.state.lock();
        if let Err(result) = state.record("get_swapchain_images", None) {
            return result;
        }
        let items: Vec<_> = (0..u64::from(state.swapchain_image_count))
            .map(|index| vk::Image::from_raw(IMAGE_BASE + index))
            .collect();
        // SAFETY: forwarded caller contract
        unsafe { fill(&items, count, images) }
    }

    unsafe fn create_image_view(
        &self,
        _device: vk::Device,
        create_info: &vk::ImageViewCreateInfo,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::ImageView> {
        let mut state = self.state.lock();
        state.record("create_image_view", allocator)?;
        state.image_views_created.push((create_info.image, create_info.format));
        let raw = state.next(IMAGE_VIEW_BASE);
        Ok(vk::ImageView::from_raw(raw))
    }

    unsafe fn destroy_image_view(
        &self,
        _device: vk::Device,
        _image_view: vk::ImageView,
        allocator: Option<&vk::AllocationCallbacks>,
    ) {
        let _ = self.state.lock().record("destroy_image_view", allocator);
    }
}

/// Image the fake swapchain hands out at `index`
pub fn swapchain_image(index: u64) -> vk::Image {
    vk::Image::from_raw(IMAGE_BASE + index)
}

/// Instance, logical device (with VK_KHR_swapchain) and headless surface on
/// the default selection
pub fn presentable(fake: &FakeApi) -> (InstanceHandle, LogicalDeviceHandle, SurfaceHandle) {
    let instance = InstanceHandle::create(fake.api(), &InstanceDescriptor::default(), None)
        .expect("fake instance");
    let selection = instance
        .select_physical_device_and_queue_family(&SelectionPolicy::default())
        .expect("fake selection");
    let extensions = ["VK_KHR_swapchain".to_string()].into_iter().collect();
    let device = LogicalDeviceHandle::create(
        &instance,
        selection,
        &extensions,
        &vk::PhysicalDeviceFeatures::default(),
        None,
    )
    .expect("fake device");
    let surface = SurfaceHandle::create_for_queue(&instance, &SurfaceDescriptor::Headless, selection, None)
        .expect("fake surface");
    (instance, device, surface)
}
