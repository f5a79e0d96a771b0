// Native Vulkan API seam
//
// Every native call made by the backend goes through VulkanApi. Methods
// mirror the Vulkan entry points: raw handles in, status codes out, and the
// count/pointer convention for enumerations (null output = count query).
//
// LoadedApi is the real implementation on top of ash. It keeps the ash
// function tables for each live instance and device, keyed by raw handle.

use ash::extensions::khr;
use ash::prelude::VkResult;
use ash::vk;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::CStr;
use std::ptr;

/// Raw Vulkan entry points used by the handle types.
///
/// # Safety
/// All methods forward to native code. Handles must be live objects created
/// through the same implementation; output pointers must be null or point at
/// `*count` writable elements.
pub trait VulkanApi {
    // --- global -------------------------------------------------------------
    unsafe fn enumerate_instance_extension_properties(
        &self,
        count: &mut u32,
        properties: *mut vk::ExtensionProperties,
    ) -> vk::Result;

    unsafe fn enumerate_instance_layer_properties(
        &self,
        count: &mut u32,
        properties: *mut vk::LayerProperties,
    ) -> vk::Result;

    unsafe fn create_instance(
        &self,
        create_info: &vk::InstanceCreateInfo,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::Instance>;

    // --- instance -----------------------------------------------------------
    unsafe fn destroy_instance(&self, instance: vk::Instance, allocator: Option<&vk::AllocationCallbacks>);

    unsafe fn get_instance_proc_addr(&self, instance: vk::Instance, name: &CStr) -> vk::PFN_vkVoidFunction;

    unsafe fn enumerate_physical_devices(
        &self,
        instance: vk::Instance,
        count: &mut u32,
        devices: *mut vk::PhysicalDevice,
    ) -> vk::Result;

    unsafe fn get_physical_device_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties;

    unsafe fn get_physical_device_queue_family_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        count: &mut u32,
        properties: *mut vk::QueueFamilyProperties,
    );

    unsafe fn enumerate_device_extension_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        count: &mut u32,
        properties: *mut vk::ExtensionProperties,
    ) -> vk::Result;

    unsafe fn get_physical_device_features(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceFeatures;

    unsafe fn get_physical_device_image_format_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
    ) -> VkResult<vk::ImageFormatProperties>;

    unsafe fn create_device(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        create_info: &vk::DeviceCreateInfo,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::Device>;

    // --- surface (VK_KHR_surface) -------------------------------------------
    unsafe fn destroy_surface(
        &self,
        instance: vk::Instance,
        surface: vk::SurfaceKHR,
        allocator: Option<&vk::AllocationCallbacks>,
    );

    unsafe fn get_physical_device_surface_support(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;

    unsafe fn get_physical_device_surface_capabilities(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR>;

    unsafe fn get_physical_device_surface_formats(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        count: &mut u32,
        formats: *mut vk::SurfaceFormatKHR,
    ) -> vk::Result;

    unsafe fn get_physical_device_surface_present_modes(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        count: &mut u32,
        modes: *mut vk::PresentModeKHR,
    ) -> vk::Result;

    // --- device -------------------------------------------------------------
    unsafe fn destroy_device(&self, device: vk::Device, allocator: Option<&vk::AllocationCallbacks>);

    unsafe fn get_device_queue(&self, device: vk::Device, queue_family_index: u32, queue_index: u32) -> vk::Queue;

    unsafe fn create_swapchain(
        &self,
        device: vk::Device,
        create_info: &vk::SwapchainCreateInfoKHR,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::SwapchainKHR>;

    unsafe fn destroy_swapchain(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
        allocator: Option<&vk::AllocationCallbacks>,
    );

    unsafe fn get_swapchain_images(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
        count: &mut u32,
        images: *mut vk::Image,
    ) -> vk::Result;

    unsafe fn create_image_view(
        &self,
        device: vk::Device,
        create_info: &vk::ImageViewCreateInfo,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::ImageView>;

    unsafe fn destroy_image_view(
        &self,
        device: vk::Device,
        image_view: vk::ImageView,
        allocator: Option<&vk::AllocationCallbacks>,
    );
}

// =============================================================================
// LoadedApi
// =============================================================================

struct InstanceFns {
    instance: ash::Instance,
    surface: khr::Surface,
}

struct DeviceFns {
    device: ash::Device,
    swapchain: khr::Swapchain,
}

/// [`VulkanApi`] backed by the system Vulkan loader
pub struct LoadedApi {
    entry: ash::Entry,
    instances: Mutex<HashMap<vk::Instance, InstanceFns>>,
    devices: Mutex<HashMap<vk::Device, DeviceFns>>,
}

impl LoadedApi {
    /// Load the Vulkan library
    ///
    /// # Safety
    /// Loading runs arbitrary library initialisation code, see
    /// [`ash::Entry::load`].
    pub unsafe fn load() -> Result<Self, ash::LoadingError> {
        // SAFETY: forwarded caller contract
        let entry = unsafe { ash::Entry::load() }?;
        log::info!("Loaded Vulkan library");

        Ok(Self::from_entry(entry))
    }

    pub fn from_entry(entry: ash::Entry) -> Self {
        Self {
            entry,
            instances: Mutex::new(HashMap::new()),
            devices: Mutex::new(HashMap::new()),
        }
    }

    fn with_instance<R>(&self, instance: vk::Instance, f: impl FnOnce(&InstanceFns) -> R) -> Option<R> {
        let instances = self.instances.lock();
        let fns = instances.get(&instance);
        if fns.is_none() {
            log::error!("Unknown Vulkan instance {:?}", instance);
        }
        fns.map(f)
    }

    fn with_device<R>(&self, device: vk::Device, f: impl FnOnce(&DeviceFns) -> R) -> Option<R> {
        let devices = self.devices.lock();
        let fns = devices.get(&device);
        if fns.is_none() {
            log::error!("Unknown Vulkan device {:?}", device);
        }
        fns.map(f)
    }
}

const UNKNOWN_HANDLE: vk::Result = vk::Result::ERROR_INITIALIZATION_FAILED;

impl VulkanApi for LoadedApi {
    unsafe fn enumerate_instance_extension_properties(
        &self,
        count: &mut u32,
        properties: *mut vk::ExtensionProperties,
    ) -> vk::Result {
        // SAFETY: forwarded caller contract
        unsafe { (self.entry.fp_v1_0().enumerate_instance_extension_properties)(ptr::null(), count, properties) }
    }

    unsafe fn enumerate_instance_layer_properties(
        &self,
        count: &mut u32,
        properties: *mut vk::LayerProperties,
    ) -> vk::Result {
        // SAFETY: forwarded caller contract
        unsafe { (self.entry.fp_v1_0().enumerate_instance_layer_properties)(count, properties) }
    }

    unsafe fn create_instance(
        &self,
        create_info: &vk::InstanceCreateInfo,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::Instance> {
        // SAFETY: forwarded caller contract
        let instance = unsafe { self.entry.create_instance(create_info, allocator) }?;
        let surface = khr::Surface::new(&self.entry, &instance);
        let raw = instance.handle();

        self.instances.lock().insert(raw, InstanceFns { instance, surface });
        Ok(raw)
    }

    unsafe fn destroy_instance(&self, instance: vk::Instance, allocator: Option<&vk::AllocationCallbacks>) {
        match self.instances.lock().remove(&instance) {
            // SAFETY: forwarded caller contract
            Some(fns) => unsafe { fns.instance.destroy_instance(allocator) },
            None => log::error!("Unknown Vulkan instance {:?}", instance),
        }
    }

    unsafe fn get_instance_proc_addr(&self, instance: vk::Instance, name: &CStr) -> vk::PFN_vkVoidFunction {
        // SAFETY: name is nul-terminated, instance is live
        unsafe { self.entry.get_instance_proc_addr(instance, name.as_ptr()) }
    }

    unsafe fn enumerate_physical_devices(
        &self,
        instance: vk::Instance,
        count: &mut u32,
        devices: *mut vk::PhysicalDevice,
    ) -> vk::Result {
        self.with_instance(instance, |fns| {
            // SAFETY: forwarded caller contract
            unsafe { (fns.instance.fp_v1_0().enumerate_physical_devices)(instance, count, devices) }
        })
        .unwrap_or(UNKNOWN_HANDLE)
    }

    unsafe fn get_physical_device_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties {
        self.with_instance(instance, |fns| {
            // SAFETY: physical_device belongs to instance
            unsafe { fns.instance.get_physical_device_properties(physical_device) }
        })
        .unwrap_or_default()
    }

    unsafe fn get_physical_device_queue_family_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        count: &mut u32,
        properties: *mut vk::QueueFamilyProperties,
    ) {
        let known = self.with_instance(instance, |fns| {
            // SAFETY: forwarded caller contract
            unsafe {
                (fns.instance.fp_v1_0().get_physical_device_queue_family_properties)(
                    physical_device,
                    &mut *count,
                    properties,
                )
            }
        });
        if known.is_none() {
            *count = 0;
        }
    }

    unsafe fn enumerate_device_extension_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        count: &mut u32,
        properties: *mut vk::ExtensionProperties,
    ) -> vk::Result {
        self.with_instance(instance, |fns| {
            // SAFETY: forwarded caller contract
            unsafe {
                (fns.instance.fp_v1_0().enumerate_device_extension_properties)(
                    physical_device,
                    ptr::null(),
                    count,
                    properties,
                )
            }
        })
        .unwrap_or(UNKNOWN_HANDLE)
    }

    unsafe fn get_physical_device_features(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceFeatures {
        self.with_instance(instance, |fns| {
            // SAFETY: physical_device belongs to instance
            unsafe { fns.instance.get_physical_device_features(physical_device) }
        })
        .unwrap_or_default()
    }

    unsafe fn get_physical_device_image_format_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
    ) -> VkResult<vk::ImageFormatProperties> {
        self.with_instance(instance, |fns| {
            // SAFETY: physical_device belongs to instance
            unsafe {
                fns.instance.get_physical_device_image_format_properties(
                    physical_device,
                    format,
                    vk::ImageType::TYPE_2D,
                    vk::ImageTiling::OPTIMAL,
                    usage,
                    vk::ImageCreateFlags::empty(),
                )
            }
        })
        .unwrap_or(Err(UNKNOWN_HANDLE))
    }

    unsafe fn create_device(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        create_info: &vk::DeviceCreateInfo,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::Device> {
        let created = self.with_instance(instance, |fns| {
            // SAFETY: forwarded caller contract
            let device = unsafe { fns.instance.create_device(physical_device, create_info, allocator) }?;
            let swapchain = khr::Swapchain::new(&fns.instance, &device);
            Ok(DeviceFns { device, swapchain })
        });

        let fns = created.unwrap_or(Err(UNKNOWN_HANDLE))?;
        let raw = fns.device.handle();
        self.devices.lock().insert(raw, fns);
        Ok(raw)
    }

    unsafe fn destroy_surface(
        &self,
        instance: vk::Instance,
        surface: vk::SurfaceKHR,
        allocator: Option<&vk::AllocationCallbacks>,
    ) {
        self.with_instance(instance, |fns| {
            // SAFETY: surface belongs to instance
            unsafe { fns.surface.destroy_surface(surface, allocator) }
        });
    }

    unsafe fn get_physical_device_surface_support(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        self.with_instance(instance, |fns| {
            // SAFETY: forwarded caller contract
            unsafe {
                fns.surface
                    .get_physical_device_surface_support(physical_device, queue_family_index, surface)
            }
        })
        .unwrap_or(Err(UNKNOWN_HANDLE))
    }

    unsafe fn get_physical_device_surface_capabilities(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        self.with_instance(instance, |fns| {
            // SAFETY: forwarded caller contract
            unsafe { fns.surface.get_physical_device_surface_capabilities(physical_device, surface) }
        })
        .unwrap_or(Err(UNKNOWN_HANDLE))
    }

    unsafe fn get_physical_device_surface_formats(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        count: &mut u32,
        formats: *mut vk::SurfaceFormatKHR,
    ) -> vk::Result {
        self.with_instance(instance, |fns| {
            // SAFETY: forwarded caller contract
            unsafe {
                (fns.surface.fp().get_physical_device_surface_formats_khr)(physical_device, surface, count, formats)
            }
        })
        .unwrap_or(UNKNOWN_HANDLE)
    }

    unsafe fn get_physical_device_surface_present_modes(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        count: &mut u32,
        modes: *mut vk::PresentModeKHR,
    ) -> vk::Result {
        self.with_instance(instance, |fns| {
            // SAFETY: forwarded caller contract
            unsafe {
                (fns.surface.fp().get_physical_device_surface_present_modes_khr)(physical_device, surface, count, modes)
            }
        })
        .unwrap_or(UNKNOWN_HANDLE)
    }

    unsafe fn destroy_device(&self, device: vk::Device, allocator: Option<&vk::AllocationCallbacks>) {
        match self.devices.lock().remove(&device) {
            // SAFETY: forwarded caller contract
            Some(fns) => unsafe { fns.device.destroy_device(allocator) },
            None => log::error!("Unknown Vulkan device {:?}", device),
        }
    }

    unsafe fn get_device_queue(&self, device: vk::Device, queue_family_index: u32, queue_index: u32) -> vk::Queue {
        self.with_device(device, |fns| {
            // SAFETY: the queue was requested at device creation
            unsafe { fns.device.get_device_queue(queue_family_index, queue_index) }
        })
        .unwrap_or_default()
    }

    unsafe fn create_swapchain(
        &self,
        device: vk::Device,
        create_info: &vk::SwapchainCreateInfoKHR,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::SwapchainKHR> {
        self.with_device(device, |fns| {
            // SAFETY: forwarded caller contract
            unsafe { fns.swapchain.create_swapchain(create_info, allocator) }
        })
        .unwrap_or(Err(UNKNOWN_HANDLE))
    }

    unsafe fn destroy_swapchain(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
        allocator: Option<&vk::AllocationCallbacks>,
    ) {
        self.with_device(device, |fns| {
            // SAFETY: swapchain belongs to device
            unsafe { fns.swapchain.destroy_swapchain(swapchain, allocator) }
        });
    }

    unsafe fn get_swapchain_images(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
        count: &mut u32,
        images: *mut vk::Image,
    ) -> vk::Result {
        self.with_device(device, |fns| {
            // SAFETY: forwarded caller contract
            unsafe { (fns.swapchain.fp().get_swapchain_images_khr)(device, swapchain, count, images) }
        })
        .unwrap_or(UNKNOWN_HANDLE)
    }

    unsafe fn create_image_view(
        &self,
        device: vk::Device,
        create_info: &vk::ImageViewCreateInfo,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::ImageView> {
        self.with_device(device, |fns| {
            // SAFETY: forwarded caller contract
            unsafe { fns.device.create_image_view(create_info, allocator) }
        })
        .unwrap_or(Err(UNKNOWN_HANDLE))
    }

    unsafe fn destroy_image_view(
        &self,
        device: vk::Device,
        image_view: vk::ImageView,
        allocator: Option<&vk::AllocationCallbacks>,
    ) {
        self.with_device(device, |fns| {
            // SAFETY: image_view belongs to device
            unsafe { fns.device.destroy_image_view(image_view, allocator) }
        });
    }
}
