// Vulkan Instance - root of the handle chain
//
// Responsibilities:
// - Negotiate instance extensions and layers against what the loader reports
// - Create the instance with application metadata and optional allocator
// - Resolve the platform surface entry points once, by name
// - Enumerate physical devices and pick one for the rest of the chain

use ash::vk;
use std::collections::HashSet;
use std::ffi::{CStr, CString};
use std::fmt;
use std::mem;
use std::ptr;
use std::sync::Arc;

use super::allocator::{callbacks, Allocator};
use super::api::VulkanApi;
use super::handle::{Handle, NativeObject};
use super::native_buffer::enumerate;
use super::negotiate::{negotiate_properties, report};
use super::selector::{select_device_and_queue_family, DeviceSelection, PhysicalDeviceQuery, SelectionPolicy};
use super::surface::{SurfaceDescriptor, SurfaceHandle, SurfaceKind};
use super::{HandleError, NativeBuffer};

/// Application metadata and requested capabilities for instance creation
#[derive(Debug, Clone)]
pub struct InstanceDescriptor {
    pub api_version: u32,
    pub application_name: String,
    pub application_version: u32,
    pub engine_name: String,
    pub engine_version: u32,
    pub extensions: HashSet<String>,
    pub layers: HashSet<String>,
}

impl Default for InstanceDescriptor {
    fn default() -> Self {
        Self {
            api_version: vk::API_VERSION_1_3,
            application_name: "present-chain".to_string(),
            application_version: vk::make_api_version(0, 0, 1, 0),
            engine_name: "present-chain".to_string(),
            engine_version: vk::make_api_version(0, 0, 1, 0),
            extensions: HashSet::new(),
            layers: HashSet::new(),
        }
    }
}

// =============================================================================
// PLATFORM ENTRY POINTS
// =============================================================================

/// Platform-specific instance functions, looked up by name after creation.
///
/// Any of them may be missing; callers check before calling.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformFns {
    pub create_win32_surface: Option<vk::PFN_vkCreateWin32SurfaceKHR>,
    pub create_wayland_surface: Option<vk::PFN_vkCreateWaylandSurfaceKHR>,
    pub create_android_surface: Option<vk::PFN_vkCreateAndroidSurfaceKHR>,
    pub create_headless_surface: Option<vk::PFN_vkCreateHeadlessSurfaceEXT>,
    pub create_vi_surface: Option<vk::PFN_vkCreateViSurfaceNN>,
    pub win32_presentation_support: Option<vk::PFN_vkGetPhysicalDeviceWin32PresentationSupportKHR>,
    pub wayland_presentation_support: Option<vk::PFN_vkGetPhysicalDeviceWaylandPresentationSupportKHR>,
}

unsafe fn resolve<F: Copy>(api: &dyn VulkanApi, instance: vk::Instance, name: &CStr) -> Option<F> {
    debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<unsafe extern "system" fn()>());

    // SAFETY: instance is live, name is nul-terminated
    let function = unsafe { api.get_instance_proc_addr(instance, name) }?;
    // SAFETY: the loader returns the entry point registered under `name`,
    // whose signature is F
    Some(unsafe { mem::transmute_copy::<unsafe extern "system" fn(), F>(&function) })
}

impl PlatformFns {
    /// # Safety
    /// `instance` must be a live instance created through `api`.
    pub unsafe fn resolve(api: &dyn VulkanApi, instance: vk::Instance) -> Self {
        // SAFETY: forwarded caller contract; each name matches its PFN type
        let fns = unsafe {
            Self {
                create_win32_surface: resolve(api, instance, c"vkCreateWin32SurfaceKHR"),
                create_wayland_surface: resolve(api, instance, c"vkCreateWaylandSurfaceKHR"),
                create_android_surface: resolve(api, instance, c"vkCreateAndroidSurfaceKHR"),
                create_headless_surface: resolve(api, instance, c"vkCreateHeadlessSurfaceEXT"),
                create_vi_surface: resolve(api, instance, c"vkCreateViSurfaceNN"),
                win32_presentation_support: resolve(api, instance, c"vkGetPhysicalDeviceWin32PresentationSupportKHR"),
                wayland_presentation_support: resolve(
                    api,
                    instance,
                    c"vkGetPhysicalDeviceWaylandPresentationSupportKHR",
                ),
            }
        };

        log::debug!("Surface entry points: {:?}", fns.available_kinds());
        fns
    }

    /// Surface kinds that have a resolved constructor
    pub fn available_kinds(&self) -> Vec<SurfaceKind> {
        [
            (SurfaceKind::Win32, self.create_win32_surface.is_some()),
            (SurfaceKind::Wayland, self.create_wayland_surface.is_some()),
            (SurfaceKind::Android, self.create_android_surface.is_some()),
            (SurfaceKind::Headless, self.create_headless_surface.is_some()),
            (SurfaceKind::Vi, self.create_vi_surface.is_some()),
        ]
        .into_iter()
        .filter_map(|(kind, resolved)| resolved.then_some(kind))
        .collect()
    }
}

// =============================================================================
// INSTANCE
// =============================================================================

/// A live `VkInstance`; destroyed when the last holder drops it
pub struct Instance {
    api: Arc<dyn VulkanApi>,
    raw: vk::Instance,
    allocator: Allocator,
    platform: PlatformFns,
    enabled_extensions: Vec<String>,
    enabled_layers: Vec<String>,
}

pub type InstanceHandle = Handle<Instance>;

impl NativeObject for Instance {
    const KIND: &'static str = "instance";
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("raw", &self.raw)
            .field("enabled_extensions", &self.enabled_extensions)
            .field("enabled_layers", &self.enabled_layers)
            .finish_non_exhaustive()
    }
}

impl Instance {
    pub fn raw(&self) -> vk::Instance {
        self.raw
    }

    pub(crate) fn api(&self) -> &dyn VulkanApi {
        self.api.as_ref()
    }

    pub fn platform(&self) -> &PlatformFns {
        &self.platform
    }

    pub fn enabled_extensions(&self) -> &[String] {
        &self.enabled_extensions
    }

    pub fn enabled_layers(&self) -> &[String] {
        &self.enabled_layers
    }

    pub(crate) fn create_raw_surface(
        &self,
        descriptor: &SurfaceDescriptor,
        allocator: &Allocator,
    ) -> Result<vk::SurfaceKHR, HandleError> {
        let kind = descriptor.kind();
        let missing = || HandleError::ExtensionNotPresent(kind);
        let p_allocator = callbacks(allocator).map_or(ptr::null(), |c| c as *const vk::AllocationCallbacks);
        let mut surface = vk::SurfaceKHR::null();

        // SAFETY: every create-info is fully initialised and outlives the
        // call; the function pointers were resolved for this instance
        let result = unsafe {
            match *descriptor {
                SurfaceDescriptor::Win32 { hinstance, hwnd } => {
                    let create = self.platform.create_win32_surface.ok_or_else(missing)?;
                    let info = vk::Win32SurfaceCreateInfoKHR::builder()
                        .hinstance(hinstance)
                        .hwnd(hwnd)
                        .build();
                    create(self.raw, &info, p_allocator, &mut surface)
                }
                SurfaceDescriptor::Wayland { display, surface: wl_surface } => {
                    let create = self.platform.create_wayland_surface.ok_or_else(missing)?;
                    let info = vk::WaylandSurfaceCreateInfoKHR::builder()
                        .display(display)
                        .surface(wl_surface)
                        .build();
                    create(self.raw, &info, p_allocator, &mut surface)
                }
                SurfaceDescriptor::Android { window } => {
                    let create = self.platform.create_android_surface.ok_or_else(missing)?;
                    let info = vk::AndroidSurfaceCreateInfoKHR::builder().window(window).build();
                    create(self.raw, &info, p_allocator, &mut surface)
                }
                SurfaceDescriptor::Headless => {
                    let create = self.platform.create_headless_surface.ok_or_else(missing)?;
                    let info = vk::HeadlessSurfaceCreateInfoEXT::default();
                    create(self.raw, &info, p_allocator, &mut surface)
                }
                SurfaceDescriptor::Vi { window } => {
                    let create = self.platform.create_vi_surface.ok_or_else(missing)?;
                    let info = vk::ViSurfaceCreateInfoNN::builder().window(window).build();
                    create(self.raw, &info, p_allocator, &mut surface)
                }
            }
        };

        if result != vk::Result::SUCCESS {
            return Err(HandleError::creation("surface", result));
        }
        Ok(surface)
    }

    fn supported_extensions(api: &dyn VulkanApi) -> NativeBuffer<vk::ExtensionProperties> {
        enumerate(vk::ExtensionProperties::default(), |count, out| {
            // SAFETY: out is null or holds `count` slots
            unsafe { api.enumerate_instance_extension_properties(count, out) }
        })
        .unwrap_or_else(|result| {
            log::warn!("Could not enumerate instance extensions: {}", result);
            NativeBuffer::empty()
        })
    }

    fn supported_layers(api: &dyn VulkanApi) -> NativeBuffer<vk::LayerProperties> {
        enumerate(vk::LayerProperties::default(), |count, out| {
            // SAFETY: out is null or holds `count` slots
            unsafe { api.enumerate_instance_layer_properties(count, out) }
        })
        .unwrap_or_else(|result| {
            log::warn!("Could not enumerate instance layers: {}", result);
            NativeBuffer::empty()
        })
    }
}

impl PhysicalDeviceQuery for Instance {
    fn physical_devices(&self) -> NativeBuffer<vk::PhysicalDevice> {
        enumerate(vk::PhysicalDevice::null(), |count, out| {
            // SAFETY: out is null or holds `count` slots
            unsafe { self.api.enumerate_physical_devices(self.raw, count, out) }
        })
        .unwrap_or_else(|result| {
            log::warn!("Could not enumerate physical devices: {}", result);
            NativeBuffer::empty()
        })
    }

    fn device_type(&self, physical_device: vk::PhysicalDevice) -> vk::PhysicalDeviceType {
        // SAFETY: physical_device was enumerated from this instance
        unsafe { self.api.get_physical_device_properties(self.raw, physical_device) }.device_type
    }

    fn queue_families(&self, physical_device: vk::PhysicalDevice) -> NativeBuffer<vk::QueueFamilyProperties> {
        enumerate(vk::QueueFamilyProperties::default(), |count, out| {
            // SAFETY: out is null or holds `count` slots
            unsafe {
                self.api
                    .get_physical_device_queue_family_properties(self.raw, physical_device, count, out)
            };
            vk::Result::SUCCESS
        })
        .unwrap_or_else(|_| NativeBuffer::empty())
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan instance {:?}", self.raw);
        // SAFETY: every dependent holds an Arc to this object, so none is
        // left when drop runs
        unsafe { self.api.destroy_instance(self.raw, callbacks(&self.allocator)) };
    }
}

impl InstanceHandle {
    /// Create an instance with the negotiated subset of the requested
    /// extensions and layers.
    pub fn create(
        api: Arc<dyn VulkanApi>,
        descriptor: &InstanceDescriptor,
        allocator: Allocator,
    ) -> Result<Self, HandleError> {
        log::info!("Creating Vulkan instance: {}", descriptor.application_name);

        let application_name = CString::new(descriptor.application_name.as_str())
            .map_err(|_| HandleError::InvalidName(descriptor.application_name.clone()))?;
        let engine_name = CString::new(descriptor.engine_name.as_str())
            .map_err(|_| HandleError::InvalidName(descriptor.engine_name.clone()))?;

        // Supported lists must outlive the negotiated pointer arrays
        let supported_extensions = Instance::supported_extensions(api.as_ref());
        let supported_layers = Instance::supported_layers(api.as_ref());

        let extensions = negotiate_properties(&descriptor.extensions, supported_extensions.as_slice());
        let layers = negotiate_properties(&descriptor.layers, supported_layers.as_slice());
        report("instance extension", &descriptor.extensions, &extensions);
        report("instance layer", &descriptor.layers, &layers);

        let app_info = vk::ApplicationInfo::builder()
            .application_name(&application_name)
            .application_version(descriptor.application_version)
            .engine_name(&engine_name)
            .engine_version(descriptor.engine_version)
            .api_version(descriptor.api_version);

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(extensions.as_slice())
            .enabled_layer_names(layers.as_slice());

        // SAFETY: create_info and everything it points at is alive here
        let raw = unsafe { api.create_instance(&create_info, callbacks(&allocator)) }
            .map_err(|result| HandleError::creation("instance", result))?;

        // SAFETY: raw was just created through api
        let platform = unsafe { PlatformFns::resolve(api.as_ref(), raw) };

        log::info!(
            "API Version: {}.{}.{}",
            vk::api_version_major(descriptor.api_version),
            vk::api_version_minor(descriptor.api_version),
            vk::api_version_patch(descriptor.api_version)
        );

        Ok(Handle::new(Instance {
            api,
            raw,
            allocator,
            platform,
            enabled_extensions: extensions.to_strings(),
            enabled_layers: layers.to_strings(),
        }))
    }

    /// Raw instance, null for an invalid handle
    pub fn raw(&self) -> vk::Instance {
        self.object().map_or(vk::Instance::null(), Instance::raw)
    }

    pub fn enabled_extensions(&self) -> &[String] {
        self.object().map(Instance::enabled_extensions).unwrap_or(&[])
    }

    pub fn enabled_layers(&self) -> &[String] {
        self.object().map(Instance::enabled_layers).unwrap_or(&[])
    }

    pub fn platform(&self) -> PlatformFns {
        self.object().map(|instance| instance.platform).unwrap_or_default()
    }

    pub fn physical_devices(&self) -> Result<NativeBuffer<vk::PhysicalDevice>, HandleError> {
        let instance = self.pin()?;
        Ok(instance.physical_devices())
    }

    /// First device of the policy's type, and its first queue family with
    /// the policy's flags
    pub fn select_physical_device_and_queue_family(&self, policy: &SelectionPolicy) -> Option<DeviceSelection> {
        let instance = self.pin().ok()?;
        select_device_and_queue_family(instance.as_ref(), policy, |_, _| true)
    }

    /// Same as [`select_physical_device_and_queue_family`], but the queue
    /// family must also be able to present to `surface`
    ///
    /// [`select_physical_device_and_queue_family`]: Self::select_physical_device_and_queue_family
    pub fn select_physical_device_and_queue_family_for_surface(
        &self,
        policy: &SelectionPolicy,
        surface: &SurfaceHandle,
    ) -> Option<DeviceSelection> {
        let instance = self.pin().ok()?;
        select_device_and_queue_family(instance.as_ref(), policy, |physical_device, family| {
            surface.is_physical_device_supported(physical_device, family)
        })
    }

    /// Create a native surface through the constructor matching the
    /// descriptor's kind. The caller owns the returned surface; prefer
    /// [`SurfaceHandle::create`].
    pub fn create_surface(
        &self,
        descriptor: &SurfaceDescriptor,
        allocator: &Allocator,
    ) -> Result<vk::SurfaceKHR, HandleError> {
        let instance = self.pin()?;
        instance.create_raw_surface(descriptor, allocator)
    }

    /// Ask the window system directly whether a queue family can present.
    ///
    /// `None` when the descriptor's kind has no such query or its entry
    /// point was not resolved.
    pub fn platform_presentation_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        descriptor: &SurfaceDescriptor,
    ) -> Option<bool> {
        let platform = self.object()?.platform;

        // SAFETY: entry points were resolved for this instance and
        // physical_device belongs to it
        let supported = unsafe {
            match *descriptor {
                SurfaceDescriptor::Win32 { .. } => {
                    (platform.win32_presentation_support?)(physical_device, queue_family_index)
                }
                SurfaceDescriptor::Wayland { display, .. } => {
                    (platform.wayland_presentation_support?)(physical_device, queue_family_index, display)
                }
                _ => return None,
            }
        };
        Some(supported == vk::TRUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{self, FakeApi};
    use ash::vk::Handle as _;

    #[test]
    fn negotiates_requested_extensions_and_layers() {
        let fake = FakeApi::new();
        let descriptor = InstanceDescriptor {
            extensions: ["VK_KHR_surface", "VK_EXT_headless_surface", "VK_FOO_unsupported"]
                .into_iter()
                .map(String::from)
                .collect(),
            layers: ["VK_LAYER_KHRONOS_validation"].into_iter().map(String::from).collect(),
            ..InstanceDescriptor::default()
        };

        let instance = InstanceHandle::create(fake.api(), &descriptor, None).unwrap();

        assert!(instance.is_valid());
        assert_eq!(instance.enabled_extensions(), &["VK_KHR_surface", "VK_EXT_headless_surface"]);
        assert_eq!(instance.enabled_layers(), &["VK_LAYER_KHRONOS_validation"]);
        assert_eq!(
            fake.state().instance_extensions_enabled,
            vec!["VK_KHR_surface", "VK_EXT_headless_surface"]
        );
    }

    #[test]
    fn creation_failure_leaves_nothing_behind() {
        let fake = FakeApi::new();
        fake.fail("create_instance", vk::Result::ERROR_INCOMPATIBLE_DRIVER);

        let result = InstanceHandle::create(fake.api(), &InstanceDescriptor::default(), None);

        assert!(matches!(
            result,
            Err(HandleError::CreationFailed {
                object: "instance",
                result: vk::Result::ERROR_INCOMPATIBLE_DRIVER,
            })
        ));
        assert!(!fake.called("destroy_instance"));
        assert!(!fake.called("get_instance_proc_addr"));
    }

    #[test]
    fn unresolved_surface_kind_is_extension_not_present() {
        let fake = FakeApi::new();
        let instance = InstanceHandle::create(fake.api(), &InstanceDescriptor::default(), None).unwrap();

        assert_eq!(instance.platform().available_kinds(), vec![SurfaceKind::Win32, SurfaceKind::Headless]);

        let result = instance.create_surface(&SurfaceDescriptor::Android { window: ptr::null_mut() }, &None);

        assert!(matches!(result, Err(HandleError::ExtensionNotPresent(SurfaceKind::Android))));
    }

    #[test]
    fn surface_creation_dispatches_by_kind() {
        let fake = FakeApi::new();
        let instance = InstanceHandle::create(fake.api(), &InstanceDescriptor::default(), None).unwrap();

        let headless = instance.create_surface(&SurfaceDescriptor::Headless, &None).unwrap();
        let win32 = instance
            .create_surface(
                &SurfaceDescriptor::Win32 {
                    hinstance: ptr::null(),
                    hwnd: ptr::null(),
                },
                &None,
            )
            .unwrap();

        assert_eq!(headless.as_raw(), testing::HEADLESS_SURFACE);
        assert_eq!(win32.as_raw(), testing::WIN32_SURFACE);
    }

    #[test]
    fn selects_through_instance_queries() {
        let fake = FakeApi::new();
        let instance = InstanceHandle::create(fake.api(), &InstanceDescriptor::default(), None).unwrap();

        let selection = instance
            .select_physical_device_and_queue_family(&SelectionPolicy::default())
            .unwrap();

        assert_eq!(selection.physical_device, fake.physical_device(1));
        assert_eq!(selection.queue_family_index, 1);
        assert_eq!(instance.physical_devices().unwrap().len(), 2);
    }

    #[test]
    fn platform_presentation_support_uses_resolved_query() {
        let fake = FakeApi::new();
        let instance = InstanceHandle::create(fake.api(), &InstanceDescriptor::default(), None).unwrap();
        let win32 = SurfaceDescriptor::Win32 {
            hinstance: ptr::null(),
            hwnd: ptr::null(),
        };
        let wayland = SurfaceDescriptor::Wayland {
            display: ptr::null_mut(),
            surface: ptr::null_mut(),
        };

        assert_eq!(instance.platform_presentation_support(fake.physical_device(1), 1, &win32), Some(true));
        assert_eq!(instance.platform_presentation_support(fake.physical_device(1), 1, &wayland), None);
    }

    #[test]
    fn released_instance_refuses_new_work() {
        let fake = FakeApi::new();
        let mut instance = InstanceHandle::create(fake.api(), &InstanceDescriptor::default(), None).unwrap();

        assert!(instance.release());

        assert!(fake.called("destroy_instance"));
        assert!(matches!(
            instance.physical_devices(),
            Err(HandleError::DependencyUnavailable("instance"))
        ));
        assert_eq!(instance.raw(), vk::Instance::null());
    }
}
