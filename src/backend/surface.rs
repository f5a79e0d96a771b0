// Surface - window system connection
//
// A surface pins its instance for its whole lifetime. Creation is routed
// through the instance's resolved platform constructor for the descriptor
// kind.

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use std::ffi::c_void;
use std::fmt;
use std::sync::Arc;

use super::allocator::{callbacks, Allocator};
use super::handle::{Handle, NativeObject};
use super::instance::{Instance, InstanceHandle};
use super::native_buffer::enumerate;
use super::selector::DeviceSelection;
use super::{HandleError, NativeBuffer};

/// Which platform constructor a descriptor needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Win32,
    Wayland,
    Android,
    Headless,
    Vi,
}

impl SurfaceKind {
    /// Instance extension that provides the constructor for this kind
    pub fn extension_name(self) -> &'static str {
        match self {
            Self::Win32 => "VK_KHR_win32_surface",
            Self::Wayland => "VK_KHR_wayland_surface",
            Self::Android => "VK_KHR_android_surface",
            Self::Headless => "VK_EXT_headless_surface",
            Self::Vi => "VK_NN_vi_surface",
        }
    }
}

/// Platform window identifiers for surface creation
#[derive(Debug, Clone, Copy)]
pub enum SurfaceDescriptor {
    Win32 {
        hinstance: *const c_void,
        hwnd: *const c_void,
    },
    Wayland {
        display: *mut c_void,
        surface: *mut c_void,
    },
    Android {
        window: *mut c_void,
    },
    Headless,
    Vi {
        window: *mut c_void,
    },
}

impl SurfaceDescriptor {
    pub fn kind(&self) -> SurfaceKind {
        match self {
            Self::Win32 { .. } => SurfaceKind::Win32,
            Self::Wayland { .. } => SurfaceKind::Wayland,
            Self::Android { .. } => SurfaceKind::Android,
            Self::Headless => SurfaceKind::Headless,
            Self::Vi { .. } => SurfaceKind::Vi,
        }
    }

    /// Build a descriptor from a window's raw handles
    pub fn from_window<W>(window: &W) -> Result<Self, HandleError>
    where
        W: HasWindowHandle + HasDisplayHandle + ?Sized,
    {
        let window_handle = window
            .window_handle()
            .map_err(|e| HandleError::UnsupportedWindowSystem(e.to_string()))?
            .as_raw();
        let display_handle = window
            .display_handle()
            .map_err(|e| HandleError::UnsupportedWindowSystem(e.to_string()))?
            .as_raw();

        Self::from_raw(display_handle, window_handle)
    }

    pub fn from_raw(display: RawDisplayHandle, window: RawWindowHandle) -> Result<Self, HandleError> {
        match (display, window) {
            (RawDisplayHandle::Windows(_), RawWindowHandle::Win32(handle)) => Ok(Self::Win32 {
                hinstance: handle.hinstance.map_or(0, |h| h.get()) as *const c_void,
                hwnd: handle.hwnd.get() as *const c_void,
            }),
            (RawDisplayHandle::Wayland(display), RawWindowHandle::Wayland(window)) => Ok(Self::Wayland {
                display: display.display.as_ptr(),
                surface: window.surface.as_ptr(),
            }),
            (RawDisplayHandle::Android(_), RawWindowHandle::AndroidNdk(window)) => Ok(Self::Android {
                window: window.a_native_window.as_ptr(),
            }),
            (display, window) => Err(HandleError::UnsupportedWindowSystem(format!(
                "{:?} / {:?}",
                display, window
            ))),
        }
    }
}

/// A live `VkSurfaceKHR`
pub struct Surface {
    raw: vk::SurfaceKHR,
    allocator: Allocator,
    instance: Arc<Instance>,
}

pub type SurfaceHandle = Handle<Surface>;

impl NativeObject for Surface {
    const KIND: &'static str = "surface";
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("raw", &self.raw)
            .field("instance", &self.instance.raw())
            .finish_non_exhaustive()
    }
}

impl Surface {
    pub fn raw(&self) -> vk::SurfaceKHR {
        self.raw
    }

    pub(crate) fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn is_physical_device_supported(&self, physical_device: vk::PhysicalDevice, queue_family_index: u32) -> bool {
        // SAFETY: the surface and instance are alive while self is
        let supported = unsafe {
            self.instance.api().get_physical_device_surface_support(
                self.instance.raw(),
                physical_device,
                queue_family_index,
                self.raw,
            )
        };

        supported.unwrap_or_else(|result| {
            log::debug!("Surface support query failed: {}", result);
            false
        })
    }

    pub fn capabilities(&self, physical_device: vk::PhysicalDevice) -> Result<vk::SurfaceCapabilitiesKHR, HandleError> {
        // SAFETY: the surface and instance are alive while self is
        unsafe {
            self.instance
                .api()
                .get_physical_device_surface_capabilities(self.instance.raw(), physical_device, self.raw)
        }
        .map_err(|result| HandleError::EnumerationFailed {
            what: "surface capabilities",
            result,
        })
    }

    pub fn formats(&self, physical_device: vk::PhysicalDevice) -> Result<NativeBuffer<vk::SurfaceFormatKHR>, HandleError> {
        let api = self.instance.api();
        enumerate(vk::SurfaceFormatKHR::default(), |count, out| {
            // SAFETY: out is null or holds `count` slots
            unsafe { api.get_physical_device_surface_formats(self.instance.raw(), physical_device, self.raw, count, out) }
        })
        .map_err(|result| HandleError::EnumerationFailed {
            what: "surface formats",
            result,
        })
    }

    pub fn present_modes(&self, physical_device: vk::PhysicalDevice) -> Result<NativeBuffer<vk::PresentModeKHR>, HandleError> {
        let api = self.instance.api();
        enumerate(vk::PresentModeKHR::FIFO, |count, out| {
            // SAFETY: out is null or holds `count` slots
            unsafe {
                api.get_physical_device_surface_present_modes(self.instance.raw(), physical_device, self.raw, count, out)
            }
        })
        .map_err(|result| HandleError::EnumerationFailed {
            what: "surface present modes",
            result,
        })
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        log::debug!("Destroying surface {:?}", self.raw);
        // SAFETY: no swapchain pins this surface any more; the instance is
        // released only after this call, when the fields drop
        unsafe {
            self.instance
                .api()
                .destroy_surface(self.instance.raw(), self.raw, callbacks(&self.allocator))
        };
    }
}

impl SurfaceHandle {
    pub fn create(
        instance: &InstanceHandle,
        descriptor: &SurfaceDescriptor,
        allocator: Allocator,
    ) -> Result<Self, HandleError> {
        let instance = instance.pin()?;
        let raw = instance.create_raw_surface(descriptor, &allocator)?;

        log::info!("Created {:?} surface {:?}", descriptor.kind(), raw);
        Ok(Handle::new(Surface {
            raw,
            allocator,
            instance,
        }))
    }

    /// Create a surface and check that `selection` can present to it.
    ///
    /// When it cannot, the surface is destroyed again and
    /// [`HandleError::PresentationUnsupported`] is returned.
    pub fn create_for_queue(
        instance: &InstanceHandle,
        descriptor: &SurfaceDescriptor,
        selection: DeviceSelection,
        allocator: Allocator,
    ) -> Result<Self, HandleError> {
        let surface = Self::create(instance, descriptor, allocator)?;

        if !surface.is_physical_device_supported(selection.physical_device, selection.queue_family_index) {
            log::warn!(
                "Queue family {} of {:?} cannot present to the surface",
                selection.queue_family_index,
                selection.physical_device
            );
            return Err(HandleError::PresentationUnsupported {
                queue_family_index: selection.queue_family_index,
            });
        }

        Ok(surface)
    }

    /// Raw surface, null for an invalid handle
    pub fn raw(&self) -> vk::SurfaceKHR {
        self.object().map_or(vk::SurfaceKHR::null(), Surface::raw)
    }

    /// `false` for an invalid handle or when the query itself fails
    pub fn is_physical_device_supported(&self, physical_device: vk::PhysicalDevice, queue_family_index: u32) -> bool {
        match self.pin() {
            Ok(surface) => surface.is_physical_device_supported(physical_device, queue_family_index),
            Err(_) => false,
        }
    }

    pub fn capabilities(&self, physical_device: vk::PhysicalDevice) -> Result<vk::SurfaceCapabilitiesKHR, HandleError> {
        self.pin()?.capabilities(physical_device)
    }

    pub fn formats(&self, physical_device: vk::PhysicalDevice) -> Result<NativeBuffer<vk::SurfaceFormatKHR>, HandleError> {
        self.pin()?.formats(physical_device)
    }

    pub fn present_modes(&self, physical_device: vk::PhysicalDevice) -> Result<NativeBuffer<vk::PresentModeKHR>, HandleError> {
        self.pin()?.present_modes(physical_device)
    }
}
