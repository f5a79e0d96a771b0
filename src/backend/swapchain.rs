// Swapchain - Window presentation
//
// Owns the swapchain and the list of images the presentation engine hands
// out for it. The images themselves belong to the presentation engine and
// are never destroyed here.
//
// Creation is linear, no retries:
//   1. image format + usage must be creatable on the physical device
//   2. (format, color space) must be one of the surface's formats
//   3. present mode must be one of the surface's present modes
//   4. create the swapchain
//   5. enumerate its images
// Checks run before the native call so a creation failure is never a
// precondition failure in disguise.

use ash::vk;
use std::fmt;
use std::sync::Arc;

use super::allocator::{callbacks, Allocator};
use super::device::{Device, LogicalDeviceHandle};
use super::handle::{Handle, NativeObject};
use super::native_buffer::enumerate;
use super::surface::{Surface, SurfaceHandle};
use super::{HandleError, NativeBuffer};

/// Everything the swapchain create-info needs besides the surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapchainDescriptor {
    pub min_image_count: u32,
    pub format: vk::Format,
    pub color_space: vk::ColorSpaceKHR,
    pub extent: vk::Extent2D,
    pub array_layers: u32,
    pub usage: vk::ImageUsageFlags,
    pub sharing_mode: vk::SharingMode,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
    pub present_mode: vk::PresentModeKHR,
    pub clipped: bool,
}

impl SwapchainDescriptor {
    /// Fill the surface-dependent fields from its capabilities.
    ///
    /// Uses the surface's current extent, or its maximum extent when the
    /// surface leaves the size to the swapchain (`0xFFFFFFFF`).
    pub fn from_capabilities(
        caps: &vk::SurfaceCapabilitiesKHR,
        format: vk::Format,
        color_space: vk::ColorSpaceKHR,
        present_mode: vk::PresentModeKHR,
        usage: vk::ImageUsageFlags,
    ) -> Self {
        let extent = if caps.current_extent.width != u32::MAX {
            caps.current_extent
        } else {
            caps.max_image_extent
        };

        Self {
            min_image_count: caps.min_image_count,
            format,
            color_space,
            extent,
            array_layers: 1,
            usage,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            pre_transform: caps.current_transform,
            composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
            present_mode,
            clipped: true,
        }
    }

    fn create_info(&self, surface: vk::SurfaceKHR) -> vk::SwapchainCreateInfoKHR {
        vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(self.min_image_count)
            .image_format(self.format)
            .image_color_space(self.color_space)
            .image_extent(self.extent)
            .image_array_layers(self.array_layers)
            .image_usage(self.usage)
            .image_sharing_mode(self.sharing_mode)
            .pre_transform(self.pre_transform)
            .composite_alpha(self.composite_alpha)
            .present_mode(self.present_mode)
            .clipped(self.clipped)
            .old_swapchain(vk::SwapchainKHR::null())
            .build()
    }
}

/// A live `VkSwapchainKHR` and its images
pub struct Swapchain {
    raw: vk::SwapchainKHR,
    images: NativeBuffer<vk::Image>,
    format: vk::Format,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
    allocator: Allocator,
    device: Arc<Device>,
    surface: Arc<Surface>,
}

pub type SwapchainHandle = Handle<Swapchain>;

impl NativeObject for Swapchain {
    const KIND: &'static str = "swapchain";
}

impl fmt::Debug for Swapchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Swapchain")
            .field("raw", &self.raw)
            .field("images", &self.images.as_slice())
            .field("format", &self.format)
            .field("extent", &self.extent)
            .field("present_mode", &self.present_mode)
            .field("surface", &self.surface.raw())
            .finish_non_exhaustive()
    }
}

impl Swapchain {
    pub fn raw(&self) -> vk::SwapchainKHR {
        self.raw
    }

    /// Image at `index`, null when out of range
    pub fn image(&self, index: usize) -> vk::Image {
        self.images.get(index).unwrap_or_default()
    }

    pub fn images(&self) -> &[vk::Image] {
        self.images.as_slice()
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    fn validate(device: &Device, surface: &Surface, descriptor: &SwapchainDescriptor) -> Result<(), HandleError> {
        let instance = device.instance();
        let physical_device = device.physical_device();

        // SAFETY: physical_device was enumerated from this instance
        let image_format = unsafe {
            instance.api().get_physical_device_image_format_properties(
                instance.raw(),
                physical_device,
                descriptor.format,
                descriptor.usage,
            )
        };
        if let Err(result) = image_format {
            log::warn!("Image format {:?} rejected: {}", descriptor.format, result);
            return Err(HandleError::UnsupportedImageFormat {
                format: descriptor.format,
                usage: descriptor.usage,
            });
        }

        let formats = surface.formats(physical_device)?;
        let format_supported = formats
            .iter()
            .any(|f| f.format == descriptor.format && f.color_space == descriptor.color_space);
        if !format_supported {
            return Err(HandleError::UnsupportedSurfaceFormat {
                format: descriptor.format,
                color_space: descriptor.color_space,
            });
        }

        let present_modes = surface.present_modes(physical_device)?;
        if !present_modes.iter().any(|&mode| mode == descriptor.present_mode) {
            return Err(HandleError::UnsupportedPresentMode(descriptor.present_mode));
        }

        Ok(())
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        log::debug!("Destroying swapchain {:?}", self.raw);
        self.images.release();
        // SAFETY: device and surface are released only after this call
        unsafe {
            self.device.instance().api().destroy_swapchain(
                self.device.raw(),
                self.raw,
                callbacks(&self.allocator),
            )
        };
    }
}

impl SwapchainHandle {
    pub fn create(
        device: &LogicalDeviceHandle,
        surface: &SurfaceHandle,
        descriptor: &SwapchainDescriptor,
        allocator: Allocator,
    ) -> Result<Self, HandleError> {
        let device = device.pin()?;
        let surface = surface.pin()?;

        log::info!(
            "Creating swapchain: {}x{}, {:?}",
            descriptor.extent.width,
            descriptor.extent.height,
            descriptor.present_mode
        );

        Swapchain::validate(&device, &surface, descriptor)?;

        let create_info = descriptor.create_info(surface.raw());

        // SAFETY: the surface and device are pinned, create_info points at
        // nothing but stack data
        let raw = unsafe {
            device
                .instance()
                .api()
                .create_swapchain(device.raw(), &create_info, callbacks(&allocator))
        }
        .map_err(|result| HandleError::creation("swapchain", result))?;

        // From here on Drop destroys the swapchain if enumeration fails
        let mut swapchain = Swapchain {
            raw,
            images: NativeBuffer::empty(),
            format: descriptor.format,
            extent: descriptor.extent,
            present_mode: descriptor.present_mode,
            allocator,
            device,
            surface,
        };

        let device = &swapchain.device;
        let images = enumerate(vk::Image::null(), |count, out| {
            // SAFETY: out is null or holds `count` slots
            unsafe { device.instance().api().get_swapchain_images(device.raw(), raw, count, out) }
        })
        .map_err(|result| HandleError::EnumerationFailed {
            what: "swapchain images",
            result,
        })?;
        swapchain.images = images;

        log::info!("Created swapchain with {} images", swapchain.images.len());
        Ok(Handle::new(swapchain))
    }

    /// Raw swapchain, null for an invalid handle
    pub fn raw(&self) -> vk::SwapchainKHR {
        self.object().map_or(vk::SwapchainKHR::null(), Swapchain::raw)
    }

    /// Image at `index`; null when out of range or the handle is invalid
    pub fn image(&self, index: usize) -> vk::Image {
        self.object().map_or(vk::Image::null(), |swapchain| swapchain.image(index))
    }

    pub fn image_count(&self) -> usize {
        self.images().len()
    }

    pub fn images(&self) -> &[vk::Image] {
        self.object().map(Swapchain::images).unwrap_or(&[])
    }

    pub fn format(&self) -> vk::Format {
        self.object().map_or(vk::Format::UNDEFINED, Swapchain::format)
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.object().map(Swapchain::extent).unwrap_or_default()
    }
}
