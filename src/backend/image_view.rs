// Image views over swapchain images
//
// A view pins the logical device only. It does not pin the swapchain that
// owns the image; whoever holds both must drop the views first.

use ash::vk;
use std::fmt;
use std::sync::Arc;

use super::allocator::{callbacks, Allocator};
use super::device::{Device, LogicalDeviceHandle};
use super::handle::{Handle, NativeObject};
use super::HandleError;

pub struct ImageViewDescriptor;

impl ImageViewDescriptor {
    /// Single-level, single-layer color view with identity swizzle
    pub fn color_2d(image: vk::Image, format: vk::Format) -> vk::ImageViewCreateInfo {
        vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            })
            .build()
    }
}

pub struct ImageView {
    raw: vk::ImageView,
    image: vk::Image,
    allocator: Allocator,
    device: Arc<Device>,
}

pub type ImageViewHandle = Handle<ImageView>;

impl NativeObject for ImageView {
    const KIND: &'static str = "image view";
}

impl fmt::Debug for ImageView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageView")
            .field("raw", &self.raw)
            .field("image", &self.image)
            .field("device", &self.device.raw())
            .finish_non_exhaustive()
    }
}

impl ImageView {
    pub fn raw(&self) -> vk::ImageView {
        self.raw
    }

    pub fn image(&self) -> vk::Image {
        self.image
    }
}

impl Drop for ImageView {
    fn drop(&mut self) {
        log::debug!("Destroying image view {:?}", self.raw);
        // SAFETY: the device is released only after this call
        unsafe {
            self.device
                .instance()
                .api()
                .destroy_image_view(self.device.raw(), self.raw, callbacks(&self.allocator))
        };
    }
}

impl ImageViewHandle {
    /// No validation beyond the native call's own status
    pub fn create(
        device: &LogicalDeviceHandle,
        create_info: &vk::ImageViewCreateInfo,
        allocator: Allocator,
    ) -> Result<Self, HandleError> {
        let device = device.pin()?;

        // SAFETY: the device is pinned, create_info is fully initialised
        let raw = unsafe {
            device
                .instance()
                .api()
                .create_image_view(device.raw(), create_info, callbacks(&allocator))
        }
        .map_err(|result| HandleError::creation("image view", result))?;

        Ok(Handle::new(ImageView {
            raw,
            image: create_info.image,
            allocator,
            device,
        }))
    }

    /// Raw view, null for an invalid handle
    pub fn raw(&self) -> vk::ImageView {
        self.object().map_or(vk::ImageView::null(), ImageView::raw)
    }

    pub fn image(&self) -> vk::Image {
        self.object().map_or(vk::Image::null(), ImageView::image)
    }
}
