// Backend module - Vulkan handle chain
//
// Every native object is wrapped in a Handle<T>. Objects hold Arc
// references on what they depend on, so a dependency always outlives its
// dependents no matter in which order the handles are released.

pub mod allocator;
pub mod api;
pub mod device;
pub mod error;
pub mod handle;
pub mod image_view;
pub mod instance;
pub mod native_buffer;
pub mod negotiate;
pub mod selector;
pub mod surface;
pub mod swapchain;

#[cfg(test)]
pub(crate) mod testing;

pub use allocator::{AllocationCallbacks, Allocator, HostAllocator, SystemAllocator};
pub use api::{LoadedApi, VulkanApi};
pub use device::{Device, LogicalDeviceHandle};
pub use error::HandleError;
pub use handle::{Handle, NativeObject};
pub use image_view::{ImageView, ImageViewDescriptor, ImageViewHandle};
pub use instance::{Instance, InstanceDescriptor, InstanceHandle, PlatformFns};
pub use native_buffer::NativeBuffer;
pub use negotiate::{negotiate, negotiate_properties, CapabilityName, Negotiated};
pub use selector::{DeviceSelection, PhysicalDeviceQuery, SelectionPolicy};
pub use surface::{Surface, SurfaceDescriptor, SurfaceHandle, SurfaceKind};
pub use swapchain::{Swapchain, SwapchainDescriptor, SwapchainHandle};
