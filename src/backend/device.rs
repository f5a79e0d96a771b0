// Vulkan Device - logical device on the selected GPU
//
// Responsibilities:
// - Negotiate device extensions against the physical device's list
// - Enable the requested features the physical device actually has
// - Create exactly one queue (priority 1.0) in the selected family
//
// The device pins the instance it was created from.

use ash::vk;
use std::collections::HashSet;
use std::fmt;
use std::mem;
use std::sync::Arc;

use super::allocator::{callbacks, Allocator};
use super::handle::{Handle, NativeObject};
use super::instance::{Instance, InstanceHandle};
use super::native_buffer::enumerate;
use super::negotiate::{negotiate_properties, report};
use super::selector::DeviceSelection;
use super::{HandleError, NativeBuffer};

const FEATURE_COUNT: usize = mem::size_of::<vk::PhysicalDeviceFeatures>() / mem::size_of::<vk::Bool32>();

fn feature_flags(features: &vk::PhysicalDeviceFeatures) -> &[vk::Bool32] {
    // SAFETY: PhysicalDeviceFeatures is repr(C) and made only of Bool32 fields
    unsafe { std::slice::from_raw_parts((features as *const vk::PhysicalDeviceFeatures).cast(), FEATURE_COUNT) }
}

fn feature_flags_mut(features: &mut vk::PhysicalDeviceFeatures) -> &mut [vk::Bool32] {
    // SAFETY: see feature_flags
    unsafe { std::slice::from_raw_parts_mut((features as *mut vk::PhysicalDeviceFeatures).cast(), FEATURE_COUNT) }
}

/// Features present in both sets
pub fn intersect_features(
    requested: &vk::PhysicalDeviceFeatures,
    supported: &vk::PhysicalDeviceFeatures,
) -> vk::PhysicalDeviceFeatures {
    let mut enabled = vk::PhysicalDeviceFeatures::default();
    for ((enabled, &requested), &supported) in feature_flags_mut(&mut enabled)
        .iter_mut()
        .zip(feature_flags(requested))
        .zip(feature_flags(supported))
    {
        *enabled = if requested == vk::TRUE && supported == vk::TRUE {
            vk::TRUE
        } else {
            vk::FALSE
        };
    }
    enabled
}

fn count_enabled(features: &vk::PhysicalDeviceFeatures) -> usize {
    feature_flags(features).iter().filter(|&&flag| flag == vk::TRUE).count()
}

/// A live `VkDevice` with its single queue
pub struct Device {
    raw: vk::Device,
    physical_device: vk::PhysicalDevice,
    queue_family_index: u32,
    queue: vk::Queue,
    enabled_extensions: Vec<String>,
    enabled_features: vk::PhysicalDeviceFeatures,
    allocator: Allocator,
    instance: Arc<Instance>,
}

pub type LogicalDeviceHandle = Handle<Device>;

impl NativeObject for Device {
    const KIND: &'static str = "logical device";
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("raw", &self.raw)
            .field("physical_device", &self.physical_device)
            .field("queue_family_index", &self.queue_family_index)
            .field("enabled_extensions", &self.enabled_extensions)
            .finish_non_exhaustive()
    }
}

impl Device {
    pub fn raw(&self) -> vk::Device {
        self.raw
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    pub fn enabled_extensions(&self) -> &[String] {
        &self.enabled_extensions
    }

    pub fn enabled_features(&self) -> &vk::PhysicalDeviceFeatures {
        &self.enabled_features
    }

    pub(crate) fn instance(&self) -> &Instance {
        &self.instance
    }

    fn supported_extensions(instance: &Instance, physical_device: vk::PhysicalDevice) -> NativeBuffer<vk::ExtensionProperties> {
        enumerate(vk::ExtensionProperties::default(), |count, out| {
            // SAFETY: out is null or holds `count` slots
            unsafe {
                instance
                    .api()
                    .enumerate_device_extension_properties(instance.raw(), physical_device, count, out)
            }
        })
        .unwrap_or_else(|result| {
            log::warn!("Could not enumerate device extensions: {}", result);
            NativeBuffer::empty()
        })
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan device {:?}", self.raw);
        // SAFETY: swapchains and image views pin the device, none is left
        unsafe {
            self.instance
                .api()
                .destroy_device(self.raw, callbacks(&self.allocator))
        };
    }
}

impl LogicalDeviceHandle {
    /// Create a logical device with one queue in `selection`'s family.
    ///
    /// Only requested features the physical device supports are enabled;
    /// an all-false request enables nothing.
    pub fn create(
        instance: &InstanceHandle,
        selection: DeviceSelection,
        requested_extensions: &HashSet<String>,
        requested_features: &vk::PhysicalDeviceFeatures,
        allocator: Allocator,
    ) -> Result<Self, HandleError> {
        let instance = instance.pin()?;
        let DeviceSelection {
            physical_device,
            queue_family_index,
        } = selection;

        log::info!(
            "Creating logical device on {:?}, queue family {}",
            physical_device,
            queue_family_index
        );

        let supported_extensions = Device::supported_extensions(&instance, physical_device);
        let extensions = negotiate_properties(requested_extensions, supported_extensions.as_slice());
        report("device extension", requested_extensions, &extensions);

        // SAFETY: physical_device was enumerated from this instance
        let supported_features = unsafe {
            instance
                .api()
                .get_physical_device_features(instance.raw(), physical_device)
        };
        let enabled_features = intersect_features(requested_features, &supported_features);
        let dropped = count_enabled(requested_features) - count_enabled(&enabled_features);
        if dropped > 0 {
            log::warn!("{} requested device features are not supported, skipping", dropped);
        }

        let queue_priorities = [1.0];
        let queue_create_info = vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(queue_family_index)
            .queue_priorities(&queue_priorities)
            .build();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(std::slice::from_ref(&queue_create_info))
            .enabled_extension_names(extensions.as_slice())
            .enabled_features(&enabled_features);

        // SAFETY: create_info and everything it points at is alive here
        let raw = unsafe {
            instance
                .api()
                .create_device(instance.raw(), physical_device, &create_info, callbacks(&allocator))
        }
        .map_err(|result| HandleError::creation("logical device", result))?;

        // SAFETY: queue 0 of this family was requested above
        let queue = unsafe { instance.api().get_device_queue(raw, queue_family_index, 0) };

        Ok(Handle::new(Device {
            raw,
            physical_device,
            queue_family_index,
            queue,
            enabled_extensions: extensions.to_strings(),
            enabled_features,
            allocator,
            instance,
        }))
    }

    /// Raw device, null for an invalid handle
    pub fn raw(&self) -> vk::Device {
        self.object().map_or(vk::Device::null(), Device::raw)
    }

    /// The single queue created with the device, null for an invalid handle
    pub fn queue(&self) -> vk::Queue {
        self.object().map_or(vk::Queue::null(), Device::queue)
    }

    pub fn queue_family_index(&self) -> Option<u32> {
        self.object().map(Device::queue_family_index)
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.object().map_or(vk::PhysicalDevice::null(), Device::physical_device)
    }

    pub fn enabled_extensions(&self) -> &[String] {
        self.object().map(Device::enabled_extensions).unwrap_or(&[])
    }

    pub fn enabled_features(&self) -> vk::PhysicalDeviceFeatures {
        self.object().map(|device| device.enabled_features).unwrap_or_default()
    }
}
