// Physical device + queue family selection
//
// Devices and queue families are walked in enumeration order. The first
// device whose type matches the policy ends the device search: its first
// qualifying queue family wins, and if it has none the selection fails
// without looking at later devices.

use ash::vk;

use super::NativeBuffer;

/// The pair a logical device is created from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSelection {
    pub physical_device: vk::PhysicalDevice,
    pub queue_family_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPolicy {
    pub device_type: vk::PhysicalDeviceType,
    pub queue_flags: vk::QueueFlags,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
            queue_flags: vk::QueueFlags::GRAPHICS,
        }
    }
}

impl SelectionPolicy {
    pub fn graphics(device_type: vk::PhysicalDeviceType) -> Self {
        Self {
            device_type,
            ..Self::default()
        }
    }
}

/// Queries the selector needs from whoever owns the device list
pub trait PhysicalDeviceQuery {
    fn physical_devices(&self) -> NativeBuffer<vk::PhysicalDevice>;

    fn device_type(&self, physical_device: vk::PhysicalDevice) -> vk::PhysicalDeviceType;

    fn queue_families(&self, physical_device: vk::PhysicalDevice) -> NativeBuffer<vk::QueueFamilyProperties>;
}

/// Pick a device and queue family.
///
/// `presents` is asked about every family that already has the policy's
/// queue flags; pass `|_, _| true` when no surface is involved.
pub fn select_device_and_queue_family<Q, P>(
    query: &Q,
    policy: &SelectionPolicy,
    mut presents: P,
) -> Option<DeviceSelection>
where
    Q: PhysicalDeviceQuery + ?Sized,
    P: FnMut(vk::PhysicalDevice, u32) -> bool,
{
    let devices = query.physical_devices();

    let physical_device = devices
        .iter()
        .copied()
        .find(|&device| query.device_type(device) == policy.device_type)?;

    let families = query.queue_families(physical_device);
    let selection = families
        .iter()
        .enumerate()
        .map(|(index, family)| (index as u32, family))
        .find(|&(index, family)| {
            family.queue_count > 0
                && family.queue_flags.contains(policy.queue_flags)
                && presents(physical_device, index)
        })
        .map(|(queue_family_index, _)| DeviceSelection {
            physical_device,
            queue_family_index,
        });

    match selection {
        Some(selection) => log::info!(
            "Selected {:?} {:?}, queue family {}",
            policy.device_type,
            selection.physical_device,
            selection.queue_family_index
        ),
        None => log::warn!(
            "First {:?} device has no queue family with {:?}",
            policy.device_type,
            policy.queue_flags
        ),
    }

    selection
}
