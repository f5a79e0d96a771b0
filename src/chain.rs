// =============================================================================
// PRESENTATION CHAIN - instance to image views in one call
// =============================================================================
//
// Builds every handle in dependency order and stops at the first failure.
// Whatever was created before the failure is released on the way out.
//
// Field order is the teardown order: views, swapchain, surface, device,
// instance.

use anyhow::{Context, Result};
use ash::vk;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use crate::backend::{
    AllocationCallbacks, Allocator, DeviceSelection, ImageViewDescriptor, ImageViewHandle, InstanceDescriptor,
    InstanceHandle, LogicalDeviceHandle, SelectionPolicy, SurfaceDescriptor, SurfaceHandle, SwapchainDescriptor,
    SwapchainHandle, SystemAllocator, VulkanApi,
};
use crate::config::Config;

const SURFACE_EXTENSION: &str = "VK_KHR_surface";
const SWAPCHAIN_EXTENSION: &str = "VK_KHR_swapchain";

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("no {device_type:?} device with a {queue_flags:?} queue family")]
    NoSuitableDevice {
        device_type: vk::PhysicalDeviceType,
        queue_flags: vk::QueueFlags,
    },

    #[error("unsupported {what}: {names:?}")]
    MissingCapabilities { what: &'static str, names: Vec<String> },
}

pub struct PresentationChain {
    views: Vec<ImageViewHandle>,
    swapchain: SwapchainHandle,
    surface: SurfaceHandle,
    device: LogicalDeviceHandle,
    instance: InstanceHandle,
    selection: DeviceSelection,
}

/// Requested names the enabled list is missing, sorted for stable messages
fn missing(requested: &HashSet<String>, enabled: &[String]) -> Vec<String> {
    let mut names: Vec<String> = requested
        .iter()
        .filter(|name| !enabled.contains(name))
        .cloned()
        .collect();
    names.sort();
    names
}

fn require_all(
    strict: bool,
    what: &'static str,
    requested: &HashSet<String>,
    enabled: &[String],
) -> Result<(), ChainError> {
    let names = missing(requested, enabled);
    if strict && !names.is_empty() {
        return Err(ChainError::MissingCapabilities { what, names });
    }
    Ok(())
}

impl PresentationChain {
    pub fn build(api: Arc<dyn VulkanApi>, config: &Config, descriptor: &SurfaceDescriptor) -> Result<Self> {
        log::info!("Building presentation chain for a {:?} surface", descriptor.kind());
        let strict = config.negotiation.strict;

        let allocator: Allocator = if config.debug.custom_allocator {
            log::info!("Using the host allocator for native allocations");
            Some(AllocationCallbacks::new(SystemAllocator::new()))
        } else {
            None
        };

        // ─────────────────────────────────────────────────────────────────────
        // STEP 1: Instance
        // ─────────────────────────────────────────────────────────────────────
        let mut extensions: HashSet<String> = config.instance.extensions.iter().cloned().collect();
        extensions.insert(SURFACE_EXTENSION.to_string());
        extensions.insert(descriptor.kind().extension_name().to_string());

        let instance_descriptor = InstanceDescriptor {
            api_version: config.api_version(),
            application_name: config.instance.application_name.clone(),
            engine_name: config.instance.engine_name.clone(),
            extensions,
            layers: config.instance_layers(),
            ..InstanceDescriptor::default()
        };

        let instance = InstanceHandle::create(api, &instance_descriptor, allocator.clone())
            .context("Failed to create Vulkan instance")?;
        require_all(
            strict,
            "instance extensions",
            &instance_descriptor.extensions,
            instance.enabled_extensions(),
        )?;
        require_all(strict, "instance layers", &instance_descriptor.layers, instance.enabled_layers())?;

        // ─────────────────────────────────────────────────────────────────────
        // STEP 2: Physical device + queue family
        // ─────────────────────────────────────────────────────────────────────
        let policy = SelectionPolicy::graphics(config.device_type());
        let selection = instance
            .select_physical_device_and_queue_family(&policy)
            .ok_or(ChainError::NoSuitableDevice {
                device_type: policy.device_type,
                queue_flags: policy.queue_flags,
            })?;

        // ─────────────────────────────────────────────────────────────────────
        // STEP 3: Logical device
        // ─────────────────────────────────────────────────────────────────────
        let mut device_extensions: HashSet<String> = config.device.extensions.iter().cloned().collect();
        device_extensions.insert(SWAPCHAIN_EXTENSION.to_string());

        let device = LogicalDeviceHandle::create(
            &instance,
            selection,
            &device_extensions,
            &config.requested_features(),
            allocator.clone(),
        )
        .context("Failed to create logical device")?;
        require_all(strict, "device extensions", &device_extensions, device.enabled_extensions())?;

        // ─────────────────────────────────────────────────────────────────────
        // STEP 4: Surface, checked against the selected queue family
        // ─────────────────────────────────────────────────────────────────────
        let surface = SurfaceHandle::create_for_queue(&instance, descriptor, selection, allocator.clone())
            .context("Failed to create presentation surface")?;

        // ─────────────────────────────────────────────────────────────────────
        // STEP 5: Swapchain
        // ─────────────────────────────────────────────────────────────────────
        let capabilities = surface
            .capabilities(selection.physical_device)
            .context("Failed to query surface capabilities")?;
        let (format, color_space) = config.surface_format();
        let swapchain_descriptor = SwapchainDescriptor::from_capabilities(
            &capabilities,
            format,
            color_space,
            config.present_mode(),
            vk::ImageUsageFlags::COLOR_ATTACHMENT,
        );

        let swapchain = SwapchainHandle::create(&device, &surface, &swapchain_descriptor, allocator.clone())
            .context("Failed to create swapchain")?;

        // ─────────────────────────────────────────────────────────────────────
        // STEP 6: One view per swapchain image
        // ─────────────────────────────────────────────────────────────────────
        let views = swapchain
            .images()
            .iter()
            .enumerate()
            .map(|(index, &image)| {
                let info = ImageViewDescriptor::color_2d(image, swapchain.format());
                ImageViewHandle::create(&device, &info, allocator.clone())
                    .with_context(|| format!("Failed to create image view {}", index))
            })
            .collect::<Result<Vec<_>>>()?;

        log::info!("Presentation chain ready: {} images", views.len());

        Ok(Self {
            views,
            swapchain,
            surface,
            device,
            instance,
            selection,
        })
    }

    pub fn instance(&self) -> &InstanceHandle {
        &self.instance
    }

    pub fn device(&self) -> &LogicalDeviceHandle {
        &self.device
    }

    pub fn surface(&self) -> &SurfaceHandle {
        &self.surface
    }

    pub fn swapchain(&self) -> &SwapchainHandle {
        &self.swapchain
    }

    pub fn image_views(&self) -> &[ImageViewHandle] {
        &self.views
    }

    pub fn selection(&self) -> DeviceSelection {
        self.selection
    }
}

impl Drop for PresentationChain {
    fn drop(&mut self) {
        log::info!("Tearing down presentation chain");
    }
}
