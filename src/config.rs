// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// Every section is optional; missing keys take their defaults. String
// settings are turned into Vulkan enums by the helpers at the bottom, with a
// warning and a default for anything unrecognised.

use anyhow::{Context, Result};
use ash::vk;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub instance: InstanceConfig,
    pub device: DeviceConfig,
    pub swapchain: SwapchainConfig,
    pub negotiation: NegotiationConfig,
    pub debug: DebugConfig,
}

/// Window settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Present Chain".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Instance creation settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    pub application_name: String,
    pub engine_name: String,
    /// "major.minor", e.g. "1.3"
    pub api_version: String,
    /// Requested on top of the surface extensions
    pub extensions: Vec<String>,
    pub layers: Vec<String>,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            application_name: "present-chain".to_string(),
            engine_name: "present-chain".to_string(),
            api_version: "1.3".to_string(),
            extensions: Vec::new(),
            layers: Vec::new(),
        }
    }
}

/// Physical and logical device settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// "discrete", "integrated", "virtual", "cpu" or "other"
    pub device_type: String,
    /// Requested on top of VK_KHR_swapchain
    pub extensions: Vec<String>,
    /// Feature names as in VkPhysicalDeviceFeatures, e.g. "sampler_anisotropy"
    pub features: Vec<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_type: "discrete".to_string(),
            extensions: Vec::new(),
            features: Vec::new(),
        }
    }
}

/// Swapchain settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SwapchainConfig {
    pub format: String,
    pub color_space: String,
    pub present_mode: String,
}

impl Default for SwapchainConfig {
    fn default() -> Self {
        Self {
            format: "b8g8r8a8_srgb".to_string(),
            color_space: "srgb_nonlinear".to_string(),
            present_mode: "immediate".to_string(),
        }
    }
}

/// Capability negotiation settings
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct NegotiationConfig {
    /// Fail when a requested extension or layer is unsupported instead of
    /// dropping it
    pub strict: bool,
}

/// Debug settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub validation_layers: bool,
    pub log_level: String,
    /// Route every native allocation through the crate's host allocator
    pub custom_allocator: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: true,
            log_level: "info".to_string(),
            custom_allocator: false,
        }
    }
}

pub const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

impl Config {
    /// Load configuration from file, falling back to defaults if not found
    pub fn load() -> Self {
        Self::load_from_path("config.toml").unwrap_or_else(|e| {
            log::warn!("Failed to load config.toml: {}. Using defaults.", e);
            Config::default()
        })
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::parse(&content).with_context(|| format!("Failed to parse config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Get present mode as Vulkan enum
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        match self.swapchain.present_mode.to_lowercase().as_str() {
            "immediate" => vk::PresentModeKHR::IMMEDIATE,
            "mailbox" => vk::PresentModeKHR::MAILBOX,
            "fifo" => vk::PresentModeKHR::FIFO,
            "fifo_relaxed" => vk::PresentModeKHR::FIFO_RELAXED,
            _ => {
                log::warn!(
                    "Unknown present mode '{}', defaulting to IMMEDIATE",
                    self.swapchain.present_mode
                );
                vk::PresentModeKHR::IMMEDIATE
            }
        }
    }

    pub fn device_type(&self) -> vk::PhysicalDeviceType {
        match self.device.device_type.to_lowercase().as_str() {
            "discrete" => vk::PhysicalDeviceType::DISCRETE_GPU,
            "integrated" => vk::PhysicalDeviceType::INTEGRATED_GPU,
            "virtual" => vk::PhysicalDeviceType::VIRTUAL_GPU,
            "cpu" => vk::PhysicalDeviceType::CPU,
            "other" => vk::PhysicalDeviceType::OTHER,
            _ => {
                log::warn!(
                    "Unknown device type '{}', defaulting to DISCRETE_GPU",
                    self.device.device_type
                );
                vk::PhysicalDeviceType::DISCRETE_GPU
            }
        }
    }

    /// Swapchain image format and color space
    pub fn surface_format(&self) -> (vk::Format, vk::ColorSpaceKHR) {
        let format = match self.swapchain.format.to_lowercase().as_str() {
            "b8g8r8a8_srgb" => vk::Format::B8G8R8A8_SRGB,
            "b8g8r8a8_unorm" => vk::Format::B8G8R8A8_UNORM,
            "r8g8b8a8_srgb" => vk::Format::R8G8B8A8_SRGB,
            "r8g8b8a8_unorm" => vk::Format::R8G8B8A8_UNORM,
            "a2b10g10r10_unorm" => vk::Format::A2B10G10R10_UNORM_PACK32,
            "r16g16b16a16_sfloat" => vk::Format::R16G16B16A16_SFLOAT,
            _ => {
                log::warn!(
                    "Unknown swapchain format '{}', defaulting to B8G8R8A8_SRGB",
                    self.swapchain.format
                );
                vk::Format::B8G8R8A8_SRGB
            }
        };

        let color_space = match self.swapchain.color_space.to_lowercase().as_str() {
            "srgb_nonlinear" => vk::ColorSpaceKHR::SRGB_NONLINEAR,
            "extended_srgb_linear" => vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
            "hdr10_st2084" => vk::ColorSpaceKHR::HDR10_ST2084_EXT,
            _ => {
                log::warn!(
                    "Unknown color space '{}', defaulting to SRGB_NONLINEAR",
                    self.swapchain.color_space
                );
                vk::ColorSpaceKHR::SRGB_NONLINEAR
            }
        };

        (format, color_space)
    }

    /// Packed API version; malformed strings fall back to 1.3
    pub fn api_version(&self) -> u32 {
        let version = &self.instance.api_version;
        let parsed = version
            .split_once('.')
            .and_then(|(major, minor)| Some((major.trim().parse::<u32>().ok()?, minor.trim().parse::<u32>().ok()?)));

        match parsed {
            Some((major, minor)) => vk::make_api_version(0, major, minor, 0),
            None => {
                log::warn!("Unknown API version '{}', defaulting to 1.3", version);
                vk::API_VERSION_1_3
            }
        }
    }

    /// Requested instance layers, validation included when enabled
    pub fn instance_layers(&self) -> HashSet<String> {
        let mut layers: HashSet<String> = self.instance.layers.iter().cloned().collect();
        if self.debug.validation_layers {
            layers.insert(VALIDATION_LAYER.to_string());
        }
        layers
    }

    /// Requested device features; unknown names are skipped with a warning
    pub fn requested_features(&self) -> vk::PhysicalDeviceFeatures {
        let mut features = vk::PhysicalDeviceFeatures::default();

        for name in &self.device.features {
            let flag = match name.as_str() {
                "sampler_anisotropy" => &mut features.sampler_anisotropy,
                "fill_mode_non_solid" => &mut features.fill_mode_non_solid,
                "geometry_shader" => &mut features.geometry_shader,
                "tessellation_shader" => &mut features.tessellation_shader,
                "wide_lines" => &mut features.wide_lines,
                "large_points" => &mut features.large_points,
                "multi_draw_indirect" => &mut features.multi_draw_indirect,
                "sample_rate_shading" => &mut features.sample_rate_shading,
                "shader_float64" => &mut features.shader_float64,
                "depth_clamp" => &mut features.depth_clamp,
                _ => {
                    log::warn!("Unknown device feature '{}', skipping", name);
                    continue;
                }
            };
            *flag = vk::TRUE;
        }

        features
    }
}
