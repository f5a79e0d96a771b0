// Handle errors
//
// Every factory in the backend returns Result<Handle, HandleError>.
// Native status codes are carried as-is, nothing is re-interpreted.

use ash::vk;
use thiserror::Error;

use super::surface::SurfaceKind;

#[derive(Debug, Error)]
pub enum HandleError {
    /// The dependency was never created or its owner already released it
    #[error("{0} handle is invalid or already released")]
    DependencyUnavailable(&'static str),

    #[error("{object} creation failed: {result}")]
    CreationFailed {
        object: &'static str,
        result: vk::Result,
    },

    #[error("{what} enumeration failed: {result}")]
    EnumerationFailed {
        what: &'static str,
        result: vk::Result,
    },

    #[error("image format {format:?} with usage {usage:?} is not supported by the physical device")]
    UnsupportedImageFormat {
        format: vk::Format,
        usage: vk::ImageUsageFlags,
    },

    #[error("surface format {format:?} / {color_space:?} is not supported by the surface")]
    UnsupportedSurfaceFormat {
        format: vk::Format,
        color_space: vk::ColorSpaceKHR,
    },

    #[error("present mode {0:?} is not supported by the surface")]
    UnsupportedPresentMode(vk::PresentModeKHR),

    #[error("queue family {queue_family_index} cannot present to the surface")]
    PresentationUnsupported { queue_family_index: u32 },

    #[error("no entry point resolved for {0:?} surfaces")]
    ExtensionNotPresent(SurfaceKind),

    #[error("window system is not supported: {0}")]
    UnsupportedWindowSystem(String),

    #[error("name {0:?} contains an interior nul byte")]
    InvalidName(String),
}

impl HandleError {
    pub(crate) fn creation(object: &'static str, result: vk::Result) -> Self {
        Self::CreationFailed { object, result }
    }
}
