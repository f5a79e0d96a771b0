//! Ownership-checked Vulkan presentation chain.
//!
//! Instance, logical device, surface, swapchain and image views are wrapped
//! in [`backend::Handle`]s that pin whatever they were created from, so
//! native objects are always destroyed before the objects they depend on.
//! Requested extensions and layers are negotiated against what the driver
//! reports before every creation call.
//!
//! [`chain::PresentationChain`] builds the whole chain from a [`config::Config`]
//! and a platform window.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod backend;
pub mod chain;
pub mod config;

pub use chain::{ChainError, PresentationChain};
pub use config::Config;
