// =============================================================================
// PRESENT CHAIN - window + Vulkan presentation chain demo
// =============================================================================
//
// Opens one window, builds the full chain for it and keeps it alive until
// the window closes:
//
// ┌─────────────────────────────────────────────────────────────────┐
// │  Instance (negotiated extensions + layers)                      │
// │    ├── Logical device (one queue, negotiated extensions)        │
// │    │     ├── Swapchain ──────────┐                              │
// │    │     └── Image views         │                              │
// │    └── Surface ──────────────────┘                              │
// └─────────────────────────────────────────────────────────────────┘
//
// Any stage failing aborts the whole start-up; nothing downstream of a
// failed stage is attempted.
//
// =============================================================================

use anyhow::{Context, Result};
use present_chain::backend::{LoadedApi, SurfaceDescriptor, VulkanApi};
use present_chain::{Config, PresentationChain};
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes},
};

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    // Load configuration from config.toml
    let config = Config::load();

    init_logging(&config);
    log::info!("Starting present-chain");
    log::info!(
        "Window: {}x{}, present mode: {}",
        config.window.width,
        config.window.height,
        config.swapchain.present_mode
    );

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn init_logging(config: &Config) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = config.debug.log_level.parse().unwrap_or(LevelFilter::Info);

    let mut builder = Builder::from_default_env();
    builder.filter_level(level);
    builder.init();
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// IMPORTANT: Field order matters for Drop! The chain must be torn down
/// while the window it presents to still exists.
struct App {
    config: Config,
    chain: Option<PresentationChain>,
    window: Option<Arc<Window>>,
    /// Start-up failure, reported by main after the event loop exits
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            chain: None,
            window: None,
            error: None,
        }
    }

    fn init_vulkan(&self, window: &Window) -> Result<PresentationChain> {
        log::info!("Initializing Vulkan...");

        let descriptor = SurfaceDescriptor::from_window(window).context("Failed to describe window surface")?;

        // SAFETY: the loader is only initialised here, once
        let api: Arc<dyn VulkanApi> = Arc::new(unsafe { LoadedApi::load() }.context("Failed to load Vulkan")?);

        let chain = PresentationChain::build(api, &self.config, &descriptor)?;

        let swapchain = chain.swapchain();
        log::info!(
            "Vulkan initialized: {} images, {}x{}, {:?}",
            swapchain.image_count(),
            swapchain.extent().width,
            swapchain.extent().height,
            swapchain.format()
        );
        Ok(chain)
    }
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    /// Called when the application is ready to create windows.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = WindowAttributes::default()
            .with_title(&self.config.window.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ))
            .with_resizable(false);

        let window = match event_loop.create_window(window_attributes) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {:?}", e);
                self.error = Some(e.into());
                event_loop.exit();
                return;
            }
        };

        match self.init_vulkan(&window) {
            Ok(chain) => self.chain = Some(chain),
            Err(e) => {
                log::error!("Failed to initialize Vulkan: {:?}", e);
                self.error = Some(e);
                event_loop.exit();
            }
        }

        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: winit::window::WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                event_loop.exit();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::{KeyCode, PhysicalKey};

                if event.state.is_pressed() && event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                    log::info!("ESC pressed, exiting...");
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }
}

// =============================================================================
// CLEANUP
// =============================================================================

impl Drop for App {
    fn drop(&mut self) {
        log::info!("Cleaning up Vulkan resources...");
        // Views, swapchain, surface, device, instance; then the window
        self.chain.take();
        self.window.take();
        log::info!("Cleanup complete");
    }
}
