//! Window runner and event loop.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use quadview_core::{AssetSource, DirAssetSource};
use quadview_gpu::{NativeWindow, VulkanLoader};
use quadview_render::{Renderer, RendererConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::engine::Engine;
use crate::input::InputEvent;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// Directory holding the texture and shader assets.
    pub asset_dir: PathBuf,
    /// Renderer configuration.
    pub renderer: RendererConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "quadview".to_string(),
            width: 1280,
            height: 720,
            asset_dir: PathBuf::from("assets"),
            renderer: RendererConfig::default(),
        }
    }
}

impl AppConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            renderer: RendererConfig::new(title.clone()),
            title,
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the asset directory.
    pub fn with_asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.asset_dir = dir.into();
        self
    }

    /// Replace the renderer configuration.
    pub fn with_renderer(mut self, renderer: RendererConfig) -> Self {
        self.renderer = renderer;
        self
    }

    /// Apply command line flags (without the program name) on top of this config.
    ///
    /// Returns `None` when help was requested.
    pub fn parse_args<I>(mut self, args: I) -> anyhow::Result<Option<Self>>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Ok(None),
                "--assets" => {
                    let dir = args.next().context("--assets needs a directory")?;
                    self.asset_dir = PathBuf::from(dir);
                }
                "--texture" => {
                    let name = args.next().context("--texture needs an asset name")?;
                    self.renderer.texture = name;
                }
                "--size" => {
                    let size = args.next().context("--size needs WIDTHxHEIGHT")?;
                    let (width, height) = parse_size(&size)?;
                    self.width = width;
                    self.height = height;
                }
                "--validation" => self.renderer.validation = true,
                "--no-resize" => self.renderer.handle_resize = false,
                other => bail!("Unknown argument: {other}"),
            }
        }
        Ok(Some(self))
    }
}

fn parse_size(value: &str) -> anyhow::Result<(u32, u32)> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .with_context(|| format!("Invalid size {value:?}, expected WIDTHxHEIGHT"))?;
    let width: u32 = width.trim().parse().context("Invalid width")?;
    let height: u32 = height.trim().parse().context("Invalid height")?;
    if width == 0 || height == 0 {
        bail!("Window size must be non-zero, got {width}x{height}");
    }
    Ok((width, height))
}

/// Print command line usage.
pub fn print_help(program: &str) {
    println!("Usage: {program} [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --assets <DIR>      Directory holding the texture and shaders (default: assets)");
    println!("  --texture <NAME>    Texture asset to show (default: sample_tex.png)");
    println!("  --size <WxH>        Initial window size (default: 1280x720)");
    println!("  --validation        Enable Vulkan validation layers");
    println!("  --no-resize         Keep the initial swapchain when the window changes size");
    println!("  -h, --help          Show this help");
}

/// Run the viewer with the given configuration.
///
/// This function initializes logging, loads Vulkan, opens the window and runs the event
/// loop until the window is closed.
pub fn run_app(config: AppConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("{} starting...", config.title);

    let loader = VulkanLoader::load()?;
    let assets = asset_source(&config);
    let engine = Engine::new(Renderer::new(Box::new(loader), config.renderer.clone()));

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = AppRunner {
        config,
        engine,
        assets,
        window: None,
        saved: None,
    };

    if let Err(e) = event_loop.run_app(&mut runner) {
        error!("Event loop error: {e}");
    }

    Ok(())
}

#[cfg(feature = "embed-shaders")]
fn asset_source(config: &AppConfig) -> Box<dyn AssetSource> {
    let disk = DirAssetSource::new(&config.asset_dir);
    Box::new(quadview_shaders::embedded_assets().with_fallback(disk))
}

#[cfg(not(feature = "embed-shaders"))]
fn asset_source(config: &AppConfig) -> Box<dyn AssetSource> {
    Box::new(DirAssetSource::new(&config.asset_dir))
}

/// Internal runner that implements winit's `ApplicationHandler`.
///
/// The engine is declared before the window so GPU state goes first on drop.
struct AppRunner {
    config: AppConfig,
    engine: Engine,
    assets: Box<dyn AssetSource>,
    window: Option<Arc<Window>>,
    saved: Option<Vec<u8>>,
}

impl AppRunner {
    fn create_window(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<(Arc<Window>, NativeWindow)> {
        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let native = NativeWindow::from_window(window.as_ref())?;
        Ok((window, native))
    }

    fn close(&mut self) {
        self.engine.on_term_window();
        self.window = None;
    }
}

impl ApplicationHandler for AppRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (window, native) = match self.create_window(event_loop) {
            Ok(created) => created,
            Err(e) => {
                error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        if let Some(blob) = self.saved.take() {
            self.engine.on_load_state(&blob);
        }

        let size = window.inner_size();
        self.engine
            .on_init_window(&native, (size.width, size.height), self.assets.as_ref());
        if window.has_focus() {
            self.engine.on_gained_focus();
        }
        info!("Viewer ready");

        window.request_redraw();
        self.window = Some(window);
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        self.saved = Some(self.engine.on_save_state());
        self.close();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(input) = InputEvent::from_window_event(&event) {
            if self.engine.on_input_event(input) {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                self.close();
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => self.engine.draw_frame(),
            WindowEvent::Resized(size) => {
                self.engine.on_window_resized(size.width, size.height);
            }
            WindowEvent::Focused(true) => self.engine.on_gained_focus(),
            WindowEvent::Focused(false) => self.engine.on_lost_focus(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            if self.engine.is_animating() {
                window.request_redraw();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn flags_override_defaults() {
        let config = AppConfig::new("viewer")
            .parse_args(args(&[
                "--assets",
                "/tmp/assets",
                "--texture",
                "brick.png",
                "--size",
                "800x600",
                "--validation",
                "--no-resize",
            ]))
            .unwrap()
            .unwrap();

        assert_eq!(config.asset_dir, PathBuf::from("/tmp/assets"));
        assert_eq!(config.renderer.texture, "brick.png");
        assert_eq!((config.width, config.height), (800, 600));
        assert!(config.renderer.validation);
        assert!(!config.renderer.handle_resize);
        assert_eq!(config.renderer.app_name, "viewer");
    }

    #[test]
    fn no_flags_keeps_defaults() {
        let config = AppConfig::default().parse_args(Vec::new()).unwrap().unwrap();
        assert_eq!((config.width, config.height), (1280, 720));
        assert!(config.renderer.handle_resize);
    }

    #[test]
    fn help_short_circuits() {
        let parsed = AppConfig::default()
            .parse_args(args(&["--size", "10x10", "-h", "--bogus"]))
            .unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn bad_input_is_rejected() {
        assert!(AppConfig::default().parse_args(args(&["--bogus"])).is_err());
        assert!(AppConfig::default().parse_args(args(&["--size"])).is_err());
        assert!(AppConfig::default().parse_args(args(&["--size", "800"])).is_err());
        assert!(AppConfig::default().parse_args(args(&["--size", "0x600"])).is_err());
    }

    #[test]
    fn size_accepts_either_separator_case() {
        assert_eq!(parse_size("1920X1080").unwrap(), (1920, 1080));
        assert_eq!(parse_size("640x480").unwrap(), (640, 480));
    }
}
