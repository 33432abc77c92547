//! Host shell for the quadview renderer.
//!
//! This crate provides:
//! - The [`Engine`] lifecycle controller that gates rendering on window and focus state
//! - Input event translation and the persisted pointer/frame state
//! - A winit runner with command line configuration
//!
//! # Example
//!
//! ```no_run
//! use quadview_app::{run_app, AppConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     run_app(AppConfig::new("quadview").with_asset_dir("assets"))
//! }
//! ```

pub mod engine;
pub mod input;
mod runner;

pub use engine::Engine;
pub use input::InputEvent;
pub use runner::{print_help, run_app, AppConfig};

// Re-export commonly used types for convenience
pub use quadview_core::SavedState;
pub use quadview_render::RendererConfig;
