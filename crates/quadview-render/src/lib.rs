//! Textured quad renderer for the quadview viewer.
//!
//! This crate provides:
//! - Renderer configuration
//! - Texture upload through a linear image or a staging copy
//! - The quad pipeline and its vertex buffer
//! - The per-frame acquire, record, submit and present cycle
//! - The renderer that owns all of it and tears it down in order

pub mod config;
pub mod frame;
pub mod quad;
pub mod renderer;
pub mod texture;

pub use config::RendererConfig;
pub use frame::{FrameOrchestrator, FrameOutcome, FramePass};
pub use quad::{QuadBuffer, QuadPipeline};
pub use renderer::{Renderer, RendererStats};
pub use texture::{choose_upload_path, copy_rows_pitched, Texture, TexturePath};
