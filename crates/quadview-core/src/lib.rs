//! Core types for the quadview renderer.
//!
//! This crate provides the plain data shared by the renderer and its host shell:
//! - Asset sources and decoded texture pixels
//! - The quad vertex layout and its aspect-corrected geometry
//! - The fixed-size saved state blob
//! - Common error types

pub mod assets;
pub mod error;
pub mod pixels;
pub mod state;
pub mod vertex;

pub use assets::{AssetSource, DirAssetSource, MemoryAssetSource};
pub use error::{Error, Result};
pub use pixels::DecodedImage;
pub use state::SavedState;
pub use vertex::{quad_vertices, QuadVertex};
