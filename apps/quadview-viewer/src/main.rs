//! Quadview Viewer
//!
//! Opens a window and draws a single textured quad every frame.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p quadview-viewer -- [OPTIONS]
//! ```
//!
//! ## Examples
//!
//! ```bash
//! # Default texture from ./assets
//! cargo run -p quadview-viewer
//!
//! # Another texture with validation layers enabled
//! cargo run -p quadview-viewer -- --texture other.png --validation
//!
//! # Shaders compiled into the binary
//! cargo run -p quadview-viewer --features embed-shaders
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

use quadview_app::{print_help, run_app, AppConfig};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "quadview-viewer".to_string());

    let Some(config) = AppConfig::new("quadview")
        .with_size(WIDTH, HEIGHT)
        .parse_args(args)?
    else {
        print_help(&program);
        return Ok(());
    };

    run_app(config)
}
