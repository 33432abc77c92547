//! Lifecycle controller.
//!
//! The host shell reports window and focus transitions to an [`Engine`], which drives
//! the renderer accordingly. Every entry point takes the engine lock, so callbacks may
//! arrive on any thread.

use std::panic::Location;

use parking_lot::Mutex;
use quadview_core::{AssetSource, SavedState};
use quadview_gpu::{GpuError, NativeWindow};
use quadview_render::{Renderer, RendererStats};
use tracing::{debug, error, warn};

use crate::input::InputEvent;

/// Frames between two frame counter log lines.
pub const LOG_INTERVAL: u64 = 100;

struct EngineState {
    renderer: Renderer,
    animating: bool,
    saved: SavedState,
}

/// Drives a [`Renderer`] through window and focus transitions.
///
/// Rendering failures are not recoverable here: they are logged and then the engine
/// panics with the error and the location of the call that hit it.
pub struct Engine {
    state: Mutex<EngineState>,
}

impl Engine {
    /// Create an engine around an uninitialized renderer.
    pub fn new(renderer: Renderer) -> Self {
        Self {
            state: Mutex::new(EngineState {
                renderer,
                animating: false,
                saved: SavedState::default(),
            }),
        }
    }

    /// Whether the renderer holds a complete GPU state.
    pub fn is_ready(&self) -> bool {
        self.state.lock().renderer.is_ready()
    }

    /// Whether frames are currently being drawn.
    pub fn is_animating(&self) -> bool {
        self.state.lock().animating
    }

    /// Current persisted state.
    pub fn saved_state(&self) -> SavedState {
        self.state.lock().saved
    }

    /// Renderer counters, if ready.
    pub fn stats(&self) -> Option<RendererStats> {
        self.state.lock().renderer.stats()
    }

    /// Draw one frame while animating.
    #[track_caller]
    pub fn draw_frame(&self) {
        let mut state = self.state.lock();
        if !state.animating {
            return;
        }

        if let Err(e) = state.renderer.draw_frame() {
            fatal("Frame failed", &e);
        }

        state.saved.frame_count += 1;
        if state.saved.frame_count % LOG_INTERVAL == 0 {
            debug!("draw_frame[{}]", state.saved.frame_count);
        }
    }

    /// The window became available: create every GPU object for it.
    #[track_caller]
    pub fn on_init_window(&self, window: &NativeWindow, size: (u32, u32), assets: &dyn AssetSource) {
        let mut state = self.state.lock();
        debug!("on_init_window {}x{}", size.0, size.1);
        if let Err(e) = state.renderer.initialize(window, size, assets) {
            fatal("Renderer initialization failed", &e);
        }
    }

    /// The window changed size.
    #[track_caller]
    pub fn on_window_resized(&self, width: u32, height: u32) {
        let mut state = self.state.lock();
        debug!("on_window_resized {width}x{height}");
        if let Err(e) = state.renderer.resize(width, height) {
            fatal("Swapchain rebuild failed", &e);
        }
    }

    /// The window is going away: stop animating and release all GPU state.
    pub fn on_term_window(&self) {
        let mut state = self.state.lock();
        debug!("on_term_window");
        state.animating = false;
        state.renderer.destroy();
    }

    pub fn on_gained_focus(&self) {
        let mut state = self.state.lock();
        debug!("on_gained_focus");
        state.animating = true;
    }

    pub fn on_lost_focus(&self) {
        let mut state = self.state.lock();
        debug!("on_lost_focus");
        state.animating = false;
    }

    /// Snapshot the persisted state.
    pub fn on_save_state(&self) -> Vec<u8> {
        let state = self.state.lock();
        debug!("on_save_state");
        state.saved.to_bytes()
    }

    /// Restore a snapshot taken by [`Engine::on_save_state`].
    pub fn on_load_state(&self, bytes: &[u8]) {
        let mut state = self.state.lock();
        match SavedState::from_bytes(bytes) {
            Some(saved) => {
                state.saved = saved;
                debug!("Restored from previous saved state");
            }
            None => warn!(
                "Ignoring saved state of {} bytes (expected {})",
                bytes.len(),
                SavedState::SIZE
            ),
        }
    }

    /// Handle an input event. Returns whether it was consumed.
    pub fn on_input_event(&self, event: InputEvent) -> bool {
        let mut state = self.state.lock();
        match event {
            InputEvent::Motion { x, y } => {
                state.saved.input_x = x as i32;
                state.saved.input_y = y as i32;
                debug!("Motion X[{}] Y[{}]", state.saved.input_x, state.saved.input_y);
                true
            }
            InputEvent::Key { .. } => false,
        }
    }
}

#[track_caller]
fn fatal(context: &str, err: &GpuError) -> ! {
    let location = Location::caller();
    error!("{context}: {err} (at {location})");
    panic!("{context}: {err}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadview_core::MemoryAssetSource;
    use quadview_gpu::error::Result;
    use quadview_gpu::{GlobalApi, InstanceApi, InstanceDesc};
    use quadview_render::RendererConfig;
    use raw_window_handle::{
        RawDisplayHandle, RawWindowHandle, WebDisplayHandle, WebWindowHandle,
    };

    /// A loader on a machine without Vulkan.
    struct NoVulkan;

    impl GlobalApi for NoVulkan {
        fn instance_version(&self) -> Result<u32> {
            Err(GpuError::LoaderUnavailable("not installed".to_string()))
        }

        fn instance_extensions(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn surface_extensions(&self, _display: RawDisplayHandle) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn create_instance(&self, _desc: &InstanceDesc<'_>) -> Result<Box<dyn InstanceApi>> {
            Err(GpuError::LoaderUnavailable("not installed".to_string()))
        }
    }

    fn engine() -> Engine {
        Engine::new(Renderer::new(Box::new(NoVulkan), RendererConfig::default()))
    }

    fn window() -> NativeWindow {
        NativeWindow::new(
            RawDisplayHandle::Web(WebDisplayHandle::new()),
            RawWindowHandle::Web(WebWindowHandle::new(1)),
        )
    }

    #[test]
    fn focus_gates_animation() {
        let engine = engine();
        engine.draw_frame();
        assert_eq!(engine.saved_state().frame_count, 0);

        engine.on_gained_focus();
        assert!(engine.is_animating());
        engine.draw_frame();
        engine.draw_frame();
        assert_eq!(engine.saved_state().frame_count, 2);

        engine.on_lost_focus();
        engine.draw_frame();
        assert_eq!(engine.saved_state().frame_count, 2);
    }

    #[test]
    fn draw_without_window_is_harmless() {
        let engine = engine();
        engine.on_gained_focus();
        engine.draw_frame();
        assert!(!engine.is_ready());
        assert!(engine.stats().is_none());
    }

    #[test]
    fn term_window_stops_animation_and_repeats_cleanly() {
        let engine = engine();
        engine.on_gained_focus();
        engine.on_term_window();
        engine.on_term_window();
        assert!(!engine.is_animating());
        assert!(!engine.is_ready());
    }

    #[test]
    #[should_panic(expected = "Renderer initialization failed")]
    fn init_failure_is_fatal() {
        let engine = engine();
        engine.on_init_window(&window(), (640, 480), &MemoryAssetSource::new());
    }

    #[test]
    fn motion_is_consumed_and_recorded() {
        let engine = engine();
        assert!(engine.on_input_event(InputEvent::Motion { x: 120.7, y: 44.2 }));
        assert!(!engine.on_input_event(InputEvent::Key { pressed: true }));

        let saved = engine.saved_state();
        assert_eq!((saved.input_x, saved.input_y), (120, 44));
    }

    #[test]
    fn saved_state_survives_a_restart() {
        let first = engine();
        first.on_input_event(InputEvent::Motion { x: 10.0, y: 20.0 });
        first.on_gained_focus();
        for _ in 0..5 {
            first.draw_frame();
        }
        let blob = first.on_save_state();
        assert_eq!(blob.len(), SavedState::SIZE);

        let second = engine();
        second.on_load_state(&blob);
        assert_eq!(second.saved_state(), first.saved_state());
        assert_eq!(second.saved_state().frame_count, 5);
    }

    #[test]
    fn wrong_sized_state_is_ignored() {
        let engine = engine();
        engine.on_input_event(InputEvent::Motion { x: 1.0, y: 2.0 });
        engine.on_load_state(&[0xff; 3]);
        assert_eq!(engine.saved_state().input_x, 1);
    }
}
