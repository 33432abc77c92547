//! Input events delivered to the engine.

use winit::event::{ElementState, Touch, WindowEvent};

/// An input event in window pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Pointer or touch contact moved, pressed or lifted at a position.
    Motion { x: f32, y: f32 },
    /// A key changed state.
    Key { pressed: bool },
}

impl InputEvent {
    /// Translate a window event, if it carries input.
    pub fn from_window_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::CursorMoved { position, .. } => Some(Self::Motion {
                x: position.x as f32,
                y: position.y as f32,
            }),
            WindowEvent::Touch(Touch { location, .. }) => Some(Self::Motion {
                x: location.x as f32,
                y: location.y as f32,
            }),
            WindowEvent::KeyboardInput { event, .. } => Some(Self::Key {
                pressed: event.state == ElementState::Pressed,
            }),
            _ => None,
        }
    }

    /// Position of a motion event.
    pub fn position(&self) -> Option<(f32, f32)> {
        match *self {
            Self::Motion { x, y } => Some((x, y)),
            Self::Key { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalSize;

    #[test]
    fn only_motion_has_a_position() {
        assert_eq!(
            InputEvent::Motion { x: 3.5, y: 7.0 }.position(),
            Some((3.5, 7.0))
        );
        assert_eq!(InputEvent::Key { pressed: true }.position(), None);
    }

    #[test]
    fn window_events_without_input_are_skipped() {
        let resized = WindowEvent::Resized(PhysicalSize::new(640, 480));
        assert_eq!(InputEvent::from_window_event(&resized), None);
        assert_eq!(
            InputEvent::from_window_event(&WindowEvent::Focused(true)),
            None
        );
    }
}
