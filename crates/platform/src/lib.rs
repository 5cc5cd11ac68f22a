//! Windowing and input for the renderer.
//!
//! Wraps winit window creation, Vulkan surface creation, and keyboard
//! state tracking. Event loop ownership stays with the application;
//! this crate only provides the pieces it plugs together.

pub mod input;
pub mod window;

pub use input::{InputState, KeyCode};
pub use window::{Surface, Window};
