pub mod clipboard;
pub mod media_controls;

pub use media_controls::{NullSurface, SystemMediaControls};
