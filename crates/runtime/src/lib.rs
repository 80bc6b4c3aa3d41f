pub mod event_bus;
pub mod frame;
pub mod playback;

pub use event_bus::*;
pub use frame::*;
pub use playback::*;
