pub mod color;
pub mod ids;
pub mod period;
pub mod time;

// Foundation crate: small, well-tested primitives only.
pub use color::*;
pub use ids::*;
pub use period::*;
pub use time::*;
