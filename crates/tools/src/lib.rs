pub mod config;
pub mod loader;
pub mod logging;
pub mod player;
pub mod visualization;

pub use config::{ConfigError, VizConfig};
pub use loader::{Dataset, load_dataset};
pub use player::{Command, Player, PlayerOutput};
pub use visualization::{VizError, Visualization};
