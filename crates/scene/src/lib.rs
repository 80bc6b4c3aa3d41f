pub mod entity;
pub mod names;
pub mod series;
pub mod time_index;

pub use entity::*;
pub use names::{AliasTable, MatchOutcome, NameMatcher};
pub use series::*;
pub use time_index::*;
