pub mod error;
pub mod records;
pub mod source;
pub mod tabular;
pub mod topology;
pub mod values;

pub use error::*;
pub use records::*;
pub use source::*;
pub use tabular::*;
pub use topology::*;
