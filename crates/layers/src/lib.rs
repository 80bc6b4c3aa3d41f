pub mod bars;
pub mod bubbles;
pub mod choropleth;
pub mod interaction;
pub mod layer;
pub mod render;
pub mod symbology;
pub mod wordcloud;

pub use layer::*;
pub use render::*;
