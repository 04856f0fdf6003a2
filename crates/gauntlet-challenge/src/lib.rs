pub mod generator;
pub mod ids;
pub mod templates;

pub use generator::*;
pub use ids::*;
