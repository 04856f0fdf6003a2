pub mod delivery;
pub mod transport;

pub use delivery::*;
pub use transport::*;
