pub mod messages;
pub mod sweep;

pub use messages::*;
pub use sweep::*;
