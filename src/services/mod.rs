pub mod identity;
pub mod reservation;

pub use identity::*;
pub use reservation::*;
