pub mod locker;
pub mod reservation;
pub mod user;

pub use locker::*;
pub use reservation::*;
pub use user::*;
