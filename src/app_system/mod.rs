//! System orchestration, startup, and shutdown logic.

pub mod locker_system;
pub mod tracing;

pub use locker_system::*;
pub use self::tracing::*;
