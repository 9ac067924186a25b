use rust_decimal::Decimal;
use thiserror::Error;

/// Errors surfaced by the identity service. All of them are recoverable by
/// the user and rendered as a message by the UI layer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IdentityError {
    #[error("User not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("CPF already registered: {0}")]
    DuplicateCpf(String),
    #[error("Invalid CPF or password")]
    InvalidCredentials,
    #[error("Balance cannot be negative: {0}")]
    NegativeBalance(Decimal),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

/// Errors surfaced by the reservation service.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReservationError {
    #[error("No locker or duration selected")]
    NoSelection,
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),
    #[error("Insufficient balance: price {required}, available {available}")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },
    #[error("Locker not found: {0}")]
    LockerNotFound(String),
    #[error("Locker not available: {0}")]
    LockerUnavailable(String),
    #[error("Invalid user: {0}")]
    InvalidUser(String),
    #[error("Balance update failed: {0}")]
    BalanceUpdate(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}
