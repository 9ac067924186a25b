use rust_decimal::Decimal;
use tokio::sync::oneshot;

use crate::domain::{Locker, Reservation, User, UserCreate};
use crate::error::{IdentityError, ReservationError};

/// Generic type aliases for service communication.
pub type ServiceResult<T, E> = std::result::Result<T, E>;
pub type ServiceResponse<T, E> = oneshot::Sender<ServiceResult<T, E>>;

/// Typed message enums for actor communication. Each variant carries its
/// parameters and a oneshot channel for the response.

#[derive(Debug)]
pub enum IdentityRequest {
    Register {
        payload: UserCreate,
        respond_to: ServiceResponse<User, IdentityError>,
    },
    Authenticate {
        cpf: String,
        password: String,
        respond_to: ServiceResponse<User, IdentityError>,
    },
    GetUser {
        id: String,
        respond_to: ServiceResponse<Option<User>, IdentityError>,
    },
    CurrentUser {
        respond_to: ServiceResponse<Option<User>, IdentityError>,
    },
    UpdateBalance {
        id: String,
        balance: Decimal,
        respond_to: ServiceResponse<(), IdentityError>,
    },
    EndSession {
        respond_to: ServiceResponse<(), IdentityError>,
    },
    Shutdown,
}

#[derive(Debug)]
pub enum ReservationRequest {
    AllLockers {
        respond_to: ServiceResponse<Vec<Locker>, ReservationError>,
    },
    AvailableLockers {
        respond_to: ServiceResponse<Vec<Locker>, ReservationError>,
    },
    SelectLocker {
        locker_id: String,
        respond_to: ServiceResponse<bool, ReservationError>,
    },
    SelectDuration {
        minutes: i64,
        price: Decimal,
        respond_to: ServiceResponse<bool, ReservationError>,
    },
    ConfirmReservation {
        user_id: String,
        respond_to: ServiceResponse<Reservation, ReservationError>,
    },
    CompleteReservation {
        reservation_id: String,
        respond_to: ServiceResponse<(), ReservationError>,
    },
    CurrentReservation {
        user_id: String,
        respond_to: ServiceResponse<Option<Reservation>, ReservationError>,
    },
    CancelWatches {
        respond_to: ServiceResponse<(), ReservationError>,
    },
    Shutdown,
}
