use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

use crate::domain::{Locker, Reservation, User, UserCreate};
use crate::error::{IdentityError, ReservationError};
use crate::messages::{IdentityRequest, ReservationRequest};

// =============================================================================
// Request/response plumbing shared by both clients
// =============================================================================

macro_rules! client_method {
    ($client:ty => fn $method:ident($($param:ident: $param_type:ty),*) -> $return_type:ty as $request:ident::$variant:ident, Error = $error_type:ty) => {
        impl $client {
            #[instrument(skip(self))]
            pub async fn $method(&self, $($param: $param_type),*) -> Result<$return_type, $error_type> {
                debug!("Sending request");
                let (respond_to, response) = oneshot::channel();
                self.sender.send($request::$variant {
                    $($param,)*
                    respond_to,
                }).await.map_err(|_| <$error_type>::ActorCommunicationError("Actor closed".to_string()))?;

                response.await.map_err(|_| <$error_type>::ActorCommunicationError("Actor dropped".to_string()))?
            }
        }
    };
}

// =============================================================================
// 1. Identity Client
// =============================================================================

#[derive(Clone)]
pub struct IdentityClient {
    sender: mpsc::Sender<IdentityRequest>,
}

impl IdentityClient {
    pub fn new(sender: mpsc::Sender<IdentityRequest>) -> Self {
        Self { sender }
    }

    /// Fire-and-forget stop signal; ignored when the actor is already gone.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(IdentityRequest::Shutdown).await;
    }
}

client_method!(IdentityClient => fn register(payload: UserCreate) -> User as IdentityRequest::Register, Error = IdentityError);
client_method!(IdentityClient => fn authenticate(cpf: String, password: String) -> User as IdentityRequest::Authenticate, Error = IdentityError);
client_method!(IdentityClient => fn get_user(id: String) -> Option<User> as IdentityRequest::GetUser, Error = IdentityError);
client_method!(IdentityClient => fn current_user() -> Option<User> as IdentityRequest::CurrentUser, Error = IdentityError);
client_method!(IdentityClient => fn update_balance(id: String, balance: Decimal) -> () as IdentityRequest::UpdateBalance, Error = IdentityError);
client_method!(IdentityClient => fn end_session() -> () as IdentityRequest::EndSession, Error = IdentityError);

// =============================================================================
// 2. Reservation Client
// =============================================================================

#[derive(Clone)]
pub struct ReservationClient {
    sender: mpsc::Sender<ReservationRequest>,
}

impl ReservationClient {
    pub fn new(sender: mpsc::Sender<ReservationRequest>) -> Self {
        Self { sender }
    }

    /// Fire-and-forget stop signal; ignored when the actor is already gone.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(ReservationRequest::Shutdown).await;
    }
}

client_method!(ReservationClient => fn all_lockers() -> Vec<Locker> as ReservationRequest::AllLockers, Error = ReservationError);
client_method!(ReservationClient => fn available_lockers() -> Vec<Locker> as ReservationRequest::AvailableLockers, Error = ReservationError);
client_method!(ReservationClient => fn select_locker(locker_id: String) -> bool as ReservationRequest::SelectLocker, Error = ReservationError);
client_method!(ReservationClient => fn select_duration(minutes: i64, price: Decimal) -> bool as ReservationRequest::SelectDuration, Error = ReservationError);
client_method!(ReservationClient => fn confirm_reservation(user_id: String) -> Reservation as ReservationRequest::ConfirmReservation, Error = ReservationError);
client_method!(ReservationClient => fn complete_reservation(reservation_id: String) -> () as ReservationRequest::CompleteReservation, Error = ReservationError);
client_method!(ReservationClient => fn current_reservation(user_id: String) -> Option<Reservation> as ReservationRequest::CurrentReservation, Error = ReservationError);
client_method!(ReservationClient => fn cancel_watches() -> () as ReservationRequest::CancelWatches, Error = ReservationError);
