use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::clients::{IdentityClient, ReservationClient};
use crate::domain::{time_remaining, Locker, LockerStatus, Reservation, ReservationStatus};
use crate::error::ReservationError;
use crate::messages::ReservationRequest;
use crate::storage::{Storage, RESERVATIONS_KEY};

/// Owns the locker inventory, the reservation history, the pending
/// selection, and one expiry watch task per active reservation. Balance is
/// only ever touched through the identity client.
pub struct ReservationService {
    receiver: mpsc::Receiver<ReservationRequest>,
    /// Used by expiry watch tasks to send the completion message back in.
    self_sender: mpsc::Sender<ReservationRequest>,
    identity_client: IdentityClient,
    storage: Arc<dyn Storage>,
    lockers: Vec<Locker>,
    reservations: Vec<Reservation>,
    selected_locker: Option<String>,
    selected_minutes: Option<i64>,
    selected_price: Option<Decimal>,
    watches: HashMap<String, JoinHandle<()>>,
    next_id: u64,
}

impl ReservationService {
    pub fn new(
        buffer_size: usize,
        identity_client: IdentityClient,
        storage: Arc<dyn Storage>,
        lockers: Vec<Locker>,
    ) -> (Self, ReservationClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);

        let reservations: Vec<Reservation> = storage
            .get(RESERVATIONS_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();

        let next_id = reservations
            .iter()
            .filter_map(|r| r.id.strip_prefix("reservation_")?.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;

        let service = Self {
            receiver,
            self_sender: sender.clone(),
            identity_client,
            storage,
            lockers,
            reservations,
            selected_locker: None,
            selected_minutes: None,
            selected_price: None,
            watches: HashMap::new(),
            next_id,
        };
        let client = ReservationClient::new(sender);
        (service, client)
    }

    #[instrument(name = "reservation_service", skip(self))]
    pub async fn run(mut self) {
        info!(
            lockers = self.lockers.len(),
            reservations = self.reservations.len(),
            "ReservationService starting"
        );
        self.resume_watches();

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ReservationRequest::AllLockers { respond_to } => {
                    let _ = respond_to.send(Ok(self.lockers.clone()));
                }
                ReservationRequest::AvailableLockers { respond_to } => {
                    let available = self
                        .lockers
                        .iter()
                        .filter(|l| l.status == LockerStatus::Available)
                        .cloned()
                        .collect();
                    let _ = respond_to.send(Ok(available));
                }
                ReservationRequest::SelectLocker { locker_id, respond_to } => {
                    self.selected_locker = Some(locker_id);
                    let _ = respond_to.send(Ok(self.selection_ready()));
                }
                ReservationRequest::SelectDuration { minutes, price, respond_to } => {
                    let _ = respond_to.send(self.handle_select_duration(minutes, price));
                }
                ReservationRequest::ConfirmReservation { user_id, respond_to } => {
                    let _ = respond_to.send(self.handle_confirm(&user_id).await);
                }
                ReservationRequest::CompleteReservation { reservation_id, respond_to } => {
                    let _ = respond_to.send(self.handle_complete(&reservation_id));
                }
                ReservationRequest::CurrentReservation { user_id, respond_to } => {
                    let current = self
                        .reservations
                        .iter()
                        .rev()
                        .find(|r| r.user_id == user_id && r.is_active())
                        .cloned();
                    let _ = respond_to.send(Ok(current));
                }
                ReservationRequest::CancelWatches { respond_to } => {
                    self.cancel_all_watches();
                    let _ = respond_to.send(Ok(()));
                }
                ReservationRequest::Shutdown => {
                    info!("ReservationService shutting down");
                    break;
                }
            }
        }

        self.cancel_all_watches();
        info!("ReservationService stopped");
    }

    /// Both halves of the selection are in place.
    fn selection_ready(&self) -> bool {
        self.selected_locker.is_some() && self.selected_minutes.is_some()
    }

    /// A zero or negative duration can never expire sensibly, and a
    /// negative price would turn the debit into a credit; neither becomes
    /// part of the selection.
    fn handle_select_duration(
        &mut self,
        minutes: i64,
        price: Decimal,
    ) -> Result<bool, ReservationError> {
        if minutes <= 0 {
            return Err(ReservationError::InvalidSelection(format!(
                "duration must be positive, got {} minutes",
                minutes
            )));
        }
        if price < Decimal::ZERO {
            return Err(ReservationError::InvalidSelection(format!(
                "price cannot be negative, got {}",
                price
            )));
        }

        self.selected_minutes = Some(minutes);
        self.selected_price = Some(price);
        Ok(self.selection_ready())
    }

    #[instrument(fields(user_id = %user_id), skip(self, user_id))]
    async fn handle_confirm(&mut self, user_id: &str) -> Result<Reservation, ReservationError> {
        let (locker_id, minutes, price) = match (
            &self.selected_locker,
            self.selected_minutes,
            self.selected_price,
        ) {
            (Some(locker_id), Some(minutes), Some(price)) => (locker_id.clone(), minutes, price),
            _ => return Err(ReservationError::NoSelection),
        };

        let locker_index = self
            .lockers
            .iter()
            .position(|l| l.id == locker_id)
            .ok_or_else(|| ReservationError::LockerNotFound(locker_id.clone()))?;
        if self.lockers[locker_index].status != LockerStatus::Available {
            return Err(ReservationError::LockerUnavailable(locker_id));
        }

        let user = match self.identity_client.get_user(user_id.to_string()).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(ReservationError::InvalidUser(user_id.to_string())),
            Err(e) => {
                return Err(ReservationError::InvalidUser(format!(
                    "User lookup failed: {}",
                    e
                )))
            }
        };

        if user.balance < price {
            warn!(balance = %user.balance, %price, "Insufficient balance");
            return Err(ReservationError::InsufficientBalance {
                required: price,
                available: user.balance,
            });
        }

        // Debit first; nothing else has been touched if this fails.
        let previous_balance = user.balance;
        self.identity_client
            .update_balance(user.id.clone(), previous_balance - price)
            .await
            .map_err(|e| ReservationError::BalanceUpdate(e.to_string()))?;

        let reservation = Reservation::new(
            format!("reservation_{}", self.next_id),
            user.id,
            &self.lockers[locker_index],
            minutes,
            price,
            Utc::now(),
        );
        self.next_id += 1;

        self.lockers[locker_index].status = LockerStatus::Occupied;
        self.reservations.push(reservation.clone());

        if let Err(e) = self.persist_reservations() {
            // Storage failure must not leave the balance debited with no
            // reservation on record: undo the locker, the history entry and
            // the debit before reporting the error.
            self.reservations.pop();
            self.lockers[locker_index].status = LockerStatus::Available;
            if let Err(refund_error) = self
                .identity_client
                .update_balance(reservation.user_id.clone(), previous_balance)
                .await
            {
                warn!(error = %refund_error, "Refund after failed snapshot did not go through");
                return Err(ReservationError::BalanceUpdate(format!(
                    "{}; refund failed: {}",
                    e, refund_error
                )));
            }
            return Err(e);
        }

        self.selected_locker = None;
        self.selected_minutes = None;
        self.selected_price = None;

        self.spawn_watch(&reservation.id, Duration::from_secs(minutes.max(0) as u64 * 60));

        info!(
            reservation_id = %reservation.id,
            locker_id = %reservation.locker_id,
            %price,
            "Reservation confirmed"
        );
        Ok(reservation)
    }

    /// Idempotent: completing an unknown or already completed reservation is
    /// a no-op, which also makes the explicit-completion/timer race benign.
    #[instrument(fields(reservation_id = %reservation_id), skip(self, reservation_id))]
    fn handle_complete(&mut self, reservation_id: &str) -> Result<(), ReservationError> {
        let Some(reservation) = self
            .reservations
            .iter_mut()
            .find(|r| r.id == reservation_id)
        else {
            debug!("Reservation not found, nothing to complete");
            return Ok(());
        };
        if !reservation.is_active() {
            debug!("Reservation already completed");
            return Ok(());
        }

        reservation.status = ReservationStatus::Completed;
        let locker_id = reservation.locker_id.clone();
        if let Some(locker) = self.lockers.iter_mut().find(|l| l.id == locker_id) {
            locker.status = LockerStatus::Available;
        }

        if let Some(watch) = self.watches.remove(reservation_id) {
            watch.abort();
        }

        self.persist_reservations()?;
        info!(%locker_id, "Reservation completed");
        Ok(())
    }

    /// Spawns the 1-second expiry poll for one reservation and tracks its
    /// handle so completion by any path can cancel it.
    fn spawn_watch(&mut self, reservation_id: &str, remaining: Duration) {
        let deadline = tokio::time::Instant::now() + remaining;
        let sender = self.self_sender.clone();
        let id = reservation_id.to_string();

        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(1));
            loop {
                tick.tick().await;
                if tokio::time::Instant::now() >= deadline {
                    let (respond_to, _ack) = oneshot::channel();
                    let _ = sender
                        .send(ReservationRequest::CompleteReservation {
                            reservation_id: id.clone(),
                            respond_to,
                        })
                        .await;
                    break;
                }
            }
        });

        self.watches.insert(reservation_id.to_string(), handle);
    }

    /// Restarts expiry watches for reservations that were still active in
    /// the restored snapshot.
    fn resume_watches(&mut self) {
        let now = Utc::now();
        let pending: Vec<(String, Duration)> = self
            .reservations
            .iter()
            .filter(|r| r.is_active())
            .map(|r| {
                let remaining = time_remaining(r, now).to_std().unwrap_or(Duration::ZERO);
                (r.id.clone(), remaining)
            })
            .collect();

        for (id, remaining) in pending {
            debug!(reservation_id = %id, ?remaining, "Resuming expiry watch");
            self.spawn_watch(&id, remaining);
        }
    }

    fn cancel_all_watches(&mut self) {
        for (_, watch) in self.watches.drain() {
            watch.abort();
        }
    }

    fn persist_reservations(&self) -> Result<(), ReservationError> {
        let snapshot = serde_json::to_string(&self.reservations)
            .map_err(|e| ReservationError::StorageError(e.to_string()))?;
        self.storage
            .set(RESERVATIONS_KEY, &snapshot)
            .map_err(ReservationError::StorageError)
    }
}
