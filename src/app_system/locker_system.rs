use std::sync::Arc;

use tracing::{error, info};

use crate::clients::{IdentityClient, ReservationClient};
use crate::domain::seed_lockers;
use crate::services::{IdentityService, ReservationService};
use crate::storage::Storage;

/// The main application system that wires both actors together.
///
/// Responsible for starting the services over a shared storage backend,
/// seeding the locker inventory, and shutting everything down in order.
pub struct LockerSystem {
    pub identity_client: IdentityClient,
    pub reservation_client: ReservationClient,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl LockerSystem {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let (identity_service, identity_client) = IdentityService::new(32, storage.clone());
        let identity_handle = tokio::spawn(identity_service.run());

        let (reservation_service, reservation_client) = ReservationService::new(
            32,
            identity_client.clone(),
            storage,
            seed_lockers(),
        );
        let reservation_handle = tokio::spawn(reservation_service.run());

        Self {
            identity_client,
            reservation_client,
            handles: vec![identity_handle, reservation_handle],
        }
    }

    /// Ends the session and cancels any running expiry watches, so a signed
    /// out client leaves no repeating timers behind.
    pub async fn logout(&self) -> Result<(), String> {
        self.reservation_client
            .cancel_watches()
            .await
            .map_err(|e| e.to_string())?;
        self.identity_client
            .end_session()
            .await
            .map_err(|e| e.to_string())
    }

    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");

        // The reservation service goes first: its expiry watches hold a
        // sender into its own channel, so it stops on the explicit signal
        // rather than on channel closure.
        self.reservation_client.shutdown().await;
        self.identity_client.shutdown().await;

        drop(self.reservation_client);
        drop(self.identity_client);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(format!("Actor task failed: {:?}", e));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
