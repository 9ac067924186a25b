mod app_system;
mod clients;
mod cpf;
mod domain;
mod error;
mod messages;
mod services;
mod storage;

#[cfg(test)]
mod mock_support;

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info, Instrument};

use crate::app_system::{setup_tracing, LockerSystem};
use crate::domain::{format_remaining, time_remaining, UserCreate};
use crate::storage::MemoryStorage;

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    info!("Starting OrlaLock locker system");

    let storage = Arc::new(MemoryStorage::new());
    let system = LockerSystem::new(storage);

    // Register a demo user
    let payload = UserCreate::new("Alice Souza", "529.982.247-25", "(21) 98765-4321", "1234");

    let span = tracing::info_span!("registration");
    let user = async {
        info!(cpf = %cpf::format(&payload.cpf), "Registering demo user");
        system
            .identity_client
            .register(payload)
            .await
            .map_err(|e| e.to_string())
    }
    .instrument(span)
    .await?;

    info!(
        user_id = %user.id,
        phone = %cpf::format_phone(&user.phone),
        balance = %user.balance,
        "User registered"
    );

    // Browse the inventory
    let available = system
        .reservation_client
        .available_lockers()
        .await
        .map_err(|e| e.to_string())?;
    info!(count = available.len(), "Available lockers");
    for locker in &available {
        info!(locker_id = %locker.id, number = locker.number, location = %locker.location, "  locker");
    }

    // Reserve locker 1 for 30 minutes at R$ 10.00
    let span = tracing::info_span!("reservation");
    let reservation = async {
        system
            .reservation_client
            .select_locker("locker_001".to_string())
            .await
            .map_err(|e| e.to_string())?;
        system
            .reservation_client
            .select_duration(30, Decimal::new(1000, 2))
            .await
            .map_err(|e| e.to_string())?;

        info!("Confirming reservation");
        system
            .reservation_client
            .confirm_reservation(user.id.clone())
            .await
            .map_err(|e| e.to_string())
    }
    .instrument(span)
    .await;

    match reservation {
        Ok(reservation) => {
            let remaining = time_remaining(&reservation, chrono::Utc::now());
            info!(
                reservation_id = %reservation.id,
                locker = reservation.locker_number,
                countdown = %format_remaining(remaining),
                "Reservation active"
            );

            let balance = system
                .identity_client
                .current_user()
                .await
                .map_err(|e| e.to_string())?
                .map(|u| u.balance);
            info!(?balance, "Balance after payment");

            // Hand the locker back early instead of waiting out the timer
            system
                .reservation_client
                .complete_reservation(reservation.id)
                .await
                .map_err(|e| e.to_string())?;
            info!("Reservation completed, locker released");
        }
        Err(e) => error!(error = %e, "Reservation failed"),
    }

    system.logout().await?;
    system.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}
