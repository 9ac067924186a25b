use serde::{Deserialize, Serialize};

/// Display/lifecycle state of a locker.
///
/// `Reserved` only ever comes from seed data; the reservation lifecycle
/// moves lockers between `Available` and `Occupied`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockerStatus {
    Available,
    Occupied,
    Reserved,
}

/// A rentable beach locker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locker {
    pub id: String,
    pub number: u32,
    pub beach: String,
    pub status: LockerStatus,
    pub location: String,
}

impl Locker {
    pub fn new(
        id: impl Into<String>,
        number: u32,
        beach: impl Into<String>,
        status: LockerStatus,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            number,
            beach: beach.into(),
            status,
            location: location.into(),
        }
    }
}

/// Demo inventory: six lockers on Copacabana with mixed seed statuses.
/// Inventory is re-seeded on every startup and never persisted.
pub fn seed_lockers() -> Vec<Locker> {
    vec![
        Locker::new("locker_001", 1, "Praia de Copacabana", LockerStatus::Available, "Posto 5"),
        Locker::new("locker_002", 2, "Praia de Copacabana", LockerStatus::Occupied, "Posto 5"),
        Locker::new("locker_003", 3, "Praia de Copacabana", LockerStatus::Available, "Posto 5"),
        Locker::new("locker_004", 4, "Praia de Copacabana", LockerStatus::Reserved, "Posto 5"),
        Locker::new("locker_005", 5, "Praia de Copacabana", LockerStatus::Available, "Posto 6"),
        Locker::new("locker_006", 6, "Praia de Copacabana", LockerStatus::Available, "Posto 6"),
    ]
}
