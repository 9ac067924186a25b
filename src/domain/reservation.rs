use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Locker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Active,
    Completed,
}

/// A paid, timed hold on a locker. `end_time` is always
/// `start_time + minutes`; the status moves `Active -> Completed` exactly
/// once, by timer expiry or explicit completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: String,
    pub user_id: String,
    pub locker_id: String,
    /// Cached display number so the UI never has to join on the inventory.
    pub locker_number: u32,
    pub minutes: i64,
    pub price: Decimal,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ReservationStatus,
}

impl Reservation {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        locker: &Locker,
        minutes: i64,
        price: Decimal,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            locker_id: locker.id.clone(),
            locker_number: locker.number,
            minutes,
            price,
            start_time,
            end_time: start_time + Duration::minutes(minutes),
            status: ReservationStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Active
    }
}

/// Remaining time, clamped at zero once `now` passes the end timestamp.
pub fn time_remaining(reservation: &Reservation, now: DateTime<Utc>) -> Duration {
    (reservation.end_time - now).max(Duration::zero())
}

/// `MM:SS` countdown display.
pub fn format_remaining(remaining: Duration) -> String {
    let total_seconds = remaining.num_seconds().max(0);
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::seed_lockers;

    fn sample(minutes: i64, start: DateTime<Utc>) -> Reservation {
        let lockers = seed_lockers();
        Reservation::new("reservation_1", "user_1", &lockers[0], minutes, Decimal::new(1000, 2), start)
    }

    #[test]
    fn end_time_is_start_plus_duration() {
        let start = Utc::now();
        let reservation = sample(30, start);
        assert_eq!(reservation.end_time, start + Duration::minutes(30));
        assert_eq!(reservation.status, ReservationStatus::Active);
        assert_eq!(reservation.locker_number, 1);
    }

    #[test]
    fn remaining_time_counts_down_and_clamps_at_zero() {
        let start = Utc::now();
        let reservation = sample(30, start);

        assert_eq!(
            time_remaining(&reservation, start + Duration::minutes(10)),
            Duration::minutes(20)
        );
        assert_eq!(
            time_remaining(&reservation, start + Duration::minutes(30)),
            Duration::zero()
        );
        // Past the end timestamp the remaining time stays at zero.
        assert_eq!(
            time_remaining(&reservation, start + Duration::hours(2)),
            Duration::zero()
        );
    }

    #[test]
    fn formats_countdown_as_minutes_and_seconds() {
        assert_eq!(format_remaining(Duration::zero()), "00:00");
        assert_eq!(format_remaining(Duration::seconds(65)), "01:05");
        assert_eq!(format_remaining(Duration::minutes(30)), "30:00");
        assert_eq!(format_remaining(Duration::seconds(-5)), "00:00");
    }

    #[test]
    fn round_trips_through_json() {
        let reservation = sample(45, Utc::now());
        let json = serde_json::to_string(&reservation).unwrap();
        let back: Reservation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reservation);
        assert!(json.contains("\"lockerId\""));
        assert!(json.contains("\"active\""));
    }
}
