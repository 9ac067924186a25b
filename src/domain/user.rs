use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A registered user and their simulated wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    /// Normalized to eleven digits; unique across all users.
    pub cpf: String,
    /// Normalized digits only.
    pub phone: String,
    pub password: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Payload for registering a new user. Fields arrive as typed and are
/// normalized and validated by the identity service.
#[derive(Debug, Clone)]
pub struct UserCreate {
    pub name: String,
    pub cpf: String,
    pub phone: String,
    pub password: String,
}

impl UserCreate {
    pub fn new(
        name: impl Into<String>,
        cpf: impl Into<String>,
        phone: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            cpf: cpf.into(),
            phone: phone.into(),
            password: password.into(),
        }
    }
}

/// Every new account starts with the fixed R$ 50.00 grant.
pub fn initial_balance() -> Decimal {
    Decimal::new(5000, 2)
}
