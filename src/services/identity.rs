use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::clients::IdentityClient;
use crate::cpf;
use crate::domain::{initial_balance, User, UserCreate};
use crate::error::IdentityError;
use crate::messages::IdentityRequest;
use crate::storage::{Storage, SESSION_KEY, USERS_KEY};

/// Owns the user collection and the current session. Restores both from
/// storage on construction and persists them after every mutation.
pub struct IdentityService {
    receiver: mpsc::Receiver<IdentityRequest>,
    storage: Arc<dyn Storage>,
    users: Vec<User>,
    current_user: Option<User>,
    next_id: u64,
}

impl IdentityService {
    pub fn new(buffer_size: usize, storage: Arc<dyn Storage>) -> (Self, IdentityClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);

        let users: Vec<User> = storage
            .get(USERS_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        let current_user: Option<User> = storage
            .get(SESSION_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok());

        let next_id = users
            .iter()
            .filter_map(|u| u.id.strip_prefix("user_")?.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;

        let service = Self {
            receiver,
            storage,
            users,
            current_user,
            next_id,
        };
        let client = IdentityClient::new(sender);
        (service, client)
    }

    #[instrument(name = "identity_service", skip(self))]
    pub async fn run(mut self) {
        info!(users = self.users.len(), "IdentityService starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                IdentityRequest::Register { payload, respond_to } => {
                    let _ = respond_to.send(self.handle_register(payload));
                }
                IdentityRequest::Authenticate { cpf, password, respond_to } => {
                    let _ = respond_to.send(self.handle_authenticate(&cpf, &password));
                }
                IdentityRequest::GetUser { id, respond_to } => {
                    let user = self.users.iter().find(|u| u.id == id).cloned();
                    let _ = respond_to.send(Ok(user));
                }
                IdentityRequest::CurrentUser { respond_to } => {
                    let _ = respond_to.send(Ok(self.current_user.clone()));
                }
                IdentityRequest::UpdateBalance { id, balance, respond_to } => {
                    let _ = respond_to.send(self.handle_update_balance(&id, balance));
                }
                IdentityRequest::EndSession { respond_to } => {
                    let _ = respond_to.send(self.handle_end_session());
                }
                IdentityRequest::Shutdown => {
                    info!("IdentityService shutting down");
                    break;
                }
            }
        }
        info!("IdentityService stopped");
    }

    #[instrument(fields(name = %payload.name), skip(self, payload))]
    fn handle_register(&mut self, payload: UserCreate) -> Result<User, IdentityError> {
        let name = payload.name.trim().to_string();
        if name.chars().count() < 3 {
            return Err(IdentityError::ValidationError(
                "Name must have at least 3 characters".to_string(),
            ));
        }

        if !cpf::validate(&payload.cpf) {
            return Err(IdentityError::ValidationError("Invalid CPF".to_string()));
        }
        let normalized_cpf = cpf::normalize(&payload.cpf);

        let phone = cpf::normalize(&payload.phone);
        if phone.len() < 10 {
            return Err(IdentityError::ValidationError(
                "Phone must have at least 10 digits".to_string(),
            ));
        }

        let password = payload.password;
        if password.len() < 4
            || password.len() > 6
            || !password.chars().all(|c| c.is_ascii_digit())
        {
            return Err(IdentityError::ValidationError(
                "Password must be 4 to 6 digits".to_string(),
            ));
        }

        if self.users.iter().any(|u| u.cpf == normalized_cpf) {
            warn!("CPF already registered");
            return Err(IdentityError::DuplicateCpf(cpf::format(&normalized_cpf)));
        }

        let user = User {
            id: format!("user_{}", self.next_id),
            name,
            cpf: normalized_cpf,
            phone,
            password,
            balance: initial_balance(),
            created_at: Utc::now(),
        };
        self.next_id += 1;

        self.users.push(user.clone());
        self.current_user = Some(user.clone());
        self.persist_users()?;
        self.persist_session()?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    #[instrument(skip(self, raw_cpf, password))]
    fn handle_authenticate(&mut self, raw_cpf: &str, password: &str) -> Result<User, IdentityError> {
        let normalized = cpf::normalize(raw_cpf);
        let user = self
            .users
            .iter()
            .find(|u| u.cpf == normalized && u.password == password)
            .cloned();

        match user {
            Some(user) => {
                self.current_user = Some(user.clone());
                self.persist_session()?;
                info!(user_id = %user.id, "User authenticated");
                Ok(user)
            }
            None => {
                debug!("Credential check failed");
                Err(IdentityError::InvalidCredentials)
            }
        }
    }

    #[instrument(fields(user_id = %id), skip(self, id))]
    fn handle_update_balance(&mut self, id: &str, balance: Decimal) -> Result<(), IdentityError> {
        if balance < Decimal::ZERO {
            return Err(IdentityError::NegativeBalance(balance));
        }

        let user = self
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| IdentityError::NotFound(id.to_string()))?;
        user.balance = balance;

        if let Some(current) = self.current_user.as_mut() {
            if current.id == id {
                current.balance = balance;
            }
        }

        self.persist_users()?;
        self.persist_session()?;
        debug!(%balance, "Balance updated");
        Ok(())
    }

    fn handle_end_session(&mut self) -> Result<(), IdentityError> {
        if self.current_user.take().is_some() {
            info!("Session ended");
        }
        self.storage
            .remove(SESSION_KEY)
            .map_err(IdentityError::StorageError)
    }

    fn persist_users(&self) -> Result<(), IdentityError> {
        let snapshot = serde_json::to_string(&self.users)
            .map_err(|e| IdentityError::StorageError(e.to_string()))?;
        self.storage
            .set(USERS_KEY, &snapshot)
            .map_err(IdentityError::StorageError)
    }

    fn persist_session(&self) -> Result<(), IdentityError> {
        match &self.current_user {
            Some(user) => {
                let snapshot = serde_json::to_string(user)
                    .map_err(|e| IdentityError::StorageError(e.to_string()))?;
                self.storage
                    .set(SESSION_KEY, &snapshot)
                    .map_err(IdentityError::StorageError)
            }
            None => self
                .storage
                .remove(SESSION_KEY)
                .map_err(IdentityError::StorageError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn spawn_service() -> (IdentityClient, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let (service, client) = IdentityService::new(16, storage.clone());
        tokio::spawn(service.run());
        (client, storage)
    }

    fn valid_payload() -> UserCreate {
        UserCreate::new("Alice Souza", "529.982.247-25", "(21) 98765-4321", "1234")
    }

    #[tokio::test]
    async fn register_grants_initial_balance_and_session() {
        let (client, _storage) = spawn_service();

        let user = client.register(valid_payload()).await.unwrap();
        assert_eq!(user.balance, initial_balance());
        assert_eq!(user.cpf, "52998224725");
        assert_eq!(user.phone, "21987654321");

        let session = client.current_user().await.unwrap();
        assert_eq!(session.map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn register_rejects_bad_fields() {
        let (client, _storage) = spawn_service();

        let mut short_name = valid_payload();
        short_name.name = "Al".to_string();
        assert!(matches!(
            client.register(short_name).await,
            Err(IdentityError::ValidationError(_))
        ));

        let mut bad_cpf = valid_payload();
        bad_cpf.cpf = "11111111111".to_string();
        assert!(matches!(
            client.register(bad_cpf).await,
            Err(IdentityError::ValidationError(_))
        ));

        let mut short_phone = valid_payload();
        short_phone.phone = "219876".to_string();
        assert!(matches!(
            client.register(short_phone).await,
            Err(IdentityError::ValidationError(_))
        ));

        let mut long_password = valid_payload();
        long_password.password = "1234567".to_string();
        assert!(matches!(
            client.register(long_password).await,
            Err(IdentityError::ValidationError(_))
        ));

        let mut non_numeric_password = valid_payload();
        non_numeric_password.password = "12ab".to_string();
        assert!(matches!(
            client.register(non_numeric_password).await,
            Err(IdentityError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn name_length_is_counted_in_characters() {
        let (client, _storage) = spawn_service();

        // Two characters even though the accent makes it three bytes.
        let mut two_chars = valid_payload();
        two_chars.name = "Zé".to_string();
        assert!(matches!(
            client.register(two_chars).await,
            Err(IdentityError::ValidationError(_))
        ));

        let mut three_chars = valid_payload();
        three_chars.name = "Léo".to_string();
        assert!(client.register(three_chars).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_cpf_is_rejected_regardless_of_other_fields() {
        let (client, _storage) = spawn_service();

        client.register(valid_payload()).await.unwrap();

        let other = UserCreate::new("Bruno Lima", "52998224725", "11912345678", "9999");
        assert!(matches!(
            client.register(other).await,
            Err(IdentityError::DuplicateCpf(_))
        ));
    }

    #[tokio::test]
    async fn authenticate_matches_registration() {
        let (client, _storage) = spawn_service();

        let registered = client.register(valid_payload()).await.unwrap();
        client.end_session().await.unwrap();
        assert_eq!(client.current_user().await.unwrap(), None);

        // Formatted CPF input normalizes to the same credentials.
        let user = client
            .authenticate("529.982.247-25".to_string(), "1234".to_string())
            .await
            .unwrap();
        assert_eq!(user.id, registered.id);

        assert_eq!(
            client
                .authenticate("52998224725".to_string(), "0000".to_string())
                .await,
            Err(IdentityError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn end_session_is_idempotent() {
        let (client, _storage) = spawn_service();
        client.register(valid_payload()).await.unwrap();

        client.end_session().await.unwrap();
        client.end_session().await.unwrap();
        assert_eq!(client.current_user().await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_balance_rejects_negative_and_unknown_users() {
        let (client, _storage) = spawn_service();
        let user = client.register(valid_payload()).await.unwrap();

        assert!(matches!(
            client
                .update_balance(user.id.clone(), Decimal::new(-100, 2))
                .await,
            Err(IdentityError::NegativeBalance(_))
        ));
        assert!(matches!(
            client
                .update_balance("user_999".to_string(), Decimal::ZERO)
                .await,
            Err(IdentityError::NotFound(_))
        ));

        client
            .update_balance(user.id.clone(), Decimal::new(4000, 2))
            .await
            .unwrap();
        let session = client.current_user().await.unwrap().unwrap();
        assert_eq!(session.balance, Decimal::new(4000, 2));
    }

    #[tokio::test]
    async fn state_survives_restart_through_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let (service, client) = IdentityService::new(16, storage.clone());
        let handle = tokio::spawn(service.run());

        let user = client.register(valid_payload()).await.unwrap();
        client.shutdown().await;
        handle.await.unwrap();

        let (service, client) = IdentityService::new(16, storage);
        tokio::spawn(service.run());

        let session = client.current_user().await.unwrap().unwrap();
        assert_eq!(session.id, user.id);

        // The restored id counter does not collide with persisted users.
        let other = UserCreate::new("Bruno Lima", "111.444.777-35", "11912345678", "4321");
        let second = client.register(other).await.unwrap();
        assert_ne!(second.id, user.id);
    }
}
