//! Mock clients for testing a service in isolation.
//!
//! Instead of spinning up a real `IdentityService` when the subject under
//! test is the reservation side, tests build a client whose requests land
//! on a channel they control, then script each response deterministically.

use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};

use crate::clients::IdentityClient;
use crate::domain::User;
use crate::error::IdentityError;
use crate::messages::IdentityRequest;

/// Creates an identity client plus the receiver its requests arrive on.
pub fn mock_identity_client(
    buffer_size: usize,
) -> (IdentityClient, mpsc::Receiver<IdentityRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (IdentityClient::new(sender), receiver)
}

/// Asserts the next request is a `GetUser` and hands back its responder.
pub async fn expect_get_user(
    receiver: &mut mpsc::Receiver<IdentityRequest>,
) -> Option<(String, oneshot::Sender<Result<Option<User>, IdentityError>>)> {
    match receiver.recv().await {
        Some(IdentityRequest::GetUser { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Asserts the next request is an `UpdateBalance` and hands back its responder.
pub async fn expect_update_balance(
    receiver: &mut mpsc::Receiver<IdentityRequest>,
) -> Option<(String, Decimal, oneshot::Sender<Result<(), IdentityError>>)> {
    match receiver.recv().await {
        Some(IdentityRequest::UpdateBalance { id, balance, respond_to }) => {
            Some((id, balance, respond_to))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_client_routes_requests_to_the_scripted_receiver() {
        let (client, mut receiver) = mock_identity_client(4);

        let lookup = tokio::spawn(async move { client.get_user("user_1".to_string()).await });

        let (id, responder) = expect_get_user(&mut receiver).await.expect("expected GetUser");
        assert_eq!(id, "user_1");
        responder.send(Ok(None)).unwrap();

        assert_eq!(lookup.await.unwrap(), Ok(None));
    }
}
