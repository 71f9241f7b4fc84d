//! Collaborator contracts for authentication and entry storage.
//!
//! The journal never talks to a concrete service directly: the app is handed
//! an [`AuthClient`] and an [`EntryStore`] and everything above them is
//! backend-agnostic. Two implementations ship with the crate, an in-memory
//! one ([`memory`]) and a Firebase REST client ([`firebase`]).

pub mod firebase;
mod firestore;
pub mod memory;

use crate::errors::{AuthError, StoreError};
use crate::journal_entry::{EntryDraft, EntryId, JournalEntry, User, UserId};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::fmt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// One delivery from a live subscription: the owner's full, recency-ordered
/// entry set, or the reason it could not be read.
pub type SnapshotEvent = Result<Vec<JournalEntry>, StoreError>;

pub struct Subscription {
    pub events: BoxStream<'static, SnapshotEvent>,
    pub handle: SubscriptionHandle,
}

impl Subscription {
    /// Wraps a raw event stream so it ends as soon as `token` is cancelled.
    pub(crate) fn new<S>(events: S, token: CancellationToken) -> Self
    where
        S: futures::Stream<Item = SnapshotEvent> + Send + 'static,
    {
        Subscription {
            events: events.take_until(token.clone().cancelled_owned()).boxed(),
            handle: SubscriptionHandle::new(token),
        }
    }
}

/// Teardown handle for a subscription. Cancels exactly once, either through
/// [`SubscriptionHandle::cancel`] or when dropped.
pub struct SubscriptionHandle {
    token: Option<CancellationToken>,
}

impl SubscriptionHandle {
    pub fn new(token: CancellationToken) -> Self {
        SubscriptionHandle { token: Some(token) }
    }

    pub fn cancel(mut self) {
        self.fire();
    }

    fn fire(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.fire();
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
pub trait AuthClient: Send + Sync {
    fn current_user(&self) -> Option<User>;

    /// Live auth state. The receiver sees every sign-in and sign-out;
    /// dropping it unsubscribes.
    fn watch(&self) -> watch::Receiver<Option<User>>;

    async fn sign_in(&self, credentials: Credentials) -> Result<User, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// A remote entry collection, scoped to whoever is signed in.
#[async_trait]
pub trait EntryStore: Send + Sync {
    fn subscribe(&self, owner: &UserId) -> Subscription;

    async fn create(&self, draft: EntryDraft) -> Result<EntryId, StoreError>;

    async fn update(&self, id: &EntryId, draft: EntryDraft) -> Result<(), StoreError>;

    async fn delete(&self, id: &EntryId) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn cancelled_subscription_stops_yielding() {
        let token = CancellationToken::new();
        let mut sub = Subscription::new(stream::pending::<SnapshotEvent>(), token.clone());
        sub.handle.cancel();
        assert!(token.is_cancelled());
        assert!(sub.events.next().await.is_none());
    }

    #[test]
    fn dropping_the_handle_cancels() {
        let token = CancellationToken::new();
        drop(SubscriptionHandle::new(token.clone()));
        assert!(token.is_cancelled());
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials {
            email: "a@b.c".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
