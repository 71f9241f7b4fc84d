//! In-process auth and entry store.
//!
//! Backs `--offline` runs and the test suite. It follows the same rules a
//! hosted store would: every mutation must come from the entry's owner, each
//! write stamps a fresh server timestamp, and subscribers receive the owner's
//! full snapshot after every change.

use super::{AuthClient, Credentials, EntryStore, SnapshotEvent, Subscription};
use crate::errors::{AuthError, StoreError};
use crate::journal_entry::{EntryDraft, EntryId, JournalEntry, User, UserId};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

struct Account {
    password: String,
    user: User,
}

struct StoredEntry {
    entry: JournalEntry,
    seq: u64,
}

struct Subscriber {
    owner: UserId,
    tx: mpsc::UnboundedSender<SnapshotEvent>,
    token: CancellationToken,
}

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<String, Account>,
    entries: Vec<StoredEntry>,
    subscribers: Vec<Subscriber>,
    next_seq: u64,
    fail_writes: bool,
}

impl MemoryState {
    fn snapshot(&self, owner: &UserId) -> Vec<JournalEntry> {
        let mut owned: Vec<&StoredEntry> = self
            .entries
            .iter()
            .filter(|stored| &stored.entry.owner_id == owner)
            .collect();
        owned.sort_by(|a, b| {
            b.entry
                .created_at
                .cmp(&a.entry.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        owned.into_iter().map(|stored| stored.entry.clone()).collect()
    }

    fn publish(&mut self, owner: &UserId) {
        let snapshot = self.snapshot(owner);
        self.subscribers.retain(|sub| {
            if sub.token.is_cancelled() {
                return false;
            }
            if &sub.owner != owner {
                return true;
            }
            sub.tx.send(Ok(snapshot.clone())).is_ok()
        });
        debug!(owner = %owner, entries = snapshot.len(), "published snapshot");
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn position_owned_by(&self, id: &EntryId, user: &User) -> Result<usize, StoreError> {
        let index = self
            .entries
            .iter()
            .position(|stored| &stored.entry.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        if self.entries[index].entry.owner_id != user.id {
            return Err(StoreError::PermissionDenied);
        }
        Ok(index)
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Rejected {
                status: 503,
                message: "store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

struct Shared {
    state: Mutex<MemoryState>,
    session: watch::Sender<Option<User>>,
    open_registration: bool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn signed_in(&self) -> Result<User, StoreError> {
        self.session.borrow().clone().ok_or(StoreError::NotSignedIn)
    }
}

/// Owner of the shared in-memory state; hands out the two collaborators.
#[derive(Clone)]
pub struct MemoryBackend {
    shared: Arc<Shared>,
}

impl MemoryBackend {
    /// Only accounts added with [`MemoryBackend::register`] can sign in.
    pub fn new() -> Self {
        Self::build(false)
    }

    /// Any email signs in; unknown addresses get an account on first use.
    pub fn open() -> Self {
        Self::build(true)
    }

    fn build(open_registration: bool) -> Self {
        let (session, _) = watch::channel(None);
        MemoryBackend {
            shared: Arc::new(Shared {
                state: Mutex::new(MemoryState::default()),
                session,
                open_registration,
            }),
        }
    }

    pub fn register(&self, email: &str, password: &str, display_name: Option<&str>) -> User {
        let user = User {
            id: UserId::new(Uuid::new_v4().to_string()),
            email: email.to_string(),
            display_name: display_name.map(str::to_string),
        };
        self.shared.lock().accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    pub fn auth(&self) -> MemoryAuth {
        MemoryAuth {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn store(&self) -> MemoryStore {
        MemoryStore {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Makes every following create, update and delete fail until reset.
    pub fn fail_writes(&self, fail: bool) {
        self.shared.lock().fail_writes = fail;
    }

    /// Delivers a read failure to every live subscriber of `owner`.
    pub fn push_sync_error(&self, owner: &UserId) {
        let state = self.shared.lock();
        for sub in state.subscribers.iter().filter(|s| &s.owner == owner) {
            let _ = sub.tx.send(Err(StoreError::Rejected {
                status: 503,
                message: "listener interrupted".to_string(),
            }));
        }
    }

    /// Subscriptions that have not been cancelled yet.
    pub fn live_subscribers(&self) -> usize {
        let mut state = self.shared.lock();
        state
            .subscribers
            .retain(|sub| !sub.token.is_cancelled() && !sub.tx.is_closed());
        state.subscribers.len()
    }

    /// Entries currently held for `owner`, newest write first.
    pub fn entries_of(&self, owner: &UserId) -> Vec<JournalEntry> {
        self.shared.lock().snapshot(owner)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MemoryAuth {
    shared: Arc<Shared>,
}

#[async_trait]
impl AuthClient for MemoryAuth {
    fn current_user(&self) -> Option<User> {
        self.shared.session.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<User>> {
        self.shared.session.subscribe()
    }

    async fn sign_in(&self, credentials: Credentials) -> Result<User, AuthError> {
        let email = credentials.email.trim();
        if email.is_empty() {
            return Err(AuthError::Rejected("email is required".to_string()));
        }

        let user = {
            let mut state = self.shared.lock();
            match state.accounts.get(email) {
                Some(account) if account.password == credentials.password => account.user.clone(),
                Some(_) => return Err(AuthError::Rejected("invalid password".to_string())),
                None if self.shared.open_registration => {
                    let user = User {
                        id: UserId::new(Uuid::new_v4().to_string()),
                        email: email.to_string(),
                        display_name: None,
                    };
                    state.accounts.insert(
                        email.to_string(),
                        Account {
                            password: credentials.password.clone(),
                            user: user.clone(),
                        },
                    );
                    user
                }
                None => return Err(AuthError::Rejected("unknown account".to_string())),
            }
        };

        debug!(user = %user.id, "memory sign-in");
        self.shared.session.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.shared.session.send_replace(None);
        Ok(())
    }
}

pub struct MemoryStore {
    shared: Arc<Shared>,
}

#[async_trait]
impl EntryStore for MemoryStore {
    fn subscribe(&self, owner: &UserId) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();

        let allowed = matches!(self.shared.signed_in(), Ok(user) if &user.id == owner);
        if allowed {
            let mut state = self.shared.lock();
            let _ = tx.send(Ok(state.snapshot(owner)));
            state.subscribers.push(Subscriber {
                owner: owner.clone(),
                tx,
                token: token.clone(),
            });
        } else {
            let _ = tx.send(Err(StoreError::PermissionDenied));
        }

        Subscription::new(UnboundedReceiverStream::new(rx), token)
    }

    async fn create(&self, draft: EntryDraft) -> Result<EntryId, StoreError> {
        let user = self.shared.signed_in()?;
        if draft.owner_id != user.id {
            return Err(StoreError::PermissionDenied);
        }

        let mut state = self.shared.lock();
        state.check_writable()?;
        let id = EntryId::new(Uuid::new_v4().simple().to_string());
        let seq = state.bump_seq();
        let entry = draft.into_entry(id.clone(), Some(Utc::now()));
        state.entries.push(StoredEntry { entry, seq });
        state.publish(&user.id);
        Ok(id)
    }

    async fn update(&self, id: &EntryId, draft: EntryDraft) -> Result<(), StoreError> {
        let user = self.shared.signed_in()?;
        if draft.owner_id != user.id {
            return Err(StoreError::PermissionDenied);
        }

        let mut state = self.shared.lock();
        state.check_writable()?;
        let index = state.position_owned_by(id, &user)?;
        let seq = state.bump_seq();
        state.entries[index] = StoredEntry {
            entry: draft.into_entry(id.clone(), Some(Utc::now())),
            seq,
        };
        state.publish(&user.id);
        Ok(())
    }

    async fn delete(&self, id: &EntryId) -> Result<(), StoreError> {
        let user = self.shared.signed_in()?;

        let mut state = self.shared.lock();
        state.check_writable()?;
        let index = state.position_owned_by(id, &user)?;
        state.entries.remove(index);
        state.publish(&user.id);
        Ok(())
    }
}
