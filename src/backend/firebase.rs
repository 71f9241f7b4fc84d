//! Firebase REST backend: Identity Toolkit for sign-in, Firestore for entries.
//!
//! The Firestore REST surface has no push channel, so a subscription polls
//! `runQuery` on a fixed interval and again right after every local write,
//! emitting a snapshot only when the result changed.

use super::firestore::{self, CommitRequest, QueryRow, Write, FIELD_OWNER, FIELD_TIMESTAMP};
use super::{AuthClient, Credentials, EntryStore, SnapshotEvent, Subscription};
use crate::config::FirebaseConfig;
use crate::errors::{AuthError, StoreError};
use crate::journal_entry::{EntryDraft, EntryId, JournalEntry, User, UserId};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Notify};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const JOURNAL_COLLECTION: &str = "journals";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Clone)]
struct Tokens {
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl Tokens {
    fn new(id_token: String, refresh_token: String, expires_in: &str) -> Self {
        let secs = expires_in.trim().parse::<i64>().unwrap_or(3600);
        Tokens {
            id_token,
            refresh_token,
            expires_at: Utc::now() + TimeDelta::seconds(secs),
        }
    }

    fn is_fresh(&self) -> bool {
        self.expires_at - TimeDelta::seconds(REFRESH_MARGIN_SECS) > Utc::now()
    }
}

/// Pulls the service's error message out of a failed response body.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .ok()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| format!("HTTP {status}"))
}

struct Session {
    http: Client,
    config: FirebaseConfig,
    user: watch::Sender<Option<User>>,
    tokens: Mutex<Option<Tokens>>,
    writes: Notify,
}

impl Session {
    fn lock_tokens(&self) -> MutexGuard<'_, Option<Tokens>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents",
            self.config.endpoints.firestore, self.config.project_id
        )
    }

    fn document_name(&self, id: &EntryId) -> String {
        format!(
            "projects/{}/databases/(default)/documents/{JOURNAL_COLLECTION}/{id}",
            self.config.project_id
        )
    }

    /// A usable id token, refreshed first when it is about to expire.
    async fn id_token(&self) -> Result<String, AuthError> {
        let tokens = self.lock_tokens().clone().ok_or(AuthError::NotSignedIn)?;
        if tokens.is_fresh() {
            return Ok(tokens.id_token);
        }

        debug!("refreshing firebase id token");
        let url = format!("{}/v1/token", self.config.endpoints.secure_token);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", tokens.refresh_token.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AuthError::RefreshFailed(error_message(response).await));
        }
        let refreshed: RefreshResponse = response.json().await?;
        let tokens = Tokens::new(
            refreshed.id_token,
            refreshed.refresh_token,
            &refreshed.expires_in,
        );

        let mut slot = self.lock_tokens();
        // A sign-out while refreshing wins.
        if slot.is_none() {
            return Err(AuthError::NotSignedIn);
        }
        *slot = Some(tokens.clone());
        Ok(tokens.id_token)
    }

    async fn send_authorized(
        &self,
        request: RequestBuilder,
        target: Option<&EntryId>,
    ) -> Result<Response, StoreError> {
        let token = self.id_token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = error_message(response).await;
        Err(match (status.as_u16(), target) {
            (401 | 403, _) => StoreError::PermissionDenied,
            (404, Some(id)) => StoreError::NotFound(id.clone()),
            (code, _) => StoreError::Rejected {
                status: code,
                message,
            },
        })
    }

    async fn commit(&self, write: Write, target: Option<&EntryId>) -> Result<(), StoreError> {
        let url = format!("{}:commit", self.documents_url());
        let body = CommitRequest {
            writes: vec![write],
        };
        self.send_authorized(self.http.post(&url).json(&body), target)
            .await?;
        self.writes.notify_waiters();
        Ok(())
    }

    async fn run_query(&self, owner: &UserId) -> Result<Vec<JournalEntry>, StoreError> {
        let url = format!("{}:runQuery", self.documents_url());
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": JOURNAL_COLLECTION }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": FIELD_OWNER },
                        "op": "EQUAL",
                        "value": { "stringValue": owner.as_str() }
                    }
                },
                "orderBy": [{
                    "field": { "fieldPath": FIELD_TIMESTAMP },
                    "direction": "DESCENDING"
                }]
            }
        });
        let response = self
            .send_authorized(self.http.post(&url).json(&body), None)
            .await?;
        let rows: Vec<QueryRow> = response.json().await?;
        rows.iter()
            .filter_map(|row| row.document.as_ref())
            .map(firestore::decode_entry)
            .collect()
    }
}

/// Shared Firebase session handing out the auth and store collaborators.
#[derive(Clone)]
pub struct FirebaseBackend {
    session: Arc<Session>,
}

impl FirebaseBackend {
    pub fn new(config: FirebaseConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let (user, _) = watch::channel(None);
        Ok(FirebaseBackend {
            session: Arc::new(Session {
                http,
                config,
                user,
                tokens: Mutex::new(None),
                writes: Notify::new(),
            }),
        })
    }

    pub fn auth(&self) -> FirebaseAuth {
        FirebaseAuth {
            session: Arc::clone(&self.session),
        }
    }

    pub fn store(&self) -> FirestoreStore {
        FirestoreStore {
            session: Arc::clone(&self.session),
        }
    }
}

pub struct FirebaseAuth {
    session: Arc<Session>,
}

#[async_trait]
impl AuthClient for FirebaseAuth {
    fn current_user(&self) -> Option<User> {
        self.session.user.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<User>> {
        self.session.user.subscribe()
    }

    async fn sign_in(&self, credentials: Credentials) -> Result<User, AuthError> {
        let url = format!(
            "{}/v1/accounts:signInWithPassword",
            self.session.config.endpoints.identity
        );
        let response = self
            .session
            .http
            .post(&url)
            .query(&[("key", self.session.config.api_key.as_str())])
            .json(&SignInRequest {
                email: credentials.email.trim(),
                password: &credentials.password,
                return_secure_token: true,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let message = error_message(response).await;
            warn!(%message, "firebase sign-in rejected");
            return Err(AuthError::Rejected(message));
        }

        let body: SignInResponse = response.json().await?;
        let user = User {
            id: UserId::new(body.local_id),
            email: body.email,
            display_name: body.display_name.filter(|name| !name.is_empty()),
        };
        *self.session.lock_tokens() = Some(Tokens::new(
            body.id_token,
            body.refresh_token,
            &body.expires_in,
        ));
        info!(user = %user.id, "signed in to firebase");
        self.session.user.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.session.lock_tokens().take();
        self.session.user.send_replace(None);
        Ok(())
    }
}

pub struct FirestoreStore {
    session: Arc<Session>,
}

#[async_trait]
impl EntryStore for FirestoreStore {
    fn subscribe(&self, owner: &UserId) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        tokio::spawn(poll_entries(
            Arc::clone(&self.session),
            owner.clone(),
            tx,
            token.clone(),
        ));
        Subscription::new(UnboundedReceiverStream::new(rx), token)
    }

    async fn create(&self, draft: EntryDraft) -> Result<EntryId, StoreError> {
        // Firestore ids are client-generated; the precondition guards collisions.
        let id = EntryId::new(Uuid::new_v4().simple().to_string());
        let write = Write::upsert(self.session.document_name(&id), &draft, false);
        self.session.commit(write, None).await?;
        debug!(entry = %id, "created entry");
        Ok(id)
    }

    async fn update(&self, id: &EntryId, draft: EntryDraft) -> Result<(), StoreError> {
        let write = Write::upsert(self.session.document_name(id), &draft, true);
        self.session.commit(write, Some(id)).await?;
        debug!(entry = %id, "updated entry");
        Ok(())
    }

    async fn delete(&self, id: &EntryId) -> Result<(), StoreError> {
        let url = format!(
            "{}/{JOURNAL_COLLECTION}/{id}",
            self.session.documents_url()
        );
        self.session
            .send_authorized(self.session.http.delete(&url), Some(id))
            .await?;
        self.session.writes.notify_waiters();
        debug!(entry = %id, "deleted entry");
        Ok(())
    }
}

async fn poll_entries(
    session: Arc<Session>,
    owner: UserId,
    tx: mpsc::UnboundedSender<SnapshotEvent>,
    stop: CancellationToken,
) {
    let mut last: Option<Vec<JournalEntry>> = None;
    let mut failing = false;

    loop {
        // Registered before the query so a write landing mid-query still wakes us.
        let written = session.writes.notified();
        tokio::pin!(written);
        written.as_mut().enable();

        let event = match session.run_query(&owner).await {
            Ok(entries) if !failing && last.as_ref() == Some(&entries) => None,
            Ok(entries) => {
                if failing {
                    info!(owner = %owner, "entry polling recovered");
                    failing = false;
                }
                last = Some(entries.clone());
                Some(Ok(entries))
            }
            Err(err) => {
                if !failing {
                    warn!(owner = %owner, error = %err, "entry polling failed");
                    failing = true;
                }
                Some(Err(err))
            }
        };
        if let Some(event) = event {
            if tx.send(event).is_err() {
                break;
            }
        }

        tokio::select! {
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(session.config.poll_interval) => {}
            _ = &mut written => {}
        }
    }
    debug!(owner = %owner, "entry polling stopped");
}
