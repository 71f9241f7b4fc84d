//! `EntryForm::submit` against a store that records every call it receives.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::stream::{self, StreamExt};
use mood_journal::entry_form::{EntryForm, FormState};
use mood_journal::{
    EntryDraft, EntryId, EntryStore, FormError, JournalEntry, Mood, StoreError, SubmitError,
    Subscription, SubscriptionHandle, UserId,
};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Create(EntryDraft),
    Update(EntryId, EntryDraft),
}

#[derive(Default)]
struct RecordingStore {
    calls: Mutex<Vec<Call>>,
    fail: bool,
}

impl RecordingStore {
    fn failing() -> Self {
        RecordingStore {
            fail: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn outcome(&self) -> Result<(), StoreError> {
        if self.fail {
            Err(StoreError::Rejected {
                status: 500,
                message: "boom".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EntryStore for RecordingStore {
    fn subscribe(&self, _owner: &UserId) -> Subscription {
        Subscription {
            events: stream::empty().boxed(),
            handle: SubscriptionHandle::new(CancellationToken::new()),
        }
    }

    async fn create(&self, draft: EntryDraft) -> Result<EntryId, StoreError> {
        self.calls.lock().expect("calls lock").push(Call::Create(draft));
        self.outcome().map(|()| EntryId::new("created-1"))
    }

    async fn update(&self, id: &EntryId, draft: EntryDraft) -> Result<(), StoreError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(Call::Update(id.clone(), draft));
        self.outcome()
    }

    async fn delete(&self, _id: &EntryId) -> Result<(), StoreError> {
        self.outcome()
    }
}

fn owner() -> UserId {
    UserId::new("u1")
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
}

fn type_into(form: &mut EntryForm, text: &str) {
    for c in text.chars() {
        form.text.insert(c);
    }
}

#[tokio::test]
async fn test_blank_text_makes_no_store_call() {
    let store = RecordingStore::default();
    let mut form = EntryForm::new(now());
    type_into(&mut form, " \n\t ");

    let err = form.submit(&store, &owner(), now()).await.unwrap_err();
    assert!(matches!(err, SubmitError::Invalid(FormError::EmptyText)));
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_create_sends_exactly_one_create() {
    let store = RecordingStore::default();
    let mut form = EntryForm::new(now());
    form.title.set_value("  Sunday  ");
    type_into(&mut form, "Long walk by the river");
    form.tags.set_value("outdoors, ,calm ");
    form.set_mood(Mood::Happy);

    let entry = form.submit(&store, &owner(), now()).await.expect("submit");

    assert_eq!(entry.id, EntryId::new("created-1"));
    assert_eq!(entry.title.as_deref(), Some("Sunday"));
    match store.calls().as_slice() {
        [Call::Create(draft)] => {
            assert_eq!(draft.owner_id, owner());
            assert_eq!(draft.tags, vec!["outdoors", "calm"]);
            assert_eq!(draft.mood, Mood::Happy);
            assert_eq!(draft.date, now());
        }
        other => panic!("unexpected calls {other:?}"),
    }
    assert_eq!(form.state(), &FormState::Create);
    assert_eq!(form.text.value(), "");
}

#[tokio::test]
async fn test_edit_sends_exactly_one_update() {
    let store = RecordingStore::default();
    let existing = JournalEntry {
        id: EntryId::new("e7"),
        owner_id: owner(),
        title: None,
        text: "Rainy".to_string(),
        date: Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap(),
        mood: Mood::Sad,
        tags: vec![],
        created_at: None,
    };
    let mut form = EntryForm::new(now());
    form.begin_edit(&existing);
    type_into(&mut form, " but cosy");

    let entry = form.submit(&store, &owner(), now()).await.expect("submit");

    assert_eq!(entry.id, existing.id);
    assert_eq!(entry.text, "Rainy but cosy");
    match store.calls().as_slice() {
        [Call::Update(id, draft)] => {
            assert_eq!(id, &existing.id);
            assert_eq!(draft.date, existing.date);
            assert_eq!(draft.mood, Mood::Sad);
        }
        other => panic!("unexpected calls {other:?}"),
    }
}

#[tokio::test]
async fn test_store_failure_keeps_every_field() {
    let store = RecordingStore::failing();
    let mut form = EntryForm::new(now());
    form.title.set_value("Draft");
    type_into(&mut form, "Do not lose this");
    form.set_mood(Mood::Excited);

    let err = form.submit(&store, &owner(), now()).await.unwrap_err();

    assert!(matches!(err, SubmitError::Store(StoreError::Rejected { .. })));
    assert_eq!(store.calls().len(), 1);
    assert_eq!(form.state(), &FormState::Create);
    assert_eq!(form.title.value(), "Draft");
    assert_eq!(form.text.value(), "Do not lose this");
    assert_eq!(form.mood(), Mood::Excited);
    assert_eq!(
        form.message(),
        Some("Failed to save journal entry. Please try again.")
    );
}
