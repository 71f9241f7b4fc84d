//! End-to-end flows through the event loop against the in-memory backend.
//!
//! Each test drives the app with key presses, then drains the event channel
//! so spawned store calls and snapshot deliveries are applied.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use mood_journal::backend::memory::MemoryBackend;
use mood_journal::errors::{EMPTY_ENTRY, SAVE_FAILED, SYNC_FAILED};
use mood_journal::session::Screen;
use mood_journal::{App, AppEvent, AuthClient, Credentials, Focus, User};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

struct Harness {
    backend: MemoryBackend,
    app: App,
    rx: UnboundedReceiver<AppEvent>,
}

impl Harness {
    fn new(backend: MemoryBackend) -> Self {
        let (mut app, rx) = App::new(Arc::new(backend.auth()), Arc::new(backend.store()));
        app.start();
        Harness { backend, app, rx }
    }

    /// Applies every event that arrives before the channel goes quiet.
    async fn settle(&mut self) {
        while let Ok(Some(event)) = timeout(Duration::from_millis(100), self.rx.recv()).await {
            self.app.handle(event);
        }
    }

    fn press(&mut self, code: KeyCode) {
        self.app
            .handle(AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn ctrl(&mut self, c: char) {
        self.app.handle(AppEvent::Key(KeyEvent::new(
            KeyCode::Char(c),
            KeyModifiers::CONTROL,
        )));
    }

    fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            self.press(KeyCode::Char(c));
        }
    }

    fn user(&self) -> User {
        self.app.gate().user().cloned().expect("signed in")
    }
}

fn backend_with_account() -> MemoryBackend {
    let backend = MemoryBackend::new();
    backend.register("ana@example.com", "secret", Some("Ana"));
    backend
}

async fn signed_in() -> Harness {
    let mut h = Harness::new(backend_with_account());
    h.press(KeyCode::Enter);
    h.type_text("ana@example.com");
    h.press(KeyCode::Tab);
    h.type_text("secret");
    h.press(KeyCode::Enter);
    h.settle().await;
    h
}

async fn with_entry(text: &str) -> Harness {
    let mut h = signed_in().await;
    h.press(KeyCode::Tab);
    h.type_text(text);
    h.ctrl('s');
    h.settle().await;
    h
}

#[tokio::test]
async fn test_landing_then_sign_in_opens_workspace() {
    let mut h = Harness::new(backend_with_account());
    assert_eq!(h.app.gate().screen(), &Screen::Landing);

    h.press(KeyCode::Enter);
    assert_eq!(h.app.gate().screen(), &Screen::SignedOut);

    h.type_text("ana@example.com");
    h.press(KeyCode::Tab);
    h.type_text("secret");
    h.press(KeyCode::Enter);
    assert!(h.app.sign_in_form().is_pending());
    h.settle().await;

    let user = h.user();
    assert_eq!(user.greeting_name(), "Ana");
    let ws = h.app.workspace().expect("workspace");
    assert!(ws.is_loaded(), "first snapshot should have arrived");
    assert!(ws.entries().is_empty());
    assert_eq!(h.backend.live_subscribers(), 1);
}

#[tokio::test]
async fn test_wrong_password_stays_on_sign_in() {
    let mut h = Harness::new(backend_with_account());
    h.press(KeyCode::Enter);
    h.type_text("ana@example.com");
    h.press(KeyCode::Tab);
    h.type_text("wrong");
    h.press(KeyCode::Enter);
    h.settle().await;

    assert_eq!(h.app.gate().screen(), &Screen::SignedOut);
    assert_eq!(
        h.app.sign_in_form().error(),
        Some("Failed to sign in. Please try again.")
    );
    assert!(h.app.workspace().is_none());
}

#[tokio::test]
async fn test_existing_session_skips_landing() {
    let backend = backend_with_account();
    backend
        .auth()
        .sign_in(Credentials {
            email: "ana@example.com".to_string(),
            password: "secret".to_string(),
        })
        .await
        .expect("sign in");

    let mut h = Harness::new(backend);
    assert!(matches!(h.app.gate().screen(), Screen::SignedIn(_)));
    h.settle().await;
    assert!(h.app.workspace().expect("workspace").is_loaded());
}

#[tokio::test]
async fn test_saving_from_form_creates_entry() {
    let h = with_entry("Great day").await;
    let user = h.user();

    let stored = h.backend.entries_of(&user.id);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].text, "Great day");
    assert!(stored[0].created_at.is_some());

    let ws = h.app.workspace().expect("workspace");
    assert_eq!(ws.entries().len(), 1);
    assert_eq!(ws.active_id(), Some(&stored[0].id));
    assert_eq!(ws.form.text.value(), "", "form resets after a save");
}

#[tokio::test]
async fn test_whitespace_entry_never_reaches_store() {
    let mut h = signed_in().await;
    h.press(KeyCode::Tab);
    h.type_text("   ");
    h.ctrl('s');
    h.settle().await;

    let user = h.user();
    assert!(h.backend.entries_of(&user.id).is_empty());
    let ws = h.app.workspace().expect("workspace");
    assert_eq!(ws.form.message(), Some(EMPTY_ENTRY));
}

#[tokio::test]
async fn test_failed_save_keeps_draft() {
    let mut h = signed_in().await;
    h.backend.fail_writes(true);
    h.press(KeyCode::Tab);
    h.type_text("Keep me");
    h.ctrl('s');
    h.settle().await;

    let ws = h.app.workspace().expect("workspace");
    assert_eq!(ws.form.text.value(), "Keep me");
    assert!(!ws.form.is_saving());
    assert_eq!(ws.form.message(), Some(SAVE_FAILED));
    assert_eq!(ws.status(), Some(SAVE_FAILED));
}

#[tokio::test]
async fn test_editing_updates_in_place() {
    let mut h = with_entry("Great day").await;
    h.press(KeyCode::Esc);
    assert_eq!(h.app.focus(), Focus::Entries);

    h.press(KeyCode::Char('e'));
    assert_eq!(h.app.focus(), Focus::Form);
    let ws = h.app.workspace().expect("workspace");
    assert_eq!(ws.form.submit_label(), "Update Entry");

    h.type_text(" again");
    h.ctrl('s');
    h.settle().await;

    let stored = h.backend.entries_of(&h.user().id);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].text, "Great day again");
    let ws = h.app.workspace().expect("workspace");
    assert_eq!(ws.form.submit_label(), "Save Entry");
}

#[tokio::test]
async fn test_delete_requires_confirmation() {
    let mut h = with_entry("Short-lived").await;
    h.press(KeyCode::Esc);

    h.press(KeyCode::Char('d'));
    h.press(KeyCode::Char('n'));
    h.settle().await;
    assert_eq!(h.backend.entries_of(&h.user().id).len(), 1);

    h.press(KeyCode::Char('d'));
    h.press(KeyCode::Char('y'));
    h.settle().await;

    assert!(h.backend.entries_of(&h.user().id).is_empty());
    let ws = h.app.workspace().expect("workspace");
    assert!(ws.entries().is_empty());
    assert_eq!(ws.active_id(), None);
}

#[tokio::test]
async fn test_sync_error_keeps_entries_visible() {
    let mut h = with_entry("Still here").await;
    h.backend.push_sync_error(&h.user().id);
    h.settle().await;

    let ws = h.app.workspace().expect("workspace");
    assert_eq!(ws.entries().len(), 1);
    assert_eq!(ws.status(), Some(SYNC_FAILED));
}

#[tokio::test]
async fn test_sign_out_drops_workspace_and_subscription() {
    let mut h = with_entry("Private").await;
    assert_eq!(h.backend.live_subscribers(), 1);

    h.ctrl('o');
    assert_eq!(h.app.gate().screen(), &Screen::Landing);
    assert!(h.app.workspace().is_none());
    assert_eq!(h.backend.live_subscribers(), 0);

    h.settle().await;
    assert!(h.backend.auth().current_user().is_none());
    assert_eq!(h.app.gate().screen(), &Screen::Landing);
}

#[tokio::test]
async fn test_remote_sign_out_returns_to_landing() {
    let mut h = signed_in().await;
    h.backend.auth().sign_out().await.expect("sign out");
    h.settle().await;

    assert_eq!(h.app.gate().screen(), &Screen::Landing);
    assert!(h.app.workspace().is_none());
    assert_eq!(h.backend.live_subscribers(), 0);
}

#[tokio::test]
async fn test_quit_from_landing() {
    let mut h = Harness::new(MemoryBackend::new());
    h.press(KeyCode::Char('q'));
    assert!(h.app.should_quit());
}
