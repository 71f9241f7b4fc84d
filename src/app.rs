//! Event loop tying the screens to the collaborators.
//!
//! Every source of work (key presses, auth notifications, snapshot
//! deliveries, finished remote calls) is funnelled into one channel of
//! [`AppEvent`]s and handled in order on a single task. Remote calls are
//! spawned and report back through the same channel, so the screen keeps
//! redrawing while they are outstanding.

use crate::backend::{AuthClient, EntryStore, SnapshotEvent, Subscription, SubscriptionHandle};
use crate::entry_form::{self, FormField, SaveRequest};
use crate::errors::{AuthError, StoreError};
use crate::journal_entry::{EntryId, User};
use crate::journal_state::{Effect, Intent, Workspace};
use crate::session::{GateChange, Screen, SessionGate, SignInForm};
use crate::text_input::TextInput;
use crate::ui::Tui;
use chrono::{Local, Utc};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const TICK: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Redraw,
    Auth(Option<User>),
    Snapshot {
        generation: u64,
        event: SnapshotEvent,
    },
    SignInFinished(Result<User, AuthError>),
    SaveFinished {
        generation: u64,
        request: SaveRequest,
        outcome: Result<EntryId, StoreError>,
    },
    DeleteFinished {
        generation: u64,
        id: EntryId,
        outcome: Result<(), StoreError>,
    },
}

/// Which part of the workspace receives key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Entries,
    Search,
    Form,
}

pub struct App {
    auth: Arc<dyn AuthClient>,
    store: Arc<dyn EntryStore>,
    gate: SessionGate,
    sign_in: SignInForm,
    workspace: Option<Workspace>,
    subscription: Option<SubscriptionHandle>,
    /// Bumped per workspace so late events from an ended session are dropped.
    generation: u64,
    focus: Focus,
    tx: mpsc::UnboundedSender<AppEvent>,
    should_quit: bool,
}

impl App {
    pub fn new(
        auth: Arc<dyn AuthClient>,
        store: Arc<dyn EntryStore>,
    ) -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App {
            auth,
            store,
            gate: SessionGate::new(),
            sign_in: SignInForm::default(),
            workspace: None,
            subscription: None,
            generation: 0,
            focus: Focus::default(),
            tx,
            should_quit: false,
        };
        (app, rx)
    }

    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    pub fn sign_in_form(&self) -> &SignInForm {
        &self.sign_in
    }

    pub fn workspace(&self) -> Option<&Workspace> {
        self.workspace.as_ref()
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Subscribes to auth changes and applies the state found at mount.
    pub fn start(&mut self) {
        let mut auth_rx = self.auth.watch();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            while auth_rx.changed().await.is_ok() {
                let user = auth_rx.borrow_and_update().clone();
                if tx.send(AppEvent::Auth(user)).is_err() {
                    break;
                }
            }
        });

        let change = self.gate.mount(self.auth.current_user());
        self.apply_gate_change(change);
    }

    pub async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<AppEvent>,
        tui: &mut Tui,
    ) -> io::Result<()> {
        self.start();
        spawn_terminal_events(self.tx.clone());

        tui.draw(&self)?;
        while let Some(event) = rx.recv().await {
            self.handle(event);
            if self.should_quit {
                break;
            }
            tui.draw(&self)?;
        }

        self.end_session();
        info!("journal closed");
        Ok(())
    }

    pub fn handle(&mut self, event: AppEvent) {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Redraw => {}
            AppEvent::Auth(user) => {
                let change = self.gate.auth_changed(user);
                self.apply_gate_change(change);
            }
            AppEvent::Snapshot { generation, event } => {
                if generation != self.generation {
                    return;
                }
                if let Some(ws) = self.workspace.as_mut() {
                    match event {
                        Ok(entries) => ws.apply_snapshot(entries, Utc::now()),
                        Err(err) => ws.apply_sync_error(&err),
                    }
                }
            }
            AppEvent::SignInFinished(outcome) => {
                self.sign_in.finish(&outcome);
                if let Ok(user) = outcome {
                    let change = self.gate.auth_changed(Some(user));
                    self.apply_gate_change(change);
                }
            }
            AppEvent::SaveFinished {
                generation,
                request,
                outcome,
            } => {
                if generation != self.generation {
                    return;
                }
                if let Some(ws) = self.workspace.as_mut() {
                    if let Some(entry) = ws.save_finished(request, outcome, Utc::now()) {
                        debug!(entry = %entry.id, "entry saved");
                    }
                }
            }
            AppEvent::DeleteFinished {
                generation,
                id,
                outcome,
            } => {
                if generation != self.generation {
                    return;
                }
                if let Some(ws) = self.workspace.as_mut() {
                    ws.delete_finished(&id, outcome, Utc::now());
                }
            }
        }
    }

    fn apply_gate_change(&mut self, change: GateChange) {
        match change {
            GateChange::Unchanged => {}
            GateChange::Entered(user) => {
                self.end_session();
                self.begin_session(user);
            }
            GateChange::Left => {
                self.end_session();
                self.sign_in = SignInForm::default();
            }
        }
    }

    fn begin_session(&mut self, user: User) {
        self.generation += 1;
        let generation = self.generation;
        let Subscription { mut events, handle } = self.store.subscribe(&user.id);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if tx.send(AppEvent::Snapshot { generation, event }).is_err() {
                    break;
                }
            }
        });
        self.subscription = Some(handle);
        self.workspace = Some(Workspace::new(user, Utc::now()));
        self.focus = Focus::Entries;
    }

    /// Tears the subscription down and forgets every entry and draft.
    fn end_session(&mut self) {
        if let Some(handle) = self.subscription.take() {
            handle.cancel();
        }
        self.workspace = None;
        self.generation += 1;
    }

    fn sign_out(&mut self) {
        let change = self.gate.sign_out();
        self.apply_gate_change(change);
        let auth = Arc::clone(&self.auth);
        tokio::spawn(async move {
            if let Err(err) = auth.sign_out().await {
                warn!(error = %err, "sign-out failed");
            }
        });
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match self.gate.screen() {
            Screen::Landing => self.landing_key(key),
            Screen::SignedOut => self.sign_in_key(key),
            Screen::SignedIn(_) => self.workspace_key(key),
        }
    }

    fn landing_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.gate.proceed(),
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    fn sign_in_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.gate.back_to_landing(),
            KeyCode::Tab | KeyCode::BackTab => self.sign_in.toggle_focus(),
            KeyCode::Enter => {
                if let Some(credentials) = self.sign_in.begin() {
                    let auth = Arc::clone(&self.auth);
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        let outcome = auth.sign_in(credentials).await;
                        let _ = tx.send(AppEvent::SignInFinished(outcome));
                    });
                }
            }
            _ => {
                if let Some(input) = self.sign_in.focused_input() {
                    edit_text(input, key);
                }
            }
        }
    }

    fn workspace_key(&mut self, key: KeyEvent) {
        let now = Utc::now();
        let local_now = Local::now();
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let Some(ws) = self.workspace.as_mut() else {
            return;
        };

        if ws.pending_delete().is_some() {
            let intent = match key.code {
                KeyCode::Char('y') | KeyCode::Enter => Intent::ConfirmDelete,
                KeyCode::Char('n') | KeyCode::Esc => Intent::CancelDelete,
                _ => return,
            };
            self.dispatch(intent);
            return;
        }

        if let Some(detail) = ws.detail() {
            let id = detail.id.clone();
            let intent = match key.code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => Intent::CloseDetail,
                KeyCode::Char('e') => {
                    self.focus = Focus::Form;
                    Intent::Edit(id)
                }
                KeyCode::Char('d') => Intent::Delete(id),
                _ => return,
            };
            self.dispatch(intent);
            return;
        }

        if ctrl {
            match key.code {
                KeyCode::Char('s') => self.save(),
                KeyCode::Char('o') => self.sign_out(),
                KeyCode::Char('n') => {
                    self.focus = Focus::Form;
                    self.dispatch(Intent::NewEntry);
                }
                _ => {}
            }
            return;
        }

        match self.focus {
            Focus::Entries => match key.code {
                KeyCode::Up | KeyCode::Char('k') => ws.move_cursor(-1, &local_now),
                KeyCode::Down | KeyCode::Char('j') => ws.move_cursor(1, &local_now),
                KeyCode::Enter => {
                    if let Some(id) = ws.entry_under_cursor(&local_now) {
                        self.dispatch(Intent::View(id));
                    }
                }
                KeyCode::Char('e') => {
                    if let Some(id) = ws.entry_under_cursor(&local_now) {
                        self.focus = Focus::Form;
                        self.dispatch(Intent::Edit(id));
                    }
                }
                KeyCode::Char('d') => {
                    if let Some(id) = ws.entry_under_cursor(&local_now) {
                        self.dispatch(Intent::Delete(id));
                    }
                }
                KeyCode::Char('n') => {
                    self.focus = Focus::Form;
                    self.dispatch(Intent::NewEntry);
                }
                KeyCode::Char('v') => {
                    self.dispatch(Intent::ToggleViewMode);
                }
                KeyCode::Char('f') => {
                    self.dispatch(Intent::CycleWindow);
                }
                KeyCode::Char('/') => self.focus = Focus::Search,
                KeyCode::Char('o') => self.sign_out(),
                KeyCode::Tab => self.focus = Focus::Form,
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Esc => ws.clear_status(),
                _ => {}
            },
            Focus::Search => match key.code {
                KeyCode::Enter | KeyCode::Esc | KeyCode::Tab => self.focus = Focus::Entries,
                _ => {
                    edit_text(&mut ws.search, key);
                    ws.move_cursor(isize::MIN, &local_now);
                }
            },
            Focus::Form => {
                let form = &mut ws.form;
                match (key.code, form.focus()) {
                    (KeyCode::Tab, _) => form.focus_next(),
                    (KeyCode::BackTab, _) => form.focus_previous(),
                    (KeyCode::Esc, _) => {
                        if form.editing_id().is_some() {
                            form.cancel(now);
                        }
                        self.focus = Focus::Entries;
                    }
                    (KeyCode::Left, FormField::Date) => form.shift_date_days(-1),
                    (KeyCode::Right, FormField::Date) => form.shift_date_days(1),
                    (KeyCode::Left, FormField::Mood) => form.set_mood(form.mood().previous()),
                    (KeyCode::Right, FormField::Mood) => form.set_mood(form.mood().next()),
                    (KeyCode::Enter, FormField::Text) => {
                        if let Some(input) = form.focused_input() {
                            input.newline();
                        }
                    }
                    (KeyCode::Enter, _) => form.focus_next(),
                    _ => {
                        if let Some(input) = form.focused_input() {
                            edit_text(input, key);
                        }
                    }
                }
            }
        }
    }

    fn dispatch(&mut self, intent: Intent) {
        let Some(ws) = self.workspace.as_mut() else {
            return;
        };
        if let Some(Effect::Delete(id)) = ws.dispatch(intent, Utc::now()) {
            let store = Arc::clone(&self.store);
            let tx = self.tx.clone();
            let generation = self.generation;
            tokio::spawn(async move {
                let outcome = store.delete(&id).await;
                let _ = tx.send(AppEvent::DeleteFinished {
                    generation,
                    id,
                    outcome,
                });
            });
        }
    }

    fn save(&mut self) {
        let Some(ws) = self.workspace.as_mut() else {
            return;
        };
        let owner = ws.user().id.clone();
        let Ok(request) = ws.form.begin_submit(&owner) else {
            return;
        };
        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let outcome = entry_form::send(store.as_ref(), &request).await;
            let _ = tx.send(AppEvent::SaveFinished {
                generation,
                request,
                outcome,
            });
        });
    }
}

fn edit_text(input: &mut TextInput, key: KeyEvent) {
    match key.code {
        KeyCode::Char(c) => input.insert(c),
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(),
        KeyCode::Up => input.move_up(),
        KeyCode::Down => input.move_down(),
        KeyCode::Home => input.move_home(),
        KeyCode::End => input.move_end(),
        _ => {}
    }
}

fn spawn_terminal_events(tx: mpsc::UnboundedSender<AppEvent>) {
    let input_tx = tx.clone();
    tokio::spawn(async move {
        let mut events = EventStream::new();
        while let Some(Ok(event)) = events.next().await {
            let forwarded = match event {
                Event::Key(key) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
                Event::Resize(_, _) => AppEvent::Redraw,
                _ => continue,
            };
            if input_tx.send(forwarded).is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK);
        loop {
            interval.tick().await;
            if tx.send(AppEvent::Redraw).is_err() {
                break;
            }
        }
    });
}
