use crate::entry_form::{EntryForm, SaveRequest};
use crate::errors::{StoreError, DELETE_FAILED, SAVE_FAILED, SYNC_FAILED};
use crate::filter::{filter_entries, TimeWindow};
use crate::journal_entry::{EntryId, JournalEntry, User};
use crate::text_input::TextInput;
use chrono::{DateTime, Local, Utc};
use tracing::{debug, warn};

/// Cards drawn while the first snapshot is still on its way.
pub const PLACEHOLDER_CARDS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    List,
    Grid,
}

impl ViewMode {
    pub fn toggled(self) -> ViewMode {
        match self {
            ViewMode::List => ViewMode::Grid,
            ViewMode::Grid => ViewMode::List,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::List => "List View",
            ViewMode::Grid => "Grid View",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    NoMatches,
    NoEntries,
}

impl EmptyState {
    pub fn headline(self) -> &'static str {
        match self {
            EmptyState::NoMatches => "No entries match your search.",
            EmptyState::NoEntries => "No entries yet.",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            EmptyState::NoMatches => "Try a different search term.",
            EmptyState::NoEntries => "Start writing!",
        }
    }
}

/// What the entries panel should show right now.
#[derive(Debug, PartialEq)]
pub enum Listing<'a> {
    Loading { placeholders: usize },
    Empty(EmptyState),
    Entries {
        mode: ViewMode,
        entries: Vec<&'a JournalEntry>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    View(EntryId),
    Edit(EntryId),
    Delete(EntryId),
    ConfirmDelete,
    CancelDelete,
    NewEntry,
    CloseDetail,
    ToggleViewMode,
    CycleWindow,
}

/// Remote work an intent asks the caller to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Delete(EntryId),
}

/// Everything the signed-in screen holds. Dropping it drops every entry and
/// every unsaved edit.
pub struct Workspace {
    user: User,
    entries: Vec<JournalEntry>,
    loaded: bool,
    sync_error: Option<String>,
    status: Option<String>,
    active: Option<EntryId>,
    detail_open: bool,
    pending_delete: Option<EntryId>,
    view_mode: ViewMode,
    window: TimeWindow,
    cursor: usize,
    pub search: TextInput,
    pub form: EntryForm,
}

impl Workspace {
    pub fn new(user: User, now: DateTime<Utc>) -> Self {
        Workspace {
            user,
            entries: Vec::new(),
            loaded: false,
            sync_error: None,
            status: None,
            active: None,
            detail_open: false,
            pending_delete: None,
            view_mode: ViewMode::default(),
            window: TimeWindow::default(),
            cursor: 0,
            search: TextInput::single_line(),
            form: EntryForm::new(now),
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn active_id(&self) -> Option<&EntryId> {
        self.active.as_ref()
    }

    pub fn pending_delete(&self) -> Option<&JournalEntry> {
        self.pending_delete.as_ref().and_then(|id| self.find(id))
    }

    /// The entry shown in the detail view, if one is open.
    pub fn detail(&self) -> Option<&JournalEntry> {
        if !self.detail_open {
            return None;
        }
        self.active.as_ref().and_then(|id| self.find(id))
    }

    /// Most recent problem worth telling the user about.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref().or(self.sync_error.as_deref())
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    pub fn find(&self, id: &EntryId) -> Option<&JournalEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    /// Replaces the held entries with a fresh snapshot. An entry that
    /// vanished is deselected and, if it was being edited, leaves edit mode.
    pub fn apply_snapshot(&mut self, entries: Vec<JournalEntry>, now: DateTime<Utc>) {
        debug!(count = entries.len(), "applying snapshot");
        self.entries = entries;
        self.loaded = true;
        self.sync_error = None;

        let active_gone = self
            .active
            .as_ref()
            .is_some_and(|id| !self.entries.iter().any(|e| &e.id == id));
        if active_gone {
            self.active = None;
            self.detail_open = false;
        }
        if self
            .pending_delete
            .as_ref()
            .is_some_and(|id| !self.entries.iter().any(|e| &e.id == id))
        {
            self.pending_delete = None;
        }
        if let Some(editing) = self.form.editing_id().cloned() {
            if self.find(&editing).is_none() {
                self.form.entry_removed(&editing, now);
            }
        }
    }

    /// A failed delivery keeps the last snapshot on screen.
    pub fn apply_sync_error(&mut self, err: &StoreError) {
        warn!(error = %err, "entry subscription failed");
        self.loaded = true;
        self.sync_error = Some(SYNC_FAILED.to_string());
    }

    pub fn visible<'a>(&'a self, now: &DateTime<Local>) -> Vec<&'a JournalEntry> {
        filter_entries(&self.entries, self.window, self.search.value(), now)
    }

    pub fn listing<'a>(&'a self, now: &DateTime<Local>) -> Listing<'a> {
        if !self.loaded {
            return Listing::Loading {
                placeholders: PLACEHOLDER_CARDS,
            };
        }
        let entries = self.visible(now);
        if entries.is_empty() {
            let state = if self.search.value().is_empty() {
                EmptyState::NoEntries
            } else {
                EmptyState::NoMatches
            };
            return Listing::Empty(state);
        }
        Listing::Entries {
            mode: self.view_mode,
            entries,
        }
    }

    /// Total held entries and how many pass the current filters.
    pub fn stats(&self, now: &DateTime<Local>) -> (usize, usize) {
        (self.entries.len(), self.visible(now).len())
    }

    pub fn cursor(&self, now: &DateTime<Local>) -> usize {
        let len = self.visible(now).len();
        self.cursor.min(len.saturating_sub(1))
    }

    pub fn move_cursor(&mut self, delta: isize, now: &DateTime<Local>) {
        let len = self.visible(now).len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let current = self.cursor.min(len - 1);
        self.cursor = current.saturating_add_signed(delta).min(len - 1);
    }

    pub fn entry_under_cursor(&self, now: &DateTime<Local>) -> Option<EntryId> {
        let visible = self.visible(now);
        visible
            .get(self.cursor.min(visible.len().saturating_sub(1)))
            .map(|e| e.id.clone())
    }

    pub fn dispatch(&mut self, intent: Intent, now: DateTime<Utc>) -> Option<Effect> {
        match intent {
            Intent::View(id) => {
                if self.find(&id).is_some() {
                    self.active = Some(id);
                    self.detail_open = true;
                }
            }
            Intent::Edit(id) => {
                if self.form.is_saving() {
                    return None;
                }
                if let Some(entry) = self.find(&id).cloned() {
                    self.form.begin_edit(&entry);
                    self.active = Some(id);
                    self.detail_open = false;
                }
            }
            Intent::Delete(id) => {
                if self.find(&id).is_some() {
                    self.pending_delete = Some(id);
                }
            }
            Intent::ConfirmDelete => {
                return self.pending_delete.take().map(Effect::Delete);
            }
            Intent::CancelDelete => self.pending_delete = None,
            Intent::NewEntry => {
                self.active = None;
                self.detail_open = false;
                self.form.cancel(now);
            }
            Intent::CloseDetail => self.detail_open = false,
            Intent::ToggleViewMode => self.view_mode = self.view_mode.toggled(),
            Intent::CycleWindow => {
                self.window = self.window.next();
                self.cursor = 0;
            }
        }
        None
    }

    pub fn delete_finished(
        &mut self,
        id: &EntryId,
        outcome: Result<(), StoreError>,
        now: DateTime<Utc>,
    ) {
        match outcome {
            Ok(()) => {
                if self.active.as_ref() == Some(id) {
                    self.active = None;
                    self.detail_open = false;
                }
                self.form.entry_removed(id, now);
            }
            Err(err) => {
                warn!(entry = %id, error = %err, "deleting entry failed");
                self.status = Some(DELETE_FAILED.to_string());
            }
        }
    }

    /// Applies a store answer to the form's in-flight save; the saved entry
    /// becomes the active one.
    pub fn save_finished(
        &mut self,
        request: SaveRequest,
        outcome: Result<EntryId, StoreError>,
        now: DateTime<Utc>,
    ) -> Option<JournalEntry> {
        match self.form.finish_submit(request, outcome, now) {
            Ok(entry) => {
                self.active = Some(entry.id.clone());
                self.status = None;
                Some(entry)
            }
            Err(_) => {
                self.status = Some(SAVE_FAILED.to_string());
                None
            }
        }
    }
}
