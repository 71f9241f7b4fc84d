//! Create/edit form for a single entry.
//!
//! The form is a small state machine: `Create` and `Editing(id)` accept
//! input, `Saving` accepts nothing until the store answers. A save is split
//! into [`EntryForm::begin_submit`] (validate, build the request, enter
//! `Saving`) and [`EntryForm::finish_submit`] (apply the store's answer), so
//! an event loop can keep drawing while the call is in flight.
//! [`EntryForm::submit`] runs both halves around one awaited store call.

use crate::backend::EntryStore;
use crate::errors::{FormError, StoreError, SubmitError, EMPTY_ENTRY, SAVE_FAILED};
use crate::journal_entry::{normalize_title, parse_tags, EntryDraft, EntryId, JournalEntry, Mood, UserId};
use crate::text_input::TextInput;
use chrono::{DateTime, Local, TimeDelta, Utc};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormState {
    Create,
    Editing(EntryId),
    Saving(SaveTarget),
}

/// What an in-flight save will do once the store answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveTarget {
    Create,
    Update(EntryId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    Title,
    Date,
    Mood,
    #[default]
    Text,
    Tags,
}

impl FormField {
    pub fn next(self) -> FormField {
        match self {
            FormField::Title => FormField::Date,
            FormField::Date => FormField::Mood,
            FormField::Mood => FormField::Text,
            FormField::Text => FormField::Tags,
            FormField::Tags => FormField::Title,
        }
    }

    pub fn previous(self) -> FormField {
        match self {
            FormField::Title => FormField::Tags,
            FormField::Date => FormField::Title,
            FormField::Mood => FormField::Date,
            FormField::Text => FormField::Mood,
            FormField::Tags => FormField::Text,
        }
    }
}

/// A validated request ready for the store.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub target: SaveTarget,
    pub draft: EntryDraft,
}

#[derive(Debug, Clone)]
pub struct EntryForm {
    state: FormState,
    pub title: TextInput,
    pub text: TextInput,
    pub tags: TextInput,
    date: DateTime<Utc>,
    mood: Mood,
    focus: FormField,
    message: Option<String>,
    /// Set when the entry behind an in-flight update disappears.
    target_removed: bool,
}

impl EntryForm {
    pub fn new(now: DateTime<Utc>) -> Self {
        EntryForm {
            state: FormState::Create,
            title: TextInput::single_line(),
            text: TextInput::multi_line(),
            tags: TextInput::single_line(),
            date: now,
            mood: Mood::default(),
            focus: FormField::default(),
            message: None,
            target_removed: false,
        }
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn is_saving(&self) -> bool {
        matches!(self.state, FormState::Saving(_))
    }

    pub fn editing_id(&self) -> Option<&EntryId> {
        match &self.state {
            FormState::Editing(id) | FormState::Saving(SaveTarget::Update(id)) => Some(id),
            _ => None,
        }
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn mood(&self) -> Mood {
        self.mood
    }

    pub fn focus(&self) -> FormField {
        self.focus
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn char_count(&self) -> usize {
        self.text.char_count()
    }

    /// Whether the save control is enabled.
    pub fn can_submit(&self) -> bool {
        !self.is_saving() && !self.text.value().trim().is_empty()
    }

    pub fn submit_label(&self) -> &'static str {
        match self.state {
            FormState::Saving(_) => "Saving...",
            FormState::Editing(_) => "Update Entry",
            FormState::Create => "Save Entry",
        }
    }

    pub fn heading(&self) -> &'static str {
        if self.editing_id().is_some() {
            "Edit Entry"
        } else {
            "New Journal Entry"
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_previous(&mut self) {
        self.focus = self.focus.previous();
    }

    /// The text input under focus, if the focused field is free text.
    pub fn focused_input(&mut self) -> Option<&mut TextInput> {
        if self.is_saving() {
            return None;
        }
        match self.focus {
            FormField::Title => Some(&mut self.title),
            FormField::Text => Some(&mut self.text),
            FormField::Tags => Some(&mut self.tags),
            FormField::Date | FormField::Mood => None,
        }
    }

    pub fn set_mood(&mut self, mood: Mood) {
        if !self.is_saving() {
            self.mood = mood;
        }
    }

    pub fn set_date(&mut self, date: DateTime<Utc>) {
        if !self.is_saving() {
            self.date = date;
        }
    }

    pub fn shift_date_days(&mut self, days: i64) {
        self.set_date(self.date + TimeDelta::days(days));
    }

    /// Loads `entry` for editing, replacing whatever was in the form.
    pub fn begin_edit(&mut self, entry: &JournalEntry) {
        if self.is_saving() {
            return;
        }
        self.title.set_value(entry.title.clone().unwrap_or_default());
        self.text.set_value(entry.text.clone());
        self.tags.set_value(entry.tags.join(", "));
        self.date = entry.date;
        self.mood = entry.mood;
        self.focus = FormField::Text;
        self.message = None;
        self.state = FormState::Editing(entry.id.clone());
        debug!(entry = %entry.id, "editing entry");
    }

    /// Drops every field edit and returns to an empty create form.
    pub fn cancel(&mut self, now: DateTime<Utc>) {
        if self.is_saving() {
            return;
        }
        self.reset(now);
    }

    /// Leaves edit mode when `id` no longer exists. An update already in
    /// flight keeps its fields; if it fails the form falls back to create.
    pub fn entry_removed(&mut self, id: &EntryId, now: DateTime<Utc>) {
        match &self.state {
            FormState::Editing(editing) if editing == id => {
                debug!(entry = %id, "edited entry removed");
                self.reset(now);
            }
            FormState::Saving(SaveTarget::Update(saving)) if saving == id => {
                self.target_removed = true;
            }
            _ => {}
        }
    }

    fn reset(&mut self, now: DateTime<Utc>) {
        self.target_removed = false;
        self.title.clear();
        self.text.clear();
        self.tags.clear();
        self.date = now;
        self.mood = Mood::default();
        self.focus = FormField::default();
        self.message = None;
        self.state = FormState::Create;
    }

    pub fn begin_submit(&mut self, owner: &UserId) -> Result<SaveRequest, FormError> {
        let target = match &self.state {
            FormState::Saving(_) => return Err(FormError::SaveInProgress),
            FormState::Create => SaveTarget::Create,
            FormState::Editing(id) => SaveTarget::Update(id.clone()),
        };

        let text = self.text.value().trim();
        if text.is_empty() {
            self.message = Some(EMPTY_ENTRY.to_string());
            return Err(FormError::EmptyText);
        }

        let draft = EntryDraft {
            owner_id: owner.clone(),
            title: normalize_title(self.title.value()),
            text: text.to_string(),
            date: self.date,
            mood: self.mood,
            tags: parse_tags(self.tags.value()),
        };
        self.message = None;
        self.state = FormState::Saving(target.clone());
        Ok(SaveRequest { target, draft })
    }

    /// Applies the store's answer to the save started by `begin_submit`.
    ///
    /// On success the form resets and the finalized entry is returned. On
    /// failure the form goes back to where it was before the save, with
    /// every field kept so the user can retry.
    pub fn finish_submit(
        &mut self,
        request: SaveRequest,
        outcome: Result<EntryId, StoreError>,
        now: DateTime<Utc>,
    ) -> Result<JournalEntry, StoreError> {
        match outcome {
            Ok(id) => {
                self.reset(now);
                Ok(request.draft.into_entry(id, None))
            }
            Err(err) => {
                warn!(error = %err, "saving entry failed");
                self.state = match request.target {
                    SaveTarget::Update(id) if !self.target_removed => FormState::Editing(id),
                    _ => FormState::Create,
                };
                self.target_removed = false;
                self.message = Some(SAVE_FAILED.to_string());
                Err(err)
            }
        }
    }

    /// Validates, sends one create or update to `store`, and applies the result.
    pub async fn submit(
        &mut self,
        store: &dyn EntryStore,
        owner: &UserId,
        now: DateTime<Utc>,
    ) -> Result<JournalEntry, SubmitError> {
        let request = self.begin_submit(owner)?;
        let outcome = send(store, &request).await;
        Ok(self.finish_submit(request, outcome, now)?)
    }
}

/// Performs the store call for `request`, returning the entry's id.
pub async fn send(store: &dyn EntryStore, request: &SaveRequest) -> Result<EntryId, StoreError> {
    match &request.target {
        SaveTarget::Create => store.create(request.draft.clone()).await,
        SaveTarget::Update(id) => store
            .update(id, request.draft.clone())
            .await
            .map(|()| id.clone()),
    }
}

/// Long-form date used in the form and on cards, e.g. "May 10, 2024".
pub fn format_day(date: DateTime<Utc>) -> String {
    date.with_timezone(&Local).format("%B %-d, %Y").to_string()
}
