//! Terminal mood journal: private entries per signed-in user, kept in a
//! remote document store and mirrored live on screen.

pub mod app;
pub mod backend;
pub mod cli;
pub mod config;
pub mod entry_form;
pub mod errors;
pub mod filter;
pub mod journal_entry;
pub mod journal_state;
pub mod logging;
pub mod session;
pub mod text_input;
pub mod ui;

pub use app::{App, AppEvent, Focus};
pub use backend::{AuthClient, Credentials, EntryStore, Subscription, SubscriptionHandle};
pub use errors::{AppError, AppResult, AuthError, FormError, StoreError, SubmitError};
pub use journal_entry::{EntryDraft, EntryId, JournalEntry, Mood, User, UserId};
