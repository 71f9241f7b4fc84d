//! Error types for every layer of the journal.
//!
//! Collaborator failures (`AuthError`, `StoreError`) are always recoverable:
//! the UI reports a generic message and stays interactive. Only `AppError`
//! can end the process, and only during startup.

use crate::journal_entry::EntryId;
use std::io;
use thiserror::Error;

/// Shown to the user whenever a sign-in attempt fails, whatever the cause.
pub const SIGN_IN_FAILED: &str = "Failed to sign in. Please try again.";
pub const SAVE_FAILED: &str = "Failed to save journal entry. Please try again.";
pub const DELETE_FAILED: &str = "Failed to delete journal entry.";
pub const SYNC_FAILED: &str = "Could not refresh your journal. Showing the last known entries.";
pub const EMPTY_ENTRY: &str = "Journal entry cannot be empty!";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing setting {0}. Pass it on the command line, set the environment variable, or run with --offline")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Sign-in rejected: {0}")]
    Rejected(String),

    #[error("No user is signed in")]
    NotSignedIn,

    #[error("Session could not be refreshed: {0}")]
    RefreshFailed(String),

    #[error("Authentication service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No user is signed in")]
    NotSignedIn,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Entry {0} does not exist")]
    NotFound(EntryId),

    #[error("Store rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed document: {0}")]
    Decode(String),

    #[error("Session error: {0}")]
    Auth(#[from] AuthError),

    #[error("Store unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Journal entry cannot be empty!")]
    EmptyText,

    #[error("A save is already in progress")]
    SaveInProgress,
}

/// Outcome of a full submit: either the form refused, or the store did.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] FormError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type AppResult<T> = Result<T, AppError>;
