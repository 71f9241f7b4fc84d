//! Which screen the user sees, derived from the auth collaborator.
//!
//! `Landing` → (`proceed`) → `SignedOut` → (sign-in) → `SignedIn(user)` →
//! (sign-out) → `Landing`. A session already signed in at mount skips
//! straight to `SignedIn`. Nothing here is persisted.

use crate::backend::Credentials;
use crate::errors::{AuthError, SIGN_IN_FAILED};
use crate::journal_entry::User;
use crate::text_input::TextInput;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Landing,
    SignedOut,
    SignedIn(User),
}

/// How a gate transition affects the signed-in workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateChange {
    Unchanged,
    Entered(User),
    Left,
}

#[derive(Debug)]
pub struct SessionGate {
    screen: Screen,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGate {
    pub fn new() -> Self {
        SessionGate {
            screen: Screen::Landing,
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn user(&self) -> Option<&User> {
        match &self.screen {
            Screen::SignedIn(user) => Some(user),
            _ => None,
        }
    }

    /// Applies the collaborator's state as seen when the app starts.
    pub fn mount(&mut self, current: Option<User>) -> GateChange {
        match current {
            Some(user) => self.auth_changed(Some(user)),
            None => GateChange::Unchanged,
        }
    }

    /// Landing's "get started": moves to the sign-in screen.
    pub fn proceed(&mut self) {
        if self.screen == Screen::Landing {
            self.screen = Screen::SignedOut;
        }
    }

    /// Leaves the sign-in screen without signing in.
    pub fn back_to_landing(&mut self) {
        if self.screen == Screen::SignedOut {
            self.screen = Screen::Landing;
        }
    }

    pub fn auth_changed(&mut self, user: Option<User>) -> GateChange {
        match user {
            Some(user) if self.user() == Some(&user) => GateChange::Unchanged,
            Some(user) => {
                info!(user = %user.id, "session started");
                self.screen = Screen::SignedIn(user.clone());
                GateChange::Entered(user)
            }
            None => self.sign_out(),
        }
    }

    /// Explicit sign-out: back to the landing screen.
    pub fn sign_out(&mut self) -> GateChange {
        if matches!(self.screen, Screen::SignedIn(_)) {
            info!("session ended");
            self.screen = Screen::Landing;
            GateChange::Left
        } else {
            GateChange::Unchanged
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignInField {
    #[default]
    Email,
    Password,
}

/// Email/password form on the sign-in screen.
#[derive(Debug, Default)]
pub struct SignInForm {
    pub email: TextInput,
    pub password: TextInput,
    focus: SignInField,
    pending: bool,
    error: Option<String>,
}

impl SignInForm {
    pub fn focus(&self) -> SignInField {
        self.focus
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            SignInField::Email => SignInField::Password,
            SignInField::Password => SignInField::Email,
        };
    }

    pub fn focused_input(&mut self) -> Option<&mut TextInput> {
        if self.pending {
            return None;
        }
        Some(match self.focus {
            SignInField::Email => &mut self.email,
            SignInField::Password => &mut self.password,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn masked_password(&self) -> String {
        "•".repeat(self.password.char_count())
    }

    /// Starts an attempt, or returns `None` while one is already running.
    pub fn begin(&mut self) -> Option<Credentials> {
        if self.pending {
            return None;
        }
        self.pending = true;
        self.error = None;
        Some(Credentials {
            email: self.email.value().trim().to_string(),
            password: self.password.value().to_string(),
        })
    }

    pub fn finish(&mut self, outcome: &Result<User, AuthError>) {
        self.pending = false;
        match outcome {
            Ok(_) => {
                self.password.clear();
                self.error = None;
            }
            Err(err) => {
                warn!(error = %err, "sign-in failed");
                self.error = Some(SIGN_IN_FAILED.to_string());
            }
        }
    }
}
