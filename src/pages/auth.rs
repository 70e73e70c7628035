//! Sign-in / registration form with the user/vendor toggle.
//!
//! SYSTEM CONTEXT
//! ==============
//! A visitor who is already signed in is sent to their dashboard. Otherwise
//! the form collects credentials, runs client-side checks, and hands off to
//! the session store; the resulting identity's kind picks the dashboard.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use crate::guard::Route;
use crate::net::types::{AccountKind, RegisterData};
use crate::state::session::{AuthPhase, SessionError, SessionStore};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthField {
    Email,
    Password,
    ConfirmPassword,
    FullName,
    OrganizationName,
    Phone,
}

/// Dashboard to send an already signed-in visitor of `/auth` to.
#[must_use]
pub fn auth_page_redirect(phase: AuthPhase) -> Option<Route> {
    match phase {
        AuthPhase::Authenticated(kind) => Some(Route::dashboard_for(kind)),
        AuthPhase::Unknown | AuthPhase::Anonymous => None,
    }
}

/// Label of the name field for the selected account kind.
#[must_use]
pub fn name_label(kind: AccountKind) -> &'static str {
    match kind {
        AccountKind::Individual => "FULL NAME",
        AccountKind::Organization => "CONTACT NAME",
    }
}

fn validate_login_input(email: &str, password: &str) -> Result<(String, String), SessionError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(SessionError::ValidationFailure("Enter your email and password.".to_owned()));
    }
    Ok((email.to_owned(), password.to_owned()))
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub account_kind: AccountKind,
    email: String,
    password: String,
    confirm_password: String,
    full_name: String,
    organization_name: String,
    phone: String,
    error: Option<String>,
}

impl Default for AuthForm {
    fn default() -> Self {
        Self::new(AuthMode::Login, AccountKind::Individual)
    }
}

impl AuthForm {
    #[must_use]
    pub fn new(mode: AuthMode, account_kind: AccountKind) -> Self {
        Self {
            mode,
            account_kind,
            email: String::new(),
            password: String::new(),
            confirm_password: String::new(),
            full_name: String::new(),
            organization_name: String::new(),
            phone: String::new(),
            error: None,
        }
    }

    /// Update one field. Editing any field clears the previous error.
    pub fn set(&mut self, field: AuthField, value: impl Into<String>) {
        let value = value.into();
        match field {
            AuthField::Email => self.email = value,
            AuthField::Password => self.password = value,
            AuthField::ConfirmPassword => self.confirm_password = value,
            AuthField::FullName => self.full_name = value,
            AuthField::OrganizationName => self.organization_name = value,
            AuthField::Phone => self.phone = value,
        }
        self.error = None;
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn submit_label(&self) -> String {
        let kind = match self.account_kind {
            AccountKind::Individual => "USER",
            AccountKind::Organization => "VENDOR",
        };
        match self.mode {
            AuthMode::Login => format!("AUTHENTICATE {kind}"),
            AuthMode::Register => format!("INITIALIZE {kind} ACCOUNT"),
        }
    }

    fn register_data(&self) -> Result<RegisterData, SessionError> {
        let (email, password) = validate_login_input(&self.email, &self.password)?;
        Ok(RegisterData {
            email,
            password,
            confirm_password: self.confirm_password.clone(),
            full_name: self.full_name.trim().to_owned(),
            account_kind: Some(self.account_kind),
            organization_name: match self.account_kind {
                AccountKind::Organization => optional(&self.organization_name),
                AccountKind::Individual => None,
            },
            phone: optional(&self.phone),
        })
    }

    /// Sign in or register, returning the dashboard for the new session.
    ///
    /// On failure the user-facing message is kept in [`AuthForm::error`].
    ///
    /// # Errors
    ///
    /// Returns the session store's error; validation errors are raised
    /// before any request.
    pub async fn submit(&mut self, session: &SessionStore) -> Result<Route, SessionError> {
        self.error = None;
        let result = match self.mode {
            AuthMode::Login => match validate_login_input(&self.email, &self.password) {
                Ok((email, password)) => session.login(&email, &password, self.account_kind).await,
                Err(error) => Err(error),
            },
            AuthMode::Register => match self.register_data() {
                Ok(data) => session.register(&data).await,
                Err(error) => Err(error),
            },
        };

        match result {
            Ok(identity) => Ok(Route::dashboard_for(identity.account_kind)),
            Err(error) => {
                self.error = Some(error.user_message());
                Err(error)
            }
        }
    }
}
