//! User and vendor dashboards.
//!
//! SYSTEM CONTEXT
//! ==============
//! Both dashboards are the same page parameterised by [`AccountKind`]. Opening
//! one runs the route guard first; only a rendered guard decision loads the
//! document list for the signed-in identity.

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod dashboard_test;

use std::path::Path;
use std::sync::Arc;

use crate::guard::{GuardDecision, Route, RouteGuard};
use crate::net::types::{AccountKind, DocumentRecord, Identity, PdfUpload};
use crate::state::session::{SessionError, SessionStore};

#[must_use]
pub fn heading(kind: AccountKind) -> &'static str {
    match kind {
        AccountKind::Individual => "USER DASHBOARD",
        AccountKind::Organization => "VENDOR DASHBOARD",
    }
}

/// Name shown in the dashboard header. Vendors see their organization when
/// it is known.
#[must_use]
pub fn header_name(identity: &Identity) -> &str {
    match identity.account_kind {
        AccountKind::Individual => &identity.display_name,
        AccountKind::Organization => identity
            .organization_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&identity.display_name),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardView {
    pub kind: AccountKind,
    pub heading: &'static str,
    pub header_name: String,
    pub documents: Vec<DocumentRecord>,
    pub total_uploads: usize,
    pub bytes_stored: u64,
}

#[must_use]
pub fn build_view(identity: &Identity, documents: Vec<DocumentRecord>) -> DashboardView {
    let bytes_stored = documents.iter().filter_map(|doc| doc.size).fold(0_u64, u64::saturating_add);
    DashboardView {
        kind: identity.account_kind,
        heading: heading(identity.account_kind),
        header_name: header_name(identity).to_owned(),
        total_uploads: documents.len(),
        bytes_stored,
        documents,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DashboardOutcome {
    Redirect(Route),
    Ready(DashboardView),
}

/// Read a local PDF for upload.
///
/// # Errors
///
/// Returns [`SessionError::ValidationFailure`] when the path lacks a `.pdf`
/// extension, cannot be read, or is empty.
pub async fn read_pdf(path: &Path) -> Result<PdfUpload, SessionError> {
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(SessionError::ValidationFailure("Only PDF files can be uploaded.".to_owned()));
    }

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(ToOwned::to_owned)
        .ok_or_else(|| SessionError::ValidationFailure("File name is not valid UTF-8.".to_owned()))?;

    let bytes = tokio::fs::read(path).await.map_err(|error| {
        tracing::debug!(path = %path.display(), %error, "cannot read upload");
        SessionError::ValidationFailure(format!("Cannot read {}.", path.display()))
    })?;
    if bytes.is_empty() {
        return Err(SessionError::ValidationFailure(format!("{file_name} is empty.")));
    }

    Ok(PdfUpload { file_name, bytes })
}

pub struct Dashboard {
    session: Arc<SessionStore>,
    kind: AccountKind,
    guard: RouteGuard,
}

impl Dashboard {
    #[must_use]
    pub fn new(session: Arc<SessionStore>, kind: AccountKind) -> Self {
        Self { session, kind, guard: RouteGuard::new().require(kind) }
    }

    #[must_use]
    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    #[must_use]
    pub fn route(&self) -> Route {
        Route::dashboard_for(self.kind)
    }

    /// Wait for the session to settle, then either redirect or load the view.
    ///
    /// # Errors
    ///
    /// Fails when the document list cannot be fetched.
    pub async fn open(&self) -> Result<DashboardOutcome, SessionError> {
        let mut rx = self.session.subscribe();
        match self.guard.settle(&mut rx).await {
            GuardDecision::Render => self.refresh().await.map(DashboardOutcome::Ready),
            GuardDecision::Redirect(route) => Ok(DashboardOutcome::Redirect(route)),
            GuardDecision::Pending => Err(SessionError::NotAuthenticated),
        }
    }

    /// Reload the document list for the signed-in identity.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotAuthenticated`] when signed out, otherwise
    /// the backend's failure.
    pub async fn refresh(&self) -> Result<DashboardView, SessionError> {
        let (identity, token) = self.credentials()?;
        let documents = self.session.backend().list_documents(&token, &identity.id).await.map_err(|error| {
            tracing::warn!(user_id = %identity.id, %error, "listing documents failed");
            SessionError::from(error)
        })?;
        tracing::debug!(user_id = %identity.id, count = documents.len(), "documents loaded");
        Ok(build_view(&identity, documents))
    }

    /// Upload a local PDF, then return the refreshed view.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ValidationFailure`] for a file that is not an
    /// uploadable PDF; no request is made in that case.
    pub async fn upload(&self, path: &Path) -> Result<DashboardView, SessionError> {
        let (identity, token) = self.credentials()?;
        let upload = read_pdf(path).await?;

        tracing::info!(user_id = %identity.id, file = %upload.file_name, bytes = upload.bytes.len(), "uploading pdf");
        self.session.backend().upload_pdf(&token, &upload).await.map_err(|error| {
            tracing::warn!(file = %upload.file_name, %error, "upload failed");
            SessionError::from(error)
        })?;

        self.refresh().await
    }

    fn credentials(&self) -> Result<(Identity, String), SessionError> {
        match self.session.credentials() {
            Some((identity, token)) if identity.account_kind == self.kind => Ok((identity, token)),
            _ => Err(SessionError::NotAuthenticated),
        }
    }
}
