//! Shared fixtures for unit tests.
//!
//! `FakeBackend` stands in for the REST backend: it counts calls, can be told
//! to reject or to answer slowly, and records uploads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::net::api::Backend;
use crate::net::types::{
    AccountKind, ApiError, AuthGrant, Credentials, DocumentRecord, Identity, PdfUpload, RegisterData,
};
use crate::state::session::SessionStore;
use crate::storage::{MemoryStorage, SessionStorage};

#[must_use]
pub fn identity(id: &str, kind: AccountKind) -> Identity {
    Identity {
        id: id.to_owned(),
        email: format!("{id}@printease.test"),
        display_name: "John Doe".to_owned(),
        account_kind: kind,
        organization_name: match kind {
            AccountKind::Individual => None,
            AccountKind::Organization => Some("ACME Corporation".to_owned()),
        },
        phone: None,
        created_at: None,
    }
}

#[must_use]
pub fn document(id: &str, file_name: &str, size: Option<u64>) -> DocumentRecord {
    DocumentRecord {
        id: id.to_owned(),
        file_name: file_name.to_owned(),
        size,
        url: None,
        status: None,
        created_at: None,
    }
}

fn rejected(status: u16) -> ApiError {
    ApiError::Rejected { status, body: serde_json::json!({ "message": "Invalid credentials" }).to_string() }
}

#[derive(Default)]
pub struct FakeBackend {
    pub sign_in_calls: AtomicUsize,
    pub sign_up_calls: AtomicUsize,
    pub probe_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub uploads: Mutex<Vec<PdfUpload>>,
    documents: Mutex<Vec<DocumentRecord>>,
    reject_auth: Option<u16>,
    reject_probe: Option<u16>,
    offline: bool,
    latency: Option<Duration>,
    token: String,
}

impl FakeBackend {
    /// Accepts every credential and issues token `t1`.
    #[must_use]
    pub fn accepting() -> Self {
        Self { token: "t1".to_owned(), ..Self::default() }
    }

    #[must_use]
    pub fn rejecting_auth(mut self, status: u16) -> Self {
        self.reject_auth = Some(status);
        self
    }

    #[must_use]
    pub fn rejecting_probe(mut self, status: u16) -> Self {
        self.reject_probe = Some(status);
        self
    }

    /// Every call fails as if the server were unreachable.
    #[must_use]
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    #[must_use]
    pub fn with_documents(self, documents: Vec<DocumentRecord>) -> Self {
        *self.documents.lock().unwrap() = documents;
        self
    }

    pub fn total_calls(&self) -> usize {
        [&self.sign_in_calls, &self.sign_up_calls, &self.probe_calls, &self.upload_calls, &self.list_calls]
            .iter()
            .map(|counter| counter.load(Ordering::SeqCst))
            .sum()
    }

    async fn respond(&self) -> Result<(), ApiError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.offline {
            return Err(ApiError::Network("connection refused".to_owned()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Backend for FakeBackend {
    async fn sign_in(&self, kind: AccountKind, credentials: &Credentials) -> Result<AuthGrant, ApiError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        if let Some(status) = self.reject_auth {
            return Err(rejected(status));
        }
        let mut identity = identity("1", kind);
        identity.email.clone_from(&credentials.email);
        Ok(AuthGrant { identity, token: self.token.clone() })
    }

    async fn sign_up(&self, kind: AccountKind, data: &RegisterData) -> Result<AuthGrant, ApiError> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        if let Some(status) = self.reject_auth {
            return Err(rejected(status));
        }
        let mut identity = identity("2", kind);
        identity.email.clone_from(&data.email);
        identity.display_name.clone_from(&data.full_name);
        identity.organization_name.clone_from(&data.organization_name);
        Ok(AuthGrant { identity, token: self.token.clone() })
    }

    async fn probe_session(&self, kind: AccountKind, token: &str) -> Result<Identity, ApiError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        if let Some(status) = self.reject_probe {
            return Err(rejected(status));
        }
        if token != self.token {
            return Err(rejected(401));
        }
        let mut identity = identity("1", kind);
        identity.display_name = "Server Name".to_owned();
        Ok(identity)
    }

    async fn upload_pdf(&self, _token: &str, upload: &PdfUpload) -> Result<(), ApiError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        self.uploads.lock().unwrap().push(upload.clone());
        let size = u64::try_from(upload.bytes.len()).unwrap_or(u64::MAX);
        let mut documents = self.documents.lock().unwrap();
        let id = format!("d{}", documents.len() + 1);
        documents.push(document(&id, &upload.file_name, Some(size)));
        Ok(())
    }

    async fn list_documents(&self, _token: &str, _user_id: &str) -> Result<Vec<DocumentRecord>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        Ok(self.documents.lock().unwrap().clone())
    }
}

/// A store over `backend` and fresh in-memory storage.
pub fn store_with(backend: FakeBackend) -> (Arc<SessionStore>, Arc<FakeBackend>, Arc<MemoryStorage>) {
    let backend = Arc::new(backend);
    let storage = Arc::new(MemoryStorage::new());
    let store = store_over(backend.clone(), storage.clone());
    (store, backend, storage)
}

/// A store over explicit backend and storage handles.
pub fn store_over(backend: Arc<FakeBackend>, storage: Arc<dyn SessionStorage>) -> Arc<SessionStore> {
    Arc::new(SessionStore::new(backend, storage))
}
