//! REST client for the PrintEase backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session store and the dashboards talk to the backend only through the
//! [`Backend`] trait. [`HttpBackend`] is the production implementation; tests
//! substitute a fake so session behavior can be checked without a server.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures (including timeouts) become [`ApiError::Network`],
//! non-2xx statuses become [`ApiError::Rejected`] with the raw body, and 2xx
//! bodies that do not parse become [`ApiError::Malformed`]. Nothing retries.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::time::Duration;

use super::types::{
    AccountKind, ApiError, AuthGrant, Credentials, DocumentRecord, Identity, PdfUpload, RegisterData,
    parse_auth_grant, parse_document_list, parse_probe_body,
};
use crate::config::ClientConfig;

pub const UPLOAD_ENDPOINT: &str = "/api/v1/pdf/upload";
pub const UPLOAD_FIELD: &str = "pdf";

fn sign_in_endpoint(kind: AccountKind) -> String {
    format!("/api/v1/{}/sign-in", kind.endpoint_family())
}

fn sign_up_endpoint(kind: AccountKind) -> String {
    format!("/api/v1/{}/sign-up", kind.endpoint_family())
}

fn session_probe_endpoint(kind: AccountKind) -> String {
    format!("/api/v1/{}/sample", kind.endpoint_family())
}

fn documents_endpoint(user_id: &str) -> String {
    format!("/api/v1/pdf/user/{user_id}")
}

// =============================================================================
// TRAIT
// =============================================================================

/// Backend calls consumed by the client.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// `POST /api/v1/{family}/sign-in`.
    async fn sign_in(&self, kind: AccountKind, credentials: &Credentials) -> Result<AuthGrant, ApiError>;

    /// `POST /api/v1/{family}/sign-up`.
    async fn sign_up(&self, kind: AccountKind, data: &RegisterData) -> Result<AuthGrant, ApiError>;

    /// `GET /api/v1/{family}/sample` with the bearer token; returns the
    /// server's current record for the token's owner.
    async fn probe_session(&self, kind: AccountKind, token: &str) -> Result<Identity, ApiError>;

    /// `POST /api/v1/pdf/upload` as multipart field `pdf`.
    async fn upload_pdf(&self, token: &str, upload: &PdfUpload) -> Result<(), ApiError>;

    /// `GET /api/v1/pdf/user/{user_id}`.
    async fn list_documents(&self, token: &str, user_id: &str) -> Result<Vec<DocumentRecord>, ApiError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a client for `config.api_url` with the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] if the TLS backend fails to
    /// initialize.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.api_url.clone() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send the request and return the body of a 2xx response.
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await.map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::Rejected { status: status.as_u16(), body: text });
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn sign_in(&self, kind: AccountKind, credentials: &Credentials) -> Result<AuthGrant, ApiError> {
        let request = self.http.post(self.url(&sign_in_endpoint(kind))).json(credentials);
        let body = self.execute(request).await?;
        parse_auth_grant(&body, kind)
    }

    async fn sign_up(&self, kind: AccountKind, data: &RegisterData) -> Result<AuthGrant, ApiError> {
        let request = self.http.post(self.url(&sign_up_endpoint(kind))).json(&data.to_body());
        let body = self.execute(request).await?;
        parse_auth_grant(&body, kind)
    }

    async fn probe_session(&self, kind: AccountKind, token: &str) -> Result<Identity, ApiError> {
        let request = self.http.get(self.url(&session_probe_endpoint(kind))).bearer_auth(token);
        let body = self.execute(request).await?;
        let (wire, shape) = parse_probe_body(&body)?;
        tracing::debug!(%kind, %shape, "session probe body parsed");
        wire.into_identity(kind)
    }

    async fn upload_pdf(&self, token: &str, upload: &PdfUpload) -> Result<(), ApiError> {
        let part = reqwest::multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str("application/pdf")
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part(UPLOAD_FIELD, part);

        let request = self.http.post(self.url(UPLOAD_ENDPOINT)).bearer_auth(token).multipart(form);
        self.execute(request).await?;
        Ok(())
    }

    async fn list_documents(&self, token: &str, user_id: &str) -> Result<Vec<DocumentRecord>, ApiError> {
        let request = self.http.get(self.url(&documents_endpoint(user_id))).bearer_auth(token);
        let body = self.execute(request).await?;
        parse_document_list(&body)
    }
}
