//! Wire DTOs shared by the backend client, the session store, and pages.
//!
//! DESIGN
//! ======
//! The backend and the older web front end spell the same fields several
//! ways (`fullName` vs `name`, `userType: "vendor"` vs
//! `accountKind: "organization"`, `_id` vs `id`). Inbound bodies go through
//! permissive `Wire*` structs and are converted into one canonical shape;
//! outbound and persisted JSON always uses the canonical camelCase spelling.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced at the HTTP seam.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not be sent or the response could not be read.
    #[error("request failed: {0}")]
    Network(String),

    /// The backend answered with a non-success HTTP status.
    #[error("backend returned status {status}")]
    Rejected { status: u16, body: String },

    /// A success response carried a body we could not interpret.
    #[error("unexpected response body: {0}")]
    Malformed(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// ACCOUNT KIND
// =============================================================================

/// Individual users and organization vendors use separate endpoint families
/// and separate dashboards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    #[serde(alias = "user")]
    Individual,
    #[serde(alias = "vendor")]
    Organization,
}

impl AccountKind {
    /// Path segment of the backend endpoint family for this kind.
    #[must_use]
    pub fn endpoint_family(self) -> &'static str {
        match self {
            Self::Individual => "user",
            Self::Organization => "vendor",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Organization => "organization",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown account kind '{0}' (expected 'user' or 'vendor')")]
pub struct ParseAccountKindError(String);

impl FromStr for AccountKind {
    type Err = ParseAccountKindError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user" | "individual" => Ok(Self::Individual),
            "vendor" | "organization" => Ok(Self::Organization),
            other => Err(ParseAccountKindError(other.to_owned())),
        }
    }
}

// =============================================================================
// IDENTITY
// =============================================================================

/// The authenticated user or vendor record held by the session store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "WireIdentity")]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub account_kind: AccountKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(
        serialize_with = "time::serde::rfc3339::option::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Number(i64),
}

impl IdValue {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

/// Identity as the backend sends it, before the account kind is pinned.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireIdentity {
    id: Option<IdValue>,
    #[serde(rename = "_id")]
    object_id: Option<IdValue>,
    email: Option<String>,
    display_name: Option<String>,
    full_name: Option<String>,
    name: Option<String>,
    account_kind: Option<AccountKind>,
    user_type: Option<AccountKind>,
    organization_name: Option<String>,
    company_name: Option<String>,
    phone: Option<String>,
    created_at: Option<String>,
}

impl WireIdentity {
    /// Account kind claimed by the body, if any.
    #[must_use]
    pub fn claimed_kind(&self) -> Option<AccountKind> {
        self.account_kind.or(self.user_type)
    }

    fn has_id(&self) -> bool {
        self.id.is_some() || self.object_id.is_some()
    }

    /// Convert into an [`Identity`] whose kind is the endpoint family's kind.
    ///
    /// A body that claims a different kind is logged and overridden; the
    /// endpoint that issued the record decides which family it belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Malformed`] when the record has no id.
    pub fn into_identity(self, kind: AccountKind) -> Result<Identity, ApiError> {
        if let Some(claimed) = self.claimed_kind() {
            if claimed != kind {
                tracing::warn!(%claimed, expected = %kind, "identity body claims a different account kind");
            }
        }
        self.into_identity_with(Some(kind))
    }

    fn into_identity_with(self, kind: Option<AccountKind>) -> Result<Identity, ApiError> {
        let account_kind = kind
            .or(self.account_kind)
            .or(self.user_type)
            .ok_or_else(|| ApiError::Malformed("identity is missing an account kind".to_owned()))?;
        let id = self
            .id
            .or(self.object_id)
            .map(IdValue::into_string)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::Malformed("identity is missing an id".to_owned()))?;
        let created_at = self
            .created_at
            .as_deref()
            .and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok());

        Ok(Identity {
            id,
            email: self.email.unwrap_or_default(),
            display_name: self.display_name.or(self.full_name).or(self.name).unwrap_or_default(),
            account_kind,
            organization_name: self.organization_name.or(self.company_name),
            phone: self.phone,
            created_at,
        })
    }
}

impl TryFrom<WireIdentity> for Identity {
    type Error = ApiError;

    fn try_from(wire: WireIdentity) -> Result<Self, Self::Error> {
        wire.into_identity_with(None)
    }
}

// =============================================================================
// AUTH REQUESTS / RESPONSES
// =============================================================================

/// Body of a sign-in request.
#[derive(Clone, Debug, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Fields collected by the registration form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterData {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub full_name: String,
    pub account_kind: Option<AccountKind>,
    pub organization_name: Option<String>,
    pub phone: Option<String>,
}

impl RegisterData {
    #[must_use]
    pub fn passwords_match(&self) -> bool {
        self.password == self.confirm_password
    }

    /// Registration fields as sent to the sign-up endpoint.
    #[must_use]
    pub fn to_body(&self) -> RegisterBody<'_> {
        RegisterBody {
            email: &self.email,
            password: &self.password,
            confirm_password: &self.confirm_password,
            name: &self.full_name,
            company_name: self.organization_name.as_deref(),
            phone: self.phone.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody<'a> {
    email: &'a str,
    password: &'a str,
    confirm_password: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    company_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
}

/// Identity and bearer token issued by sign-in or sign-up.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthGrant {
    pub identity: Identity,
    pub token: String,
}

#[derive(Deserialize)]
struct GrantEnvelope {
    data: GrantData,
}

#[derive(Deserialize)]
struct GrantData {
    user: WireIdentity,
    token: String,
}

/// Parse a `{data:{user, token}}` sign-in/sign-up body.
///
/// # Errors
///
/// Returns [`ApiError::Malformed`] when the envelope, identity, or token is
/// missing.
pub fn parse_auth_grant(body: &str, kind: AccountKind) -> Result<AuthGrant, ApiError> {
    let envelope: GrantEnvelope = serde_json::from_str(body).map_err(|e| ApiError::Malformed(e.to_string()))?;
    let token = envelope.data.token;
    if token.trim().is_empty() {
        return Err(ApiError::Malformed("auth response carried an empty token".to_owned()));
    }
    let identity = envelope.data.user.into_identity(kind)?;
    Ok(AuthGrant { identity, token })
}

// =============================================================================
// SESSION PROBE
// =============================================================================

/// Which envelope a re-validation body used.
///
/// The user and vendor probe endpoints disagree: one nests the identity under
/// `user`, the other returns it bare. Both are accepted and the shape is
/// reported so the divergence stays visible in logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeShape {
    /// `{ "user": {...} }`
    User,
    /// `{ "data": { "user": {...} } }`
    DataUser,
    /// `{ "data": {...identity...} }`
    Data,
    /// The identity itself.
    Bare,
}

impl fmt::Display for ProbeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::DataUser => "data.user",
            Self::Data => "data",
            Self::Bare => "bare",
        })
    }
}

/// Locate the identity inside a re-validation body.
///
/// # Errors
///
/// Returns [`ApiError::Malformed`] when no identity-bearing object is found.
pub fn parse_probe_body(body: &str) -> Result<(WireIdentity, ProbeShape), ApiError> {
    let value: Value = serde_json::from_str(body).map_err(|e| ApiError::Malformed(e.to_string()))?;

    let candidates = [
        (value.get("user"), ProbeShape::User),
        (value.get("data").and_then(|data| data.get("user")), ProbeShape::DataUser),
        (value.get("data"), ProbeShape::Data),
        (Some(&value), ProbeShape::Bare),
    ];

    for (candidate, shape) in candidates {
        let Some(candidate) = candidate.filter(|v| v.is_object()) else {
            continue;
        };
        let Ok(wire) = serde_json::from_value::<WireIdentity>(candidate.clone()) else {
            continue;
        };
        if wire.has_id() {
            return Ok((wire, shape));
        }
    }

    Err(ApiError::Malformed("session probe body carried no identity".to_owned()))
}

// =============================================================================
// DOCUMENTS
// =============================================================================

/// One uploaded PDF as listed by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "WireDocument")]
pub struct DocumentRecord {
    pub id: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDocument {
    id: Option<IdValue>,
    #[serde(rename = "_id")]
    object_id: Option<IdValue>,
    file_name: Option<String>,
    original_name: Option<String>,
    filename: Option<String>,
    name: Option<String>,
    size: Option<u64>,
    file_size: Option<u64>,
    url: Option<String>,
    file_url: Option<String>,
    status: Option<String>,
    created_at: Option<String>,
    uploaded_at: Option<String>,
}

impl From<WireDocument> for DocumentRecord {
    fn from(wire: WireDocument) -> Self {
        Self {
            id: wire.id.or(wire.object_id).map(IdValue::into_string).unwrap_or_default(),
            file_name: wire
                .file_name
                .or(wire.original_name)
                .or(wire.filename)
                .or(wire.name)
                .unwrap_or_default(),
            size: wire.size.or(wire.file_size),
            url: wire.url.or(wire.file_url),
            status: wire.status,
            created_at: wire.created_at.or(wire.uploaded_at),
        }
    }
}

#[derive(Deserialize)]
struct DocumentListEnvelope {
    #[serde(default)]
    data: Vec<DocumentRecord>,
}

/// Parse a `{data: [...]}` listing body.
///
/// # Errors
///
/// Returns [`ApiError::Malformed`] if the body is not a listing envelope.
pub fn parse_document_list(body: &str) -> Result<Vec<DocumentRecord>, ApiError> {
    let envelope: DocumentListEnvelope =
        serde_json::from_str(body).map_err(|e| ApiError::Malformed(e.to_string()))?;
    Ok(envelope.data)
}

/// A PDF read from disk, ready to post as multipart field `pdf`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PdfUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}
