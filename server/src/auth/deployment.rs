//! Materialized realm deployment.
//!
//! # Post-conditions
//! - `RealmDeployment` instances are immutable once created.
//!
//! # Invariants
//! - `realm` is never empty.
//! - `auth_server_url`, when present, is an absolute `http`/`https` URL without
//!   a trailing slash.
//! - `realm_public_key`, when present, is a PEM-encoded RSA public key that
//!   `jsonwebtoken` accepts.

use serde::{Deserialize, Serialize};

/// When the authentication server requires TLS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SslRequired {
    /// TLS for every request.
    All,
    /// TLS for requests from non-private addresses.
    #[default]
    External,
    /// TLS is never required.
    None,
}

/// Authentication settings for one realm.
///
/// Built by a `ConfigBuilder` from the tenant's adapter document and cached
/// for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealmDeployment {
    /// The realm name.
    pub realm: String,
    /// Base URL of the authentication server.
    pub auth_server_url: Option<String>,
    /// Client identifier registered with the realm.
    pub resource: Option<String>,
    /// TLS policy.
    pub ssl_required: SslRequired,
    /// Whether the client is public (no client secret).
    pub public_client: bool,
    /// Whether the client only accepts bearer tokens and never initiates logins.
    pub bearer_only: bool,
    /// Confidential client secret.
    pub client_secret: Option<String>,
    /// PEM-encoded realm public key used to verify token signatures.
    pub realm_public_key: Option<String>,
}

impl RealmDeployment {
    /// Create a deployment for `realm` with every optional setting at its default.
    ///
    /// # Pre-conditions
    /// - `realm` must not be empty.
    #[must_use]
    pub(crate) fn new(realm: impl Into<String>) -> Self {
        let realm = realm.into();
        assert!(!realm.is_empty(), "realm must not be empty");
        Self {
            realm,
            auth_server_url: None,
            resource: None,
            ssl_required: SslRequired::default(),
            public_client: false,
            bearer_only: false,
            client_secret: None,
            realm_public_key: None,
        }
    }

    /// URL of the realm on the authentication server, if the server is known.
    #[must_use]
    pub fn realm_url(&self) -> Option<String> {
        self.auth_server_url
            .as_ref()
            .map(|base| format!("{base}/realms/{}", self.realm))
    }
}
