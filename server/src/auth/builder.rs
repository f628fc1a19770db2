//! Building realm deployments from tenant records.
//!
//! A tenant record carries an adapter document: a JSON object with kebab-case
//! keys such as `realm`, `auth-server-url`, `ssl-required`, `resource`,
//! `public-client`, `bearer-only`, `credentials.secret` and
//! `realm-public-key`. Unrecognized keys are ignored.
//!
//! # Post-conditions
//! - A successful build yields a deployment that satisfies every
//!   `RealmDeployment` invariant.
//! - Building has no side effects; the record is only borrowed.

use jsonwebtoken::DecodingKey;
use serde::Deserialize;

use super::{RealmDeployment, SslRequired};
use crate::provider::TenantRecord;

/// Error returned when a tenant record cannot be turned into a deployment.
#[derive(Debug)]
pub enum BuildError {
    /// The payload is not a JSON adapter document.
    InvalidDocument(serde_json::Error),
    /// A required field is absent or empty.
    MissingField(&'static str),
    /// A field is present but its value is unusable.
    InvalidField {
        /// The adapter document key.
        field: &'static str,
        /// Description of what is invalid.
        reason: String,
    },
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDocument(e) => write!(f, "malformed adapter document: {e}"),
            Self::MissingField(field) => write!(f, "missing required field '{field}'"),
            Self::InvalidField { field, reason } => {
                write!(f, "invalid value for '{field}': {reason}")
            }
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidDocument(e) => Some(e),
            Self::MissingField(_) | Self::InvalidField { .. } => None,
        }
    }
}

impl From<serde_json::Error> for BuildError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidDocument(e)
    }
}

/// Materializes a tenant record into a ready-to-use deployment.
///
/// Implementations may be slow (parsing, key validation, remote metadata) and
/// are called at most a handful of times per tenant.
pub trait ConfigBuilder: Send + Sync {
    /// Build the deployment described by `record`.
    ///
    /// # Errors
    /// Returns `BuildError` if the record cannot be materialized.
    fn build(&self, record: &TenantRecord) -> Result<RealmDeployment, BuildError>;
}

/// The adapter document as stored in a tenant record.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AdapterDocument {
    realm: Option<String>,
    auth_server_url: Option<String>,
    resource: Option<String>,
    #[serde(default)]
    ssl_required: SslRequired,
    #[serde(default)]
    public_client: bool,
    #[serde(default)]
    bearer_only: bool,
    credentials: Option<Credentials>,
    realm_public_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Credentials {
    secret: Option<String>,
}

/// Builds deployments from JSON adapter documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDeploymentBuilder;

impl JsonDeploymentBuilder {
    /// Create a new builder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ConfigBuilder for JsonDeploymentBuilder {
    fn build(&self, record: &TenantRecord) -> Result<RealmDeployment, BuildError> {
        let document: AdapterDocument = serde_json::from_slice(&record.payload)?;

        let realm = document
            .realm
            .filter(|realm| !realm.trim().is_empty())
            .ok_or(BuildError::MissingField("realm"))?;

        if realm != record.tenant {
            tracing::debug!(
                "Adapter document for tenant '{}' names realm '{}'",
                record.tenant,
                realm
            );
        }

        let auth_server_url = document
            .auth_server_url
            .map(|url| parse_server_url(&url))
            .transpose()?;

        let realm_public_key = document
            .realm_public_key
            .map(|key| parse_public_key(&key))
            .transpose()?;

        let client_secret = document
            .credentials
            .and_then(|credentials| credentials.secret)
            .filter(|secret| !secret.is_empty());

        if document.public_client && client_secret.is_some() {
            return Err(BuildError::InvalidField {
                field: "credentials",
                reason: "a public client must not carry a client secret".to_string(),
            });
        }

        let mut deployment = RealmDeployment::new(realm);
        deployment.auth_server_url = auth_server_url;
        deployment.resource = document.resource.filter(|resource| !resource.is_empty());
        deployment.ssl_required = document.ssl_required;
        deployment.public_client = document.public_client;
        deployment.bearer_only = document.bearer_only;
        deployment.client_secret = client_secret;
        deployment.realm_public_key = realm_public_key;

        Ok(deployment)
    }
}

/// Check that `url` is an absolute `http`/`https` URL and drop trailing slashes.
fn parse_server_url(url: &str) -> Result<String, BuildError> {
    let trimmed = url.trim().trim_end_matches('/');
    let host = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .ok_or_else(|| BuildError::InvalidField {
            field: "auth-server-url",
            reason: format!("'{url}' is not an absolute http(s) URL"),
        })?;

    if host.is_empty() || host.starts_with('/') {
        return Err(BuildError::InvalidField {
            field: "auth-server-url",
            reason: format!("'{url}' has no host"),
        });
    }

    Ok(trimmed.to_string())
}

/// Accept either a full PEM block or the bare base64 body adapter documents
/// usually carry, and validate it as an RSA public key.
fn parse_public_key(key: &str) -> Result<String, BuildError> {
    let trimmed = key.trim();
    let pem = if trimmed.starts_with("-----BEGIN") {
        trimmed.to_string()
    } else {
        wrap_public_key_body(trimmed)
    };

    DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| BuildError::InvalidField {
        field: "realm-public-key",
        reason: e.to_string(),
    })?;

    Ok(pem)
}

fn wrap_public_key_body(body: &str) -> String {
    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    let mut pem = String::from("-----BEGIN PUBLIC KEY-----\n");
    for line in compact.as_bytes().chunks(64) {
        // Base64 is ASCII, so every chunk is valid UTF-8.
        pem.push_str(&String::from_utf8_lossy(line));
        pem.push('\n');
    }
    pem.push_str("-----END PUBLIC KEY-----");
    pem
}

#[cfg(test)]
mod tests {
    use super::*;

    // RSA-2048 public key generated for tests only.
    const TEST_PUBLIC_KEY_BODY: &str = "MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEApNSmtxcRj/4byC7pZixR\
qPTd7Td8D7gB9FPVRYKH76naiSDkdFmKckjHs/xsb4rn0pIrPLMg52SrRR+OLriR\
cEGEVRgCLo3bu4WOKLsKmJ7iilgpkv0m4fIWncWJnU8I0WaDadRpr72+MAjIBlTc\
WhbbFXv9orHnMkou8P/KD4SSNvYrcelYgSBckrAw9qGGjfMK5JaC20Sar9qqsDio\
ill5BUGN18v6ZHhlsR6SLdx6GWA6er/MACZsI4BxUt5tZHjdNJttYcDCWt7wgm0b\
92ntJzCNMCTd9NrYB6+MfkletC9zq8eTQ3cukrBX+H2ecO5FnxJM7Hst73Psxjqw\
UQIDAQAB";

    fn record(payload: &str) -> TenantRecord {
        TenantRecord::new("acme", payload)
    }

    fn build(payload: &str) -> Result<RealmDeployment, BuildError> {
        JsonDeploymentBuilder::new().build(&record(payload))
    }

    #[test]
    fn test_build_minimal_document() {
        let deployment = build(r#"{"realm":"acme"}"#).expect("minimal document builds");
        assert_eq!(deployment, RealmDeployment::new("acme"));
    }

    #[test]
    fn test_build_full_document() {
        let payload = format!(
            r#"{{
                "realm": "acme",
                "realm-public-key": "{TEST_PUBLIC_KEY_BODY}",
                "auth-server-url": "https://sso.example.com/auth/",
                "ssl-required": "all",
                "resource": "portal",
                "bearer-only": true,
                "credentials": {{ "secret": "s3cr3t" }},
                "enable-cors": true
            }}"#
        );
        let deployment = build(&payload).expect("full document builds");

        assert_eq!(deployment.realm, "acme");
        assert_eq!(
            deployment.auth_server_url.as_deref(),
            Some("https://sso.example.com/auth")
        );
        assert_eq!(deployment.ssl_required, SslRequired::All);
        assert_eq!(deployment.resource.as_deref(), Some("portal"));
        assert!(deployment.bearer_only);
        assert!(!deployment.public_client);
        assert_eq!(deployment.client_secret.as_deref(), Some("s3cr3t"));

        let pem = deployment.realm_public_key.expect("public key kept");
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----\n"));
        assert!(pem.ends_with("-----END PUBLIC KEY-----"));
    }

    #[test]
    fn test_build_accepts_pem_public_key() {
        let pem = wrap_public_key_body(TEST_PUBLIC_KEY_BODY);
        let payload = serde_json::json!({ "realm": "acme", "realm-public-key": pem }).to_string();

        let deployment = build(&payload).expect("PEM key accepted");
        assert_eq!(deployment.realm_public_key.as_deref(), Some(pem.as_str()));
    }

    #[test]
    fn test_build_rejects_invalid_public_key() {
        let result = build(r#"{"realm":"acme","realm-public-key":"not-a-key"}"#);
        assert!(matches!(
            result,
            Err(BuildError::InvalidField {
                field: "realm-public-key",
                ..
            })
        ));
    }

    #[test]
    fn test_build_rejects_malformed_json() {
        assert!(matches!(build("{not json"), Err(BuildError::InvalidDocument(_))));
        assert!(matches!(build("[]"), Err(BuildError::InvalidDocument(_))));
    }

    #[test]
    fn test_build_rejects_non_utf8_payload() {
        let record = TenantRecord::new("acme", vec![0xff, 0xfe, b'{', b'}']);
        let result = JsonDeploymentBuilder::new().build(&record);
        assert!(matches!(result, Err(BuildError::InvalidDocument(_))));
    }

    #[test]
    fn test_build_requires_realm() {
        assert!(matches!(build("{}"), Err(BuildError::MissingField("realm"))));
        assert!(matches!(
            build(r#"{"realm":"  "}"#),
            Err(BuildError::MissingField("realm"))
        ));
    }

    #[test]
    fn test_build_rejects_relative_server_url() {
        for url in ["/auth", "ftp://sso.example.com", "https://", "https:///auth"] {
            let payload = serde_json::json!({ "realm": "acme", "auth-server-url": url }).to_string();
            assert!(
                matches!(
                    build(&payload),
                    Err(BuildError::InvalidField {
                        field: "auth-server-url",
                        ..
                    })
                ),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn test_build_rejects_unknown_ssl_policy() {
        let result = build(r#"{"realm":"acme","ssl-required":"sometimes"}"#);
        assert!(matches!(result, Err(BuildError::InvalidDocument(_))));
    }

    #[test]
    fn test_build_rejects_public_client_with_secret() {
        let result = build(
            r#"{"realm":"acme","public-client":true,"credentials":{"secret":"s3cr3t"}}"#,
        );
        assert!(matches!(
            result,
            Err(BuildError::InvalidField {
                field: "credentials",
                ..
            })
        ));
    }

    #[test]
    fn test_wrap_public_key_body_line_length() {
        let pem = wrap_public_key_body(TEST_PUBLIC_KEY_BODY);
        for line in pem.lines() {
            assert!(line.len() <= 64 || line.starts_with("-----"));
        }
    }

    #[test]
    fn test_build_error_display() {
        assert_eq!(
            BuildError::MissingField("realm").to_string(),
            "missing required field 'realm'"
        );
        let invalid = BuildError::InvalidField {
            field: "auth-server-url",
            reason: "no host".to_string(),
        };
        assert_eq!(invalid.to_string(), "invalid value for 'auth-server-url': no host");
    }
}
