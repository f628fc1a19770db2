//! Tenant extraction from request paths.
//!
//! A deployment is selected by the path segment that follows a configured
//! marker, e.g. with marker `/tenants/` the path `/app/tenants/acme/login?x=1`
//! selects tenant `acme`.
//!
//! # Invariants
//! - Extraction has no side effects.
//! - The returned identifier never contains `/` or `?`.

use crate::error::ResolveError;

/// Maximum length, in bytes, of a tenant identifier.
pub const MAX_TENANT_ID_LENGTH: usize = 256;

/// Extract the tenant identifier that follows `marker` in `path`.
///
/// `marker` is matched literally at its first occurrence. The identifier is
/// the text after the marker up to the next `/`, with any query string
/// stripped. An empty identifier (e.g. a trailing marker) is returned as-is;
/// `validate_tenant_id` rejects it.
///
/// # Errors
/// Returns `ResolveError::NoTenantContext` if `marker` does not occur in `path`.
///
/// # Examples
///
/// ```
/// use realm_server::tenant_path::extract_tenant;
///
/// assert_eq!(extract_tenant("/app/tenants/acme/login?x=1", "/tenants/").ok(), Some("acme"));
/// assert!(extract_tenant("/app/login", "/tenants/").is_err());
/// ```
pub fn extract_tenant<'a>(path: &'a str, marker: &str) -> Result<&'a str, ResolveError> {
    let start = path.find(marker).ok_or(ResolveError::NoTenantContext)?;
    let rest = &path[start + marker.len()..];

    let segment = rest.split('/').next().unwrap_or_default();
    let tenant = segment.split('?').next().unwrap_or_default();

    Ok(tenant)
}

/// The path component of a request target, without any query string.
///
/// Query strings may carry credentials, so this is what gets logged.
#[must_use]
pub fn strip_query(path: &str) -> &str {
    path.split_once('?').map_or(path, |(path, _)| path)
}

/// Normalize a configured marker into the literal matched against paths.
///
/// The result always starts and ends with `/`, so `tenants` and `/tenants`
/// both become `/tenants/` and never match a longer segment like `/tenantsx`.
#[must_use]
pub fn normalize_marker(marker: &str) -> String {
    let trimmed = marker.trim();
    let mut normalized = String::with_capacity(trimmed.len() + 2);
    if !trimmed.starts_with('/') {
        normalized.push('/');
    }
    normalized.push_str(trimmed);
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// Extracts tenants using a fixed, normalized marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExtractor {
    marker: String,
}

impl PathExtractor {
    /// Create an extractor for the given marker. See `normalize_marker`.
    #[must_use]
    pub fn new(marker: &str) -> Self {
        Self {
            marker: normalize_marker(marker),
        }
    }

    /// The normalized marker this extractor matches.
    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Extract the tenant identifier from `path`.
    ///
    /// # Errors
    /// Returns `ResolveError::NoTenantContext` if the marker is absent.
    pub fn extract<'a>(&self, path: &'a str) -> Result<&'a str, ResolveError> {
        extract_tenant(path, &self.marker)
    }
}

/// Error returned when validating a tenant identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantIdError {
    /// The identifier is empty.
    Empty,
    /// The identifier exceeds `MAX_TENANT_ID_LENGTH`.
    TooLong,
    /// The identifier contains characters outside `[A-Za-z0-9._-]`.
    InvalidCharacters,
    /// The identifier is `.` or `..`.
    Reserved,
}

impl std::fmt::Display for TenantIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "tenant identifier must not be empty"),
            Self::TooLong => write!(
                f,
                "tenant identifier exceeds maximum length of {MAX_TENANT_ID_LENGTH} bytes"
            ),
            Self::InvalidCharacters => write!(
                f,
                "tenant identifier contains invalid characters; only alphanumeric, '.', '-' and '_' are allowed"
            ),
            Self::Reserved => write!(f, "tenant identifier must not be '.' or '..'"),
        }
    }
}

impl std::error::Error for TenantIdError {}

/// Validate that a tenant identifier is well-formed.
///
/// Identifiers are case-sensitive. Restricting the alphabet keeps
/// identifiers safe to use as file names in file-backed record stores.
///
/// # Errors
/// Returns the first rule the identifier breaks.
pub fn validate_tenant_id(tenant: &str) -> Result<(), TenantIdError> {
    if tenant.is_empty() {
        return Err(TenantIdError::Empty);
    }

    if tenant.len() > MAX_TENANT_ID_LENGTH {
        return Err(TenantIdError::TooLong);
    }

    if !tenant
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(TenantIdError::InvalidCharacters);
    }

    if tenant == "." || tenant == ".." {
        return Err(TenantIdError::Reserved);
    }

    Ok(())
}
