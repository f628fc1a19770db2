//! Errors surfaced by tenant resolution.
//!
//! # Invariants
//! - Every failure is terminal for the resolution attempt that produced it.
//! - Failures are never cached; the next attempt for the same tenant repeats
//!   the full fetch and build.

use crate::auth::BuildError;
use crate::provider::ProviderError;
use crate::tenant_path::TenantIdError;

/// Stable tag for each failure class, independent of the error's details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request path carries no tenant marker.
    NoTenantContext,
    /// The extracted tenant identifier is empty or structurally invalid.
    InvalidTenant,
    /// No unique persisted record exists for the tenant.
    TenantUnknown,
    /// A record was found but could not be materialized.
    BuildFailed,
}

impl ErrorKind {
    /// Machine-readable name of the kind, used in response bodies.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoTenantContext => "no_tenant_context",
            Self::InvalidTenant => "invalid_tenant",
            Self::TenantUnknown => "tenant_unknown",
            Self::BuildFailed => "build_failed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a request cannot be mapped to a realm deployment.
#[derive(Debug)]
pub enum ResolveError {
    /// The request path does not contain the configured tenant marker.
    NoTenantContext,
    /// The tenant identifier failed validation.
    InvalidTenant {
        /// The rejected identifier, verbatim.
        tenant: String,
        /// Why it was rejected.
        reason: TenantIdError,
    },
    /// The record store has zero or several records for the tenant.
    TenantUnknown {
        /// The tenant that was looked up.
        tenant: String,
        /// What the record store reported.
        source: ProviderError,
    },
    /// The tenant's record could not be turned into a deployment.
    BuildFailed {
        /// The tenant whose record failed to build.
        tenant: String,
        /// What the builder reported.
        source: BuildError,
    },
}

impl ResolveError {
    /// The failure class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NoTenantContext => ErrorKind::NoTenantContext,
            Self::InvalidTenant { .. } => ErrorKind::InvalidTenant,
            Self::TenantUnknown { .. } => ErrorKind::TenantUnknown,
            Self::BuildFailed { .. } => ErrorKind::BuildFailed,
        }
    }
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoTenantContext => write!(f, "request path carries no tenant context"),
            Self::InvalidTenant { tenant, reason } => {
                write!(f, "invalid tenant '{tenant}': {reason}")
            }
            Self::TenantUnknown { tenant, source } => {
                write!(f, "unknown tenant '{tenant}': {source}")
            }
            Self::BuildFailed { tenant, source } => {
                write!(f, "failed to build deployment for tenant '{tenant}': {source}")
            }
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NoTenantContext => None,
            Self::InvalidTenant { reason, .. } => Some(reason),
            Self::TenantUnknown { source, .. } => Some(source),
            Self::BuildFailed { source, .. } => Some(source),
        }
    }
}
