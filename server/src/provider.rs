//! Tenant record stores.
//!
//! A `ConfigProvider` maps a tenant identifier to the single raw record that
//! describes it. Stores enforce the "exactly one match" policy: zero matches
//! and ambiguous matches are both reported as failures.
//!
//! # Pre-conditions
//! - Tenant identifiers passed to `fetch` have been validated with
//!   `validate_tenant_id`. `DirectoryProvider` re-checks this before touching
//!   the filesystem.
//!
//! # Invariants
//! - `fetch` never returns a record for a different tenant.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::tenant_path::validate_tenant_id;

/// Raw configuration for one tenant, as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantRecord {
    /// The tenant (realm) this record belongs to.
    pub tenant: String,
    /// The serialized adapter document, as stored. Decoding is left to the builder.
    pub payload: Vec<u8>,
}

impl TenantRecord {
    /// Create a record for `tenant` with the given payload.
    #[must_use]
    pub fn new(tenant: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            tenant: tenant.into(),
            payload: payload.into(),
        }
    }
}

/// Error returned when a record store cannot produce a unique record.
#[derive(Debug)]
pub enum ProviderError {
    /// No record exists for the tenant.
    NotFound,
    /// More than one record matches the tenant.
    Ambiguous(usize),
    /// The store could not be read.
    Unavailable(std::io::Error),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "no record found"),
            Self::Ambiguous(count) => {
                write!(f, "{count} records match; expected exactly one")
            }
            Self::Unavailable(e) => write!(f, "record store unavailable: {e}"),
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Unavailable(e) => Some(e),
            Self::NotFound | Self::Ambiguous(_) => None,
        }
    }
}

/// Source of raw tenant records.
///
/// Implementations are shared across request handlers and must be safe to call
/// from many threads at once.
pub trait ConfigProvider: Send + Sync {
    /// Fetch the one record stored for `tenant`.
    ///
    /// # Errors
    /// Returns `ProviderError::NotFound` or `ProviderError::Ambiguous` when the
    /// store does not hold exactly one record for `tenant`, and
    /// `ProviderError::Unavailable` when the store cannot be read.
    fn fetch(&self, tenant: &str) -> Result<TenantRecord, ProviderError>;
}

/// A record table held in memory.
///
/// The table permits several records for the same tenant, mirroring a
/// relational table without a uniqueness constraint; such tenants are
/// reported as ambiguous.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    records: RwLock<Vec<TenantRecord>>,
}

impl InMemoryProvider {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table holding `records`.
    #[must_use]
    pub fn with_records(records: Vec<TenantRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Append a record. Existing records for the same tenant are kept.
    pub fn insert(&self, record: TenantRecord) {
        if let Ok(mut records) = self.records.write() {
            records.push(record);
        }
    }

    /// Replace every record for `record.tenant` with `record`.
    pub fn upsert(&self, record: TenantRecord) {
        if let Ok(mut records) = self.records.write() {
            records.retain(|existing| existing.tenant != record.tenant);
            records.push(record);
        }
    }
}

impl ConfigProvider for InMemoryProvider {
    fn fetch(&self, tenant: &str) -> Result<TenantRecord, ProviderError> {
        let records = self.records.read().map_err(|_| {
            ProviderError::Unavailable(std::io::Error::other("record table lock poisoned"))
        })?;

        let mut matches = records.iter().filter(|record| record.tenant == tenant);
        let first = matches.next().ok_or(ProviderError::NotFound)?;
        let extra = matches.count();
        if extra > 0 {
            return Err(ProviderError::Ambiguous(extra + 1));
        }

        Ok(first.clone())
    }
}

/// A directory with one `<tenant>.json` file per tenant.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    directory: PathBuf,
}

impl DirectoryProvider {
    /// Create a provider reading from `directory`.
    ///
    /// The directory does not need to exist yet; missing files are reported
    /// as `NotFound`.
    #[must_use]
    pub const fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    /// The directory records are read from.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the record file for `tenant`.
    #[must_use]
    pub fn record_path(&self, tenant: &str) -> PathBuf {
        self.directory.join(format!("{tenant}.json"))
    }
}

impl ConfigProvider for DirectoryProvider {
    fn fetch(&self, tenant: &str) -> Result<TenantRecord, ProviderError> {
        // Never build a path from an unchecked identifier.
        if validate_tenant_id(tenant).is_err() {
            return Err(ProviderError::NotFound);
        }

        let path = self.record_path(tenant);
        match std::fs::read(&path) {
            Ok(payload) => Ok(TenantRecord::new(tenant, payload)),
            Err(e) if e.kind() == IoErrorKind::NotFound => Err(ProviderError::NotFound),
            Err(e) => {
                tracing::warn!("Failed to read tenant record {}: {e}", path.display());
                Err(ProviderError::Unavailable(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_fetch_single_match() {
        let provider = InMemoryProvider::with_records(vec![
            TenantRecord::new("acme", r#"{"realm":"acme"}"#),
            TenantRecord::new("globex", r#"{"realm":"globex"}"#),
        ]);

        let record = provider.fetch("acme").expect("acme is stored");
        assert_eq!(record, TenantRecord::new("acme", r#"{"realm":"acme"}"#));
    }

    #[test]
    fn test_in_memory_fetch_missing() {
        let provider = InMemoryProvider::new();
        assert!(matches!(provider.fetch("acme"), Err(ProviderError::NotFound)));
    }

    #[test]
    fn test_in_memory_fetch_is_case_sensitive() {
        let provider = InMemoryProvider::with_records(vec![TenantRecord::new("acme", "{}")]);
        assert!(matches!(provider.fetch("ACME"), Err(ProviderError::NotFound)));
    }

    #[test]
    fn test_in_memory_fetch_ambiguous() {
        let provider = InMemoryProvider::new();
        provider.insert(TenantRecord::new("acme", "{}"));
        provider.insert(TenantRecord::new("acme", "{}"));
        provider.insert(TenantRecord::new("acme", "{}"));

        assert!(matches!(provider.fetch("acme"), Err(ProviderError::Ambiguous(3))));
    }

    #[test]
    fn test_in_memory_upsert_resolves_ambiguity() {
        let provider = InMemoryProvider::new();
        provider.insert(TenantRecord::new("acme", "old"));
        provider.insert(TenantRecord::new("acme", "older"));
        provider.upsert(TenantRecord::new("acme", "new"));

        let record = provider.fetch("acme").expect("single record after upsert");
        assert_eq!(record.payload, b"new");
    }

    #[test]
    fn test_directory_fetch_reads_file() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let provider = DirectoryProvider::new(temp_dir.path().to_path_buf());
        std::fs::write(provider.record_path("acme"), r#"{"realm":"acme"}"#)
            .expect("write record");

        let record = provider.fetch("acme").expect("record file exists");
        assert_eq!(record.tenant, "acme");
        assert_eq!(record.payload, br#"{"realm":"acme"}"#);
    }

    #[test]
    fn test_directory_fetch_missing_file() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let provider = DirectoryProvider::new(temp_dir.path().to_path_buf());

        assert!(matches!(provider.fetch("acme"), Err(ProviderError::NotFound)));
    }

    #[test]
    fn test_directory_fetch_missing_directory() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let provider = DirectoryProvider::new(temp_dir.path().join("does-not-exist"));

        assert!(matches!(provider.fetch("acme"), Err(ProviderError::NotFound)));
    }

    #[test]
    fn test_directory_fetch_rejects_traversal() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let nested = temp_dir.path().join("records");
        std::fs::create_dir_all(&nested).expect("create records dir");
        std::fs::write(temp_dir.path().join("secret.json"), "{}").expect("write outside file");

        let provider = DirectoryProvider::new(nested);
        assert!(matches!(
            provider.fetch("../secret"),
            Err(ProviderError::NotFound)
        ));
    }

    #[test]
    fn test_directory_fetch_unreadable_entry() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let provider = DirectoryProvider::new(temp_dir.path().to_path_buf());
        // A directory where the record file should be cannot be read.
        std::fs::create_dir_all(provider.record_path("acme")).expect("create dir");

        assert!(matches!(
            provider.fetch("acme"),
            Err(ProviderError::Unavailable(_))
        ));
    }

    #[test]
    fn test_directory_fetch_keeps_non_utf8_bytes() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let provider = DirectoryProvider::new(temp_dir.path().to_path_buf());
        std::fs::write(provider.record_path("acme"), [0xff, 0xfe, b'{', b'}'])
            .expect("write record");

        // The record exists; whether it is usable is for the builder to decide.
        let record = provider.fetch("acme").expect("record file exists");
        assert_eq!(record.payload, vec![0xff, 0xfe, b'{', b'}']);
    }

    #[test]
    fn test_provider_error_display() {
        assert_eq!(ProviderError::NotFound.to_string(), "no record found");
        assert_eq!(
            ProviderError::Ambiguous(2).to_string(),
            "2 records match; expected exactly one"
        );
        let unavailable = ProviderError::Unavailable(std::io::Error::other("disk gone"));
        assert!(unavailable.to_string().contains("disk gone"));
    }
}
