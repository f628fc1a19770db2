//! Tenant-to-deployment resolution cache.
//!
//! Resolves a tenant identifier to its `RealmDeployment`, fetching the raw
//! record from a `ConfigProvider` and materializing it with a `ConfigBuilder`
//! the first time a tenant is seen. Built deployments are memoized for the
//! lifetime of the registry.
//!
//! # Pre-conditions
//! - The provider and builder are safe to call concurrently.
//!
//! # Post-conditions
//! - A successful resolution leaves the deployment cached; later resolutions
//!   of the same tenant perform no I/O.
//! - A failed resolution leaves the cache unchanged.
//!
//! # Invariants
//! - Cache entries are never partially constructed: values are published as
//!   fully built `Arc<RealmDeployment>`s.
//! - Entries are inserted at most once per tenant and never updated or removed.
//!   A cached deployment reflects the record as it was at first resolution.
//!
//! # Concurrency
//!
//! The cache is a sharded map, so lookups and inserts for unrelated tenants do
//! not contend on a single lock. The lookup, fetch, build and insert sequence
//! is not atomic: two callers that miss on the same unseen tenant at the same
//! time both fetch and build it. The first insert wins and every caller
//! returns the stored deployment.

use std::sync::Arc;

use dashmap::DashMap;

use crate::auth::{ConfigBuilder, RealmDeployment};
use crate::error::ResolveError;
use crate::provider::ConfigProvider;
use crate::tenant_path::{PathExtractor, strip_query, validate_tenant_id};

/// A registry for resolving and caching realm deployments per tenant.
pub struct RealmRegistry {
    /// Cache of built deployments, keyed by tenant identifier.
    cache: DashMap<String, Arc<RealmDeployment>>,
    /// Source of raw tenant records.
    provider: Arc<dyn ConfigProvider>,
    /// Turns raw records into deployments.
    builder: Arc<dyn ConfigBuilder>,
    /// Locates the tenant segment in request paths.
    extractor: PathExtractor,
}

impl RealmRegistry {
    /// Create a registry with an empty cache.
    #[must_use]
    pub fn new(
        extractor: PathExtractor,
        provider: Arc<dyn ConfigProvider>,
        builder: Arc<dyn ConfigBuilder>,
    ) -> Self {
        Self {
            cache: DashMap::new(),
            provider,
            builder,
            extractor,
        }
    }

    /// The extractor used by `resolve_path`.
    #[must_use]
    pub const fn extractor(&self) -> &PathExtractor {
        &self.extractor
    }

    /// Resolve the deployment for the tenant named in a request path.
    ///
    /// `path` is the raw request target and may include a query string.
    ///
    /// # Errors
    /// Returns `ResolveError::NoTenantContext` if the path carries no tenant
    /// marker, otherwise any error `resolve` returns.
    pub fn resolve_path(&self, path: &str) -> Result<Arc<RealmDeployment>, ResolveError> {
        let tenant = self.extractor.extract(path).inspect_err(|_| {
            tracing::debug!(
                "No tenant marker '{}' in path '{}'",
                self.extractor.marker(),
                strip_query(path)
            );
        })?;
        self.resolve(tenant)
    }

    /// Get the deployment for the given tenant.
    ///
    /// First checks the cache; if not found, fetches the tenant's record,
    /// builds it and caches the result.
    ///
    /// # Errors
    /// Returns `ResolveError::InvalidTenant` if `tenant` is empty or malformed.
    /// Returns `ResolveError::TenantUnknown` if the provider has no unique record.
    /// Returns `ResolveError::BuildFailed` if the record cannot be built.
    #[allow(clippy::disallowed_methods)] // Arc::clone is safe and expected
    pub fn resolve(&self, tenant: &str) -> Result<Arc<RealmDeployment>, ResolveError> {
        validate_tenant_id(tenant).map_err(|reason| ResolveError::InvalidTenant {
            tenant: tenant.to_string(),
            reason,
        })?;

        // Fast path: the shard read guard is released before any I/O.
        if let Some(deployment) = self.cache.get(tenant) {
            tracing::debug!("Realm deployment cache hit for tenant '{}'", tenant);
            return Ok(Arc::clone(deployment.value()));
        }

        tracing::debug!("Realm deployment cache miss for tenant '{}'", tenant);

        // Slow path: fetch and build without holding any cache guard.
        let deployment = Arc::new(self.load(tenant)?);

        let stored = Arc::clone(
            self.cache
                .entry(tenant.to_string())
                .or_insert_with(|| Arc::clone(&deployment))
                .value(),
        );

        if Arc::ptr_eq(&stored, &deployment) {
            tracing::info!(
                "Built realm deployment for tenant '{}' (realm '{}')",
                tenant,
                stored.realm
            );
        } else {
            tracing::debug!(
                "Tenant '{}' was built concurrently; using the cached deployment",
                tenant
            );
        }

        Ok(stored)
    }

    /// The cached deployment for the tenant named in `path`, if any.
    ///
    /// Never touches the provider or builder, so it is safe to call from async
    /// code. Returns `None` for paths without a tenant and for tenants not yet
    /// resolved.
    #[must_use]
    #[allow(clippy::disallowed_methods)] // Arc::clone is safe and expected
    pub fn peek_path(&self, path: &str) -> Option<Arc<RealmDeployment>> {
        let tenant = self.extractor.extract(path).ok()?;
        self.cache
            .get(tenant)
            .map(|deployment| Arc::clone(deployment.value()))
    }

    /// Whether a deployment for `tenant` is cached.
    #[must_use]
    pub fn contains(&self, tenant: &str) -> bool {
        self.cache.contains_key(tenant)
    }

    /// Number of cached deployments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Fetch and build the deployment for `tenant`, bypassing the cache.
    fn load(&self, tenant: &str) -> Result<RealmDeployment, ResolveError> {
        let record = self.provider.fetch(tenant).map_err(|source| {
            tracing::warn!("Tenant '{}' could not be resolved: {source}", tenant);
            ResolveError::TenantUnknown {
                tenant: tenant.to_string(),
                source,
            }
        })?;

        self.builder.build(&record).map_err(|source| {
            tracing::warn!("Deployment for tenant '{}' failed to build: {source}", tenant);
            ResolveError::BuildFailed {
                tenant: tenant.to_string(),
                source,
            }
        })
    }
}

impl std::fmt::Debug for RealmRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealmRegistry")
            .field("cached", &self.cache.len())
            .field("extractor", &self.extractor)
            .finish_non_exhaustive()
    }
}
