//! Common helpers for end-to-end tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use crate::RealmRegistry;
use crate::auth::{BuildError, ConfigBuilder, JsonDeploymentBuilder, RealmDeployment};
use crate::provider::{ConfigProvider, InMemoryProvider, ProviderError, TenantRecord};
use crate::tenant_path::PathExtractor;

/// In-memory provider that records every fetch.
///
/// When a gate is set, every fetch waits on it, which forces that many
/// callers to be inside `fetch` at the same time.
pub struct CountingProvider {
    pub records: InMemoryProvider,
    fetches: Mutex<HashMap<String, usize>>,
    gate: Option<Barrier>,
}

impl CountingProvider {
    pub fn new(records: Vec<TenantRecord>, gate: Option<Barrier>) -> Self {
        Self {
            records: InMemoryProvider::with_records(records),
            fetches: Mutex::new(HashMap::new()),
            gate,
        }
    }

    /// Number of fetches issued for `tenant`.
    pub fn fetch_count(&self, tenant: &str) -> usize {
        #[allow(clippy::expect_used)]
        let fetches = self.fetches.lock().expect("fetch counter lock");
        fetches.get(tenant).copied().unwrap_or(0)
    }

    /// Number of fetches issued for all tenants.
    pub fn total_fetches(&self) -> usize {
        #[allow(clippy::expect_used)]
        let fetches = self.fetches.lock().expect("fetch counter lock");
        fetches.values().sum()
    }
}

impl ConfigProvider for CountingProvider {
    fn fetch(&self, tenant: &str) -> Result<TenantRecord, ProviderError> {
        {
            #[allow(clippy::expect_used)]
            let mut fetches = self.fetches.lock().expect("fetch counter lock");
            *fetches.entry(tenant.to_string()).or_insert(0) += 1;
        }
        if let Some(gate) = &self.gate {
            gate.wait();
        }
        self.records.fetch(tenant)
    }
}

/// JSON builder that counts builds.
#[derive(Default)]
pub struct CountingBuilder {
    builds: AtomicUsize,
}

impl CountingBuilder {
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl ConfigBuilder for CountingBuilder {
    fn build(&self, record: &TenantRecord) -> Result<RealmDeployment, BuildError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        JsonDeploymentBuilder::new().build(record)
    }
}

/// A registry wired to counting collaborators.
pub struct TestRegistry {
    pub registry: Arc<RealmRegistry>,
    pub provider: Arc<CountingProvider>,
    pub builder: Arc<CountingBuilder>,
}

impl TestRegistry {
    /// Create a registry serving `records` under `marker`.
    #[must_use]
    pub fn new(marker: &str, records: Vec<TenantRecord>) -> Self {
        Self::build(marker, CountingProvider::new(records, None))
    }

    /// Create a registry whose provider blocks until `parties` fetches are in flight.
    #[must_use]
    pub fn gated(marker: &str, records: Vec<TenantRecord>, parties: usize) -> Self {
        Self::build(
            marker,
            CountingProvider::new(records, Some(Barrier::new(parties))),
        )
    }

    #[allow(clippy::disallowed_methods)] // Arc::clone is safe and expected
    fn build(marker: &str, provider: CountingProvider) -> Self {
        let provider = Arc::new(provider);
        let builder = Arc::new(CountingBuilder::default());

        let dyn_provider: Arc<dyn ConfigProvider> = Arc::clone(&provider) as _;
        let dyn_builder: Arc<dyn ConfigBuilder> = Arc::clone(&builder) as _;
        let registry = Arc::new(RealmRegistry::new(
            PathExtractor::new(marker),
            dyn_provider,
            dyn_builder,
        ));

        Self {
            registry,
            provider,
            builder,
        }
    }
}

/// A record whose payload is the minimal adapter document for `realm`.
#[must_use]
pub fn realm_record(realm: &str) -> TenantRecord {
    TenantRecord::new(realm, format!(r#"{{"realm":"{realm}"}}"#))
}
