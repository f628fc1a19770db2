//! Realm deployments and how they are built.
//!
//! A deployment describes the authentication server a tenant's requests are
//! checked against. Deployments are built once per tenant from the tenant's
//! adapter document and shared read-only afterwards.
//!
//! # Invariants
//! - A `RealmDeployment` is immutable once built.
//! - Every deployment names a non-empty realm.

pub mod builder;
pub mod deployment;

pub use builder::{BuildError, ConfigBuilder, JsonDeploymentBuilder};
pub use deployment::{RealmDeployment, SslRequired};
