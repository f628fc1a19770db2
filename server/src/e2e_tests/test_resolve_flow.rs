//! Test the path-to-deployment flow and cache reuse.

use std::sync::Arc;

use crate::auth::{ConfigBuilder, JsonDeploymentBuilder};
use crate::e2e_tests::helpers::*;
use crate::error::ErrorKind;
use crate::provider::TenantRecord;

#[test]
fn test_resolve_matches_direct_build() {
    let raw = TenantRecord::new("acme", r#"{"realm":"acme"}"#);
    let test = TestRegistry::new("/t/", vec![raw.clone()]);

    let resolved = test
        .registry
        .resolve_path("/t/acme/protected")
        .expect("acme resolves");
    let built = JsonDeploymentBuilder::new()
        .build(&raw)
        .expect("record builds");

    assert_eq!(*resolved, built);

    let again = test.registry.resolve("acme").expect("acme resolves again");
    assert!(Arc::ptr_eq(&resolved, &again));
}

#[test]
fn test_cached_resolution_does_no_io() {
    let test = TestRegistry::new("/tenants", vec![realm_record("acme")]);

    let first = test.registry.resolve("acme").expect("first resolution");
    assert_eq!(test.provider.fetch_count("acme"), 1);
    assert_eq!(test.builder.builds(), 1);

    for _ in 0..10 {
        let next = test
            .registry
            .resolve_path("/app/tenants/acme/page?x=1")
            .expect("cached resolution");
        assert!(Arc::ptr_eq(&first, &next));
    }

    assert_eq!(test.provider.fetch_count("acme"), 1);
    assert_eq!(test.builder.builds(), 1);
}

#[test]
fn test_tenants_are_isolated() {
    let test = TestRegistry::new(
        "/tenants",
        vec![realm_record("acme"), realm_record("globex")],
    );

    let acme = test.registry.resolve_path("/tenants/acme").expect("acme");
    let globex = test.registry.resolve_path("/tenants/globex").expect("globex");

    assert_eq!(acme.realm, "acme");
    assert_eq!(globex.realm, "globex");
    assert_eq!(test.registry.len(), 2);
}

#[test]
fn test_cached_deployment_ignores_record_changes() {
    let test = TestRegistry::new(
        "/tenants",
        vec![TenantRecord::new("acme", r#"{"realm":"acme","resource":"v1"}"#)],
    );

    let before = test.registry.resolve("acme").expect("acme");
    assert_eq!(before.resource.as_deref(), Some("v1"));

    test.provider
        .records
        .upsert(TenantRecord::new("acme", r#"{"realm":"acme","resource":"v2"}"#));

    let after = test.registry.resolve("acme").expect("acme again");
    assert_eq!(after.resource.as_deref(), Some("v1"));
    assert_eq!(test.provider.fetch_count("acme"), 1);
}

#[test]
fn test_no_tenant_context_skips_collaborators() {
    let test = TestRegistry::new("/tenants", vec![realm_record("acme")]);

    let err = test
        .registry
        .resolve_path("/app/acme/login")
        .expect_err("no marker in path");

    assert_eq!(err.kind(), ErrorKind::NoTenantContext);
    assert_eq!(test.provider.total_fetches(), 0);
    assert_eq!(test.builder.builds(), 0);
}

#[test]
fn test_empty_tenant_skips_collaborators() {
    let test = TestRegistry::new("/tenants", vec![realm_record("acme")]);

    let err = test
        .registry
        .resolve_path("/app/tenants/")
        .expect_err("empty tenant");

    assert_eq!(err.kind(), ErrorKind::InvalidTenant);
    assert_eq!(test.provider.total_fetches(), 0);
    assert!(test.registry.is_empty());
}
