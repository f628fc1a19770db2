//! Test that failed resolutions leave no trace in the cache.

use crate::e2e_tests::helpers::*;
use crate::error::ErrorKind;
use crate::provider::TenantRecord;

#[test]
fn test_unknown_tenant_is_retried() {
    let test = TestRegistry::new("/tenants", vec![]);

    let err = test.registry.resolve("acme").expect_err("no record yet");
    assert_eq!(err.kind(), ErrorKind::TenantUnknown);
    assert!(test.registry.is_empty());

    test.provider.records.insert(realm_record("acme"));

    let deployment = test.registry.resolve("acme").expect("record now exists");
    assert_eq!(deployment.realm, "acme");
    assert_eq!(test.provider.fetch_count("acme"), 2);
}

#[test]
fn test_ambiguous_tenant_leaves_cache_unchanged() {
    let test = TestRegistry::new(
        "/tenants",
        vec![realm_record("globex"), realm_record("acme"), realm_record("acme")],
    );
    test.registry.resolve("globex").expect("globex resolves");

    let err = test.registry.resolve("acme").expect_err("two records match");

    assert_eq!(err.kind(), ErrorKind::TenantUnknown);
    assert_eq!(test.registry.len(), 1);
    assert!(!test.registry.contains("acme"));
    assert_eq!(test.builder.builds(), 1);
}

#[test]
fn test_build_failure_is_retried() {
    let test = TestRegistry::new("/tenants", vec![TenantRecord::new("acme", "{oops")]);

    for attempt in 1..=3 {
        let err = test.registry.resolve("acme").expect_err("record is malformed");
        assert_eq!(err.kind(), ErrorKind::BuildFailed);
        assert_eq!(test.provider.fetch_count("acme"), attempt);
        assert_eq!(test.builder.builds(), attempt);
    }
    assert!(test.registry.is_empty());

    test.provider.records.upsert(realm_record("acme"));
    let deployment = test.registry.resolve("acme").expect("record fixed");
    assert_eq!(deployment.realm, "acme");
    assert!(test.registry.contains("acme"));
}
