//! Test resolution under parallel callers.

use std::sync::Arc;
use std::thread;

use crate::e2e_tests::helpers::*;

#[test]
fn test_parallel_distinct_tenants() {
    let tenants: Vec<String> = (0..16).map(|i| format!("tenant-{i}")).collect();
    let records = tenants.iter().map(|t| realm_record(t)).collect();
    // Every fetch waits until all tenants are in flight at once.
    let test = TestRegistry::gated("/tenants", records, tenants.len());

    thread::scope(|scope| {
        for tenant in &tenants {
            let registry = &test.registry;
            scope.spawn(move || {
                let path = format!("/app/tenants/{tenant}/home");
                let deployment = registry.resolve_path(&path).expect("tenant resolves");
                assert_eq!(&deployment.realm, tenant);
            });
        }
    });

    assert_eq!(test.registry.len(), tenants.len());
    for tenant in &tenants {
        assert!(test.registry.contains(tenant));
        assert_eq!(test.provider.fetch_count(tenant), 1);
    }
    assert_eq!(test.builder.builds(), tenants.len());
}

#[test]
fn test_parallel_same_tenant_repeatedly() {
    let test = TestRegistry::new("/tenants", vec![realm_record("acme")]);
    let first = test.registry.resolve("acme").expect("warm the cache");

    thread::scope(|scope| {
        for _ in 0..8 {
            let registry = &test.registry;
            let first = &first;
            scope.spawn(move || {
                for _ in 0..100 {
                    let deployment = registry.resolve("acme").expect("cached");
                    assert!(Arc::ptr_eq(first, &deployment));
                }
            });
        }
    });

    assert_eq!(test.provider.fetch_count("acme"), 1);
    assert_eq!(test.builder.builds(), 1);
}

#[test]
fn test_racing_misses_converge_on_one_entry() {
    // Both callers are held inside `fetch` until the other arrives, so both
    // miss the cache and both build.
    let test = TestRegistry::gated("/tenants", vec![realm_record("acme")], 2);

    let (a, b) = thread::scope(|scope| {
        let first = scope.spawn(|| test.registry.resolve("acme"));
        let second = scope.spawn(|| test.registry.resolve("acme"));
        (
            first.join().expect("first caller"),
            second.join().expect("second caller"),
        )
    });

    let a = a.expect("first resolution");
    let b = b.expect("second resolution");

    assert_eq!(test.provider.fetch_count("acme"), 2);
    assert_eq!(test.builder.builds(), 2);
    assert_eq!(test.registry.len(), 1);

    // The first insert wins and both callers return the stored deployment.
    assert!(Arc::ptr_eq(&a, &b));
    let cached = test.registry.resolve("acme").expect("cached");
    assert!(Arc::ptr_eq(&a, &cached));
    assert_eq!(test.provider.fetch_count("acme"), 2);
}
