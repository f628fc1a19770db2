//! Test resolution backed by a directory of tenant records.

use std::sync::Arc;

use crate::RealmRegistry;
use crate::auth::JsonDeploymentBuilder;
use crate::error::ErrorKind;
use crate::provider::DirectoryProvider;
use crate::tenant_path::PathExtractor;

fn directory_registry(directory: &std::path::Path) -> (RealmRegistry, DirectoryProvider) {
    let provider = DirectoryProvider::new(directory.to_path_buf());
    let registry = RealmRegistry::new(
        PathExtractor::new("/t"),
        Arc::new(provider.clone()),
        Arc::new(JsonDeploymentBuilder::new()),
    );
    (registry, provider)
}

#[test]
fn test_directory_backed_resolution() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let (registry, provider) = directory_registry(temp_dir.path());
    std::fs::write(
        provider.record_path("acme"),
        r#"{"realm":"acme","auth-server-url":"http://localhost:8180/auth","resource":"portal","public-client":true}"#,
    )
    .expect("write record");

    let deployment = registry.resolve_path("/t/acme/index.html").expect("acme");

    assert_eq!(deployment.realm, "acme");
    assert_eq!(deployment.resource.as_deref(), Some("portal"));
    assert!(deployment.public_client);
    assert_eq!(
        deployment.realm_url().as_deref(),
        Some("http://localhost:8180/auth/realms/acme")
    );
}

#[test]
fn test_directory_changes_not_observed_after_caching() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let (registry, provider) = directory_registry(temp_dir.path());
    let path = provider.record_path("acme");
    std::fs::write(&path, r#"{"realm":"acme","resource":"v1"}"#).expect("write record");

    let first = registry.resolve("acme").expect("acme");

    std::fs::write(&path, r#"{"realm":"acme","resource":"v2"}"#).expect("rewrite record");
    std::fs::remove_file(&path).expect("remove record");

    let second = registry.resolve("acme").expect("still cached");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.resource.as_deref(), Some("v1"));
}

#[test]
fn test_directory_missing_record() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let (registry, _provider) = directory_registry(temp_dir.path());

    let err = registry.resolve_path("/t/ghost").expect_err("no record file");
    assert_eq!(err.kind(), ErrorKind::TenantUnknown);
}

#[test]
fn test_directory_non_utf8_record_fails_to_build() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let (registry, provider) = directory_registry(temp_dir.path());
    std::fs::write(provider.record_path("acme"), [0xff, 0xfe, b'{', b'}']).expect("write record");

    // The record exists, so this is a bad document rather than an unknown tenant.
    let err = registry.resolve("acme").expect_err("undecodable record");
    assert_eq!(err.kind(), ErrorKind::BuildFailed);
    assert!(registry.is_empty());
}

#[test]
fn test_directory_traversal_is_invalid_tenant() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let (registry, _provider) = directory_registry(temp_dir.path());

    let err = registry.resolve_path("/t/..%2Fsecret").expect_err("rejected");
    assert_eq!(err.kind(), ErrorKind::InvalidTenant);
}
