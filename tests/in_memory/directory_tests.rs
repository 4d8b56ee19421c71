//! Directory reads and migration bookkeeping against the in-memory control plane.

use super::helpers::{Deployment, deployment, slug};
use chrono::Utc;
use rstest::rstest;
use tenancy::tenancy::{
    domain::{CredentialSelection, TenantDatabaseId},
    ports::{TenantDirectory, TenantDirectoryError},
};

#[rstest]
#[tokio::test]
async fn omitted_selection_never_returns_ciphertext(deployment: Deployment) {
    deployment.seed("acme");

    let entry = deployment
        .directory
        .find_by_slug(&slug("acme"), CredentialSelection::Omit)
        .await
        .expect("lookup should succeed")
        .expect("tenant should exist");
    let record = entry.database.expect("database should be attached");

    assert!(record.credentials().is_none());
    assert_eq!(record.host(), "acme.db.internal");
}

#[rstest]
#[tokio::test]
async fn included_selection_returns_sealed_credentials(deployment: Deployment) {
    let seeded = deployment.seed("acme");

    let entry = deployment
        .directory
        .find_by_slug(&slug("acme"), CredentialSelection::Include)
        .await
        .expect("lookup should succeed")
        .expect("tenant should exist");

    assert_eq!(entry.database.as_ref(), Some(&seeded));
}

#[rstest]
#[tokio::test]
async fn tenant_without_database_resolves_with_empty_slot(deployment: Deployment) {
    deployment.seed_without_database("acme");

    let entry = deployment
        .directory
        .find_by_slug(&slug("acme"), CredentialSelection::Include)
        .await
        .expect("lookup should succeed")
        .expect("tenant should exist");

    assert!(entry.database.is_none());
    assert_eq!(entry.tenant.slug().as_str(), "acme");
}

#[rstest]
#[tokio::test]
async fn listing_is_ordered_by_slug_and_skips_tenants_without_database(
    deployment: Deployment,
) {
    deployment.seed("charlie");
    deployment.seed_without_database("bravo");
    deployment.seed("alpha");

    let entries = deployment
        .directory
        .list_databases(CredentialSelection::Omit)
        .await
        .expect("listing should succeed");
    let slugs: Vec<&str> = entries.iter().map(|entry| entry.slug.as_str()).collect();

    assert_eq!(slugs, ["alpha", "charlie"]);
}

#[rstest]
#[tokio::test]
async fn marking_an_unknown_record_reports_not_found(deployment: Deployment) {
    let id = TenantDatabaseId::new();

    let result = deployment.directory.mark_migrated(id, Utc::now()).await;

    assert!(matches!(result, Err(TenantDirectoryError::NotFound(missing)) if missing == id));
}
