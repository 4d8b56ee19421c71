//! Control-plane reads and migration stamps against a real database.

use super::helpers::{
    CleanupGuard, SEALED_DATABASE, SEALED_PASSWORD, SEALED_USERNAME, TENANT_TEMPLATE_DB,
    ensure_template, ensure_tenant_template, insert_tenant, setup_directory, test_runtime,
};
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use pg_embedded_setup_unpriv::TestCluster;
use pg_embedded_setup_unpriv::test_support::shared_test_cluster;
use rstest::rstest;
use tenancy::tenancy::{
    adapters::postgres::PostgresTenantDirectory,
    domain::{CredentialSelection, TenantDatabaseId, TenantSlug},
    ports::{TenantDirectory, TenantDirectoryError},
};

fn slug(value: &str) -> TenantSlug {
    TenantSlug::new(value).expect("valid slug")
}

fn migration_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_740_830_400, 0).expect("valid timestamp")
}

#[rstest]
fn included_selection_reads_the_sealed_columns(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_include_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let directory = setup_directory(shared_test_cluster, &db_name).expect("directory setup");
    let database_id = insert_tenant(shared_test_cluster, &db_name, "acme", Some("acme.db"))
        .expect("seed tenant")
        .expect("database row");

    let rt = test_runtime();
    let entry = rt
        .block_on(directory.find_by_slug(&slug("acme"), CredentialSelection::Include))
        .expect("lookup should succeed")
        .expect("tenant should exist");

    assert_eq!(entry.tenant.slug().as_str(), "acme");
    assert!(entry.tenant.is_enabled());
    let record = entry.database.expect("database should be attached");
    assert_eq!(record.id().into_inner(), database_id);
    assert_eq!(record.host(), "acme.db");
    assert_eq!(record.port(), 5432);
    assert!(record.migrated_at().is_none());
    let credentials = record.credentials().expect("credentials should be selected");
    assert_eq!(credentials.database_name.as_str(), SEALED_DATABASE);
    assert_eq!(credentials.username.as_str(), SEALED_USERNAME);
    assert_eq!(credentials.password.as_str(), SEALED_PASSWORD);
    assert!(credentials.certificate.is_none());
}

#[rstest]
fn omitted_selection_leaves_ciphertext_unread(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_omit_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let directory = setup_directory(shared_test_cluster, &db_name).expect("directory setup");
    insert_tenant(shared_test_cluster, &db_name, "acme", Some("acme.db")).expect("seed tenant");

    let rt = test_runtime();
    let entry = rt
        .block_on(directory.find_by_slug(&slug("acme"), CredentialSelection::Omit))
        .expect("lookup should succeed")
        .expect("tenant should exist");
    let record = entry.database.expect("database should be attached");

    assert!(record.credentials().is_none());
    assert_eq!(record.host(), "acme.db");
}

#[rstest]
fn lookups_distinguish_missing_tenants_from_missing_databases(
    shared_test_cluster: &'static TestCluster,
) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_missing_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let directory = setup_directory(shared_test_cluster, &db_name).expect("directory setup");
    insert_tenant(shared_test_cluster, &db_name, "acme", None).expect("seed tenant");

    let rt = test_runtime();
    let without_database = rt
        .block_on(directory.find_by_slug(&slug("acme"), CredentialSelection::Include))
        .expect("lookup should succeed")
        .expect("tenant should exist");
    let unknown = rt
        .block_on(directory.find_by_slug(&slug("globex"), CredentialSelection::Include))
        .expect("lookup should succeed");

    assert!(without_database.database.is_none());
    assert!(unknown.is_none());
}

#[rstest]
#[case::omit(CredentialSelection::Omit)]
#[case::include(CredentialSelection::Include)]
fn listing_is_ordered_by_slug(
    shared_test_cluster: &'static TestCluster,
    #[case] selection: CredentialSelection,
) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_listing_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let directory = setup_directory(shared_test_cluster, &db_name).expect("directory setup");
    for (tenant, host) in [
        ("charlie", Some("charlie.db")),
        ("alpha", Some("alpha.db")),
        ("bravo", None),
    ] {
        insert_tenant(shared_test_cluster, &db_name, tenant, host).expect("seed tenant");
    }

    let rt = test_runtime();
    let entries = rt
        .block_on(directory.list_databases(selection))
        .expect("listing should succeed");

    let slugs: Vec<&str> = entries.iter().map(|entry| entry.slug.as_str()).collect();
    assert_eq!(slugs, ["alpha", "charlie"]);
    assert!(
        entries
            .iter()
            .all(|entry| entry.record.credentials().is_some() == selection.includes_credentials())
    );
}

#[rstest]
fn mark_migrated_stamps_the_record(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_mark_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let directory = setup_directory(shared_test_cluster, &db_name).expect("directory setup");
    let database_id = insert_tenant(shared_test_cluster, &db_name, "acme", Some("acme.db"))
        .expect("seed tenant")
        .expect("database row");

    let rt = test_runtime();
    rt.block_on(directory.mark_migrated(TenantDatabaseId::from_uuid(database_id), migration_time()))
        .expect("stamp should succeed");
    let entry = rt
        .block_on(directory.find_by_slug(&slug("acme"), CredentialSelection::Omit))
        .expect("lookup should succeed")
        .expect("tenant should exist");

    let record = entry.database.expect("database should be attached");
    assert_eq!(record.migrated_at(), Some(migration_time()));
}

#[rstest]
fn mark_migrated_reports_unknown_records(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_mark_missing_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let directory = setup_directory(shared_test_cluster, &db_name).expect("directory setup");
    let missing = TenantDatabaseId::new();

    let rt = test_runtime();
    let result = rt.block_on(directory.mark_migrated(missing, migration_time()));

    assert!(matches!(result, Err(TenantDirectoryError::NotFound(id)) if id == missing));
}

#[rstest]
#[case::dotted("acme.corp")]
#[case::uppercase("Acme")]
#[case::blank("")]
fn slug_constraint_rejects_unroutable_slugs(
    shared_test_cluster: &'static TestCluster,
    #[case] raw_slug: &str,
) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_slug_check_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let _directory = setup_directory(shared_test_cluster, &db_name).expect("directory setup");

    let result = insert_tenant(shared_test_cluster, &db_name, raw_slug, None);

    assert!(result.is_err());
}

#[rstest]
fn control_plane_migrations_are_already_applied_on_the_template(
    shared_test_cluster: &'static TestCluster,
) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_control_plane_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let directory = setup_directory(shared_test_cluster, &db_name).expect("directory setup");

    let rt = test_runtime();
    let applied = rt
        .block_on(directory.apply_control_plane_migrations())
        .expect("migrations should succeed");

    assert!(applied.is_empty());
}

#[rstest]
fn control_plane_migrations_build_the_schema_once(shared_test_cluster: &'static TestCluster) {
    ensure_tenant_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_control_plane_fresh_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    shared_test_cluster
        .create_database_from_template(db_name.as_str(), TENANT_TEMPLATE_DB)
        .expect("database creation");
    let url = shared_test_cluster.connection().database_url(&db_name);
    let pool = Pool::builder()
        .max_size(1)
        .build(ConnectionManager::<PgConnection>::new(url))
        .expect("pool setup");
    let directory = PostgresTenantDirectory::new(pool);

    let rt = test_runtime();
    let first = rt
        .block_on(directory.apply_control_plane_migrations())
        .expect("first run should succeed");
    let second = rt
        .block_on(directory.apply_control_plane_migrations())
        .expect("second run should succeed");
    let listing = rt
        .block_on(directory.list_databases(CredentialSelection::Omit))
        .expect("listing should succeed");

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
    assert!(listing.is_empty());
}
