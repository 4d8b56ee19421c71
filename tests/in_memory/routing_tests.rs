//! Connection routing through the runtime's registry.

use super::helpers::{Deployment, TEST_CA, deployment, host_for, slug};
use rstest::rstest;
use secrecy::SecretString;
use tenancy::tenancy::{
    adapters::{AesGcmCredentialCodec, memory::OpenedDatabase},
    domain::{TenantDatabaseRecord, TenantId, TenantSummary},
    ports::{CredentialCodec, TenantConnection},
    services::{ConnectionError, RegistryError},
};

#[rstest]
#[tokio::test]
async fn decrypted_settings_reach_the_driver(deployment: Deployment) {
    deployment.seed("acme");

    deployment
        .runtime
        .registry()
        .get_connection(&slug("acme"))
        .await
        .expect("connection should open");

    assert_eq!(
        deployment.driver.opened(),
        vec![OpenedDatabase {
            host: host_for("acme"),
            port: 5432,
            database_name: "acme_db".to_owned(),
            username: "tenant_app".to_owned(),
            uses_tls: false,
        }]
    );
}

#[rstest]
#[tokio::test]
async fn pinned_certificate_enables_tls(deployment: Deployment) {
    deployment.seed_with_certificate("secure", Some(TEST_CA));

    deployment
        .runtime
        .registry()
        .get_connection(&slug("secure"))
        .await
        .expect("connection should open");

    let opened = deployment.driver.opened();
    assert!(opened.iter().all(|database| database.uses_tls));
    assert_eq!(opened.len(), 1);
}

#[rstest]
#[tokio::test]
async fn tenants_are_routed_to_their_own_handles(deployment: Deployment) {
    deployment.seed("alpha");
    deployment.seed("bravo");
    let registry = deployment.runtime.registry();

    let alpha = registry
        .get_connection(&slug("alpha"))
        .await
        .expect("alpha should connect");
    let bravo = registry
        .get_connection(&slug("bravo"))
        .await
        .expect("bravo should connect");
    let alpha_again = registry
        .get_connection(&slug("alpha"))
        .await
        .expect("alpha should be cached");

    assert_ne!(alpha.handle_id(), bravo.handle_id());
    assert_eq!(alpha.handle_id(), alpha_again.handle_id());
    assert_eq!(registry.cached_count().await, 2);
    assert_eq!(deployment.driver.opened_count(), 2);
}

#[rstest]
#[tokio::test]
async fn credentials_sealed_under_another_key_are_rejected(deployment: Deployment) {
    let rotated = AesGcmCredentialCodec::new(&SecretString::from("rotated key".to_owned()))
        .expect("key should be accepted");
    let credentials = rotated
        .seal_credentials("acme_db", "tenant_app", "s3cret", None)
        .expect("sealing should succeed");
    deployment
        .directory
        .insert(
            TenantSummary::new(TenantId::new(), slug("acme"), "ACME", true),
            Some(TenantDatabaseRecord::new(host_for("acme"), 5432, credentials)),
        )
        .expect("seeding should succeed");

    let result = deployment
        .runtime
        .registry()
        .get_connection(&slug("acme"))
        .await;

    assert!(matches!(
        result,
        Err(RegistryError::Connection(ConnectionError::Decrypt(_)))
    ));
    assert_eq!(deployment.driver.opened_count(), 0);
    assert!(!deployment.runtime.registry().is_cached(&slug("acme")).await);
}
