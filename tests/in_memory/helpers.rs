//! Shared test helpers for in-memory tenancy integration tests.

use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use secrecy::SecretString;
use tenancy::tenancy::{
    adapters::{
        AesGcmCredentialCodec,
        memory::{InMemoryTenantDirectory, InMemoryTenantDriver},
    },
    domain::{TenantDatabaseRecord, TenantId, TenantSlug, TenantSummary},
    ports::CredentialCodec,
    runtime::TenancyRuntime,
    services::DEFAULT_IDLE_TIMEOUT,
};

/// Tenant schema versions known to the fake driver.
pub const TENANT_MIGRATIONS: [&str; 2] = ["20241212000000", "20250301000000"];

/// Certificate used by tenants that require TLS.
pub const TEST_CA: &str = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";

/// Runtime wired over the in-memory adapters.
pub type MemoryRuntime = TenancyRuntime<
    InMemoryTenantDirectory,
    AesGcmCredentialCodec,
    InMemoryTenantDriver,
    DefaultClock,
>;

/// In-memory deployment: control plane, driver, codec and the runtime.
pub struct Deployment {
    /// Control-plane stand-in.
    pub directory: Arc<InMemoryTenantDirectory>,
    /// Scriptable tenant database driver.
    pub driver: Arc<InMemoryTenantDriver>,
    /// Codec used to seal seeded credentials.
    pub codec: Arc<AesGcmCredentialCodec>,
    /// Runtime under test.
    pub runtime: MemoryRuntime,
}

impl Deployment {
    /// Seeds a tenant whose database lives at [`host_for`]`(name)`.
    pub fn seed(&self, name: &str) -> TenantDatabaseRecord {
        self.seed_with_certificate(name, None)
    }

    /// Seeds a tenant, optionally pinning a CA certificate.
    pub fn seed_with_certificate(
        &self,
        name: &str,
        certificate: Option<&str>,
    ) -> TenantDatabaseRecord {
        let credentials = self
            .codec
            .seal_credentials(&format!("{name}_db"), "tenant_app", "s3cret", certificate)
            .expect("sealing should succeed");
        let record = TenantDatabaseRecord::new(host_for(name), 5432, credentials);
        self.directory
            .insert(summary(name), Some(record.clone()))
            .expect("seeding should succeed");
        record
    }

    /// Seeds a tenant that has no database attached.
    pub fn seed_without_database(&self, name: &str) {
        self.directory
            .insert(summary(name), None)
            .expect("seeding should succeed");
    }

    /// Reloads a record from the control plane.
    pub fn reload(&self, record: &TenantDatabaseRecord) -> TenantDatabaseRecord {
        self.directory
            .find_record(record.id())
            .expect("lookup should succeed")
            .expect("record should exist")
    }
}

/// Provides a fresh deployment with the default idle window.
#[fixture]
pub fn deployment() -> Deployment {
    let directory = Arc::new(InMemoryTenantDirectory::new());
    let driver = Arc::new(InMemoryTenantDriver::new());
    driver.set_migrations(TENANT_MIGRATIONS);
    let codec = Arc::new(
        AesGcmCredentialCodec::new(&SecretString::from("integration key".to_owned()))
            .expect("key should be accepted"),
    );
    let runtime = TenancyRuntime::from_parts(
        Arc::clone(&directory),
        Arc::clone(&codec),
        Arc::clone(&driver),
        Arc::new(DefaultClock),
        DEFAULT_IDLE_TIMEOUT,
    );
    Deployment {
        directory,
        driver,
        codec,
        runtime,
    }
}

/// Parses a slug, panicking on invalid test input.
pub fn slug(value: &str) -> TenantSlug {
    TenantSlug::new(value).expect("valid slug")
}

/// Hostname used for the database of tenant `name`.
pub fn host_for(name: &str) -> String {
    format!("{name}.db.internal")
}

fn summary(name: &str) -> TenantSummary {
    TenantSummary::new(TenantId::new(), slug(name), name.to_uppercase(), true)
}
