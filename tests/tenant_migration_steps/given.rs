//! Given steps for tenant migration BDD scenarios.

use super::world::{TenantWorld, host_for, parse_slug};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use tenancy::tenancy::{
    adapters::memory::InjectedFailure,
    domain::{TenantDatabaseRecord, TenantId, TenantSummary},
    ports::CredentialCodec,
};

fn summary(name: &str) -> Result<TenantSummary, eyre::Report> {
    Ok(TenantSummary::new(
        TenantId::new(),
        parse_slug(name)?,
        name.to_uppercase(),
        true,
    ))
}

#[given(r#"a tenant "{name}" with a database"#)]
fn tenant_with_database(world: &mut TenantWorld, name: String) -> Result<(), eyre::Report> {
    let host = host_for(&name);
    let credentials = world
        .codec
        .seal_credentials(&format!("{name}_db"), "tenant_app", "s3cret", None)
        .wrap_err("seal scenario credentials")?;
    let record = TenantDatabaseRecord::new(host, 5432, credentials);
    world
        .directory
        .insert(summary(&name)?, Some(record.clone()))
        .wrap_err("seed tenant with database")?;
    world.records.insert(name, record);
    Ok(())
}

#[given(r#"a tenant "{name}" without a database"#)]
fn tenant_without_database(world: &mut TenantWorld, name: String) -> Result<(), eyre::Report> {
    world
        .directory
        .insert(summary(&name)?, None)
        .wrap_err("seed tenant without database")?;
    Ok(())
}

#[given(r#"the database of "{name}" refuses connections"#)]
fn database_refuses_connections(world: &mut TenantWorld, name: String) {
    world
        .driver
        .fail_host(host_for(&name), InjectedFailure::Handshake);
}
