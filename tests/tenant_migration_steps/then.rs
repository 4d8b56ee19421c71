//! Then steps for tenant migration BDD scenarios.

use super::world::{TenantWorld, parse_slug, run_async};
use rstest_bdd_macros::then;
use tenancy::tenancy::domain::TenantDatabaseRecord;

#[then("{count:usize} tenants were migrated")]
fn tenants_were_migrated(world: &TenantWorld, count: usize) -> Result<(), eyre::Report> {
    let report = world
        .last_report
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing migration report in scenario world"))?;
    if report.succeeded() != count {
        return Err(eyre::eyre!(
            "expected {count} migrated tenants, found {}",
            report.succeeded()
        ));
    }
    Ok(())
}

#[then(r#"tenant "{name}" is reported as failed"#)]
fn tenant_reported_failed(world: &TenantWorld, name: String) -> Result<(), eyre::Report> {
    let report = world
        .last_report
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing migration report in scenario world"))?;
    let failed = report.failed_slugs();
    if !failed.iter().any(|slug| slug.as_str() == name) {
        return Err(eyre::eyre!("expected '{name}' among failures, got {failed:?}"));
    }
    Ok(())
}

#[then(r#"tenant "{name}" has no migration timestamp"#)]
fn tenant_not_stamped(world: &TenantWorld, name: String) -> Result<(), eyre::Report> {
    let stored = stored_record(world, &name)?;
    if let Some(timestamp) = stored.migrated_at() {
        return Err(eyre::eyre!("'{name}' was stamped at {timestamp}"));
    }
    Ok(())
}

#[then(r#"tenant "{name}" has a migration timestamp"#)]
fn tenant_stamped(world: &TenantWorld, name: String) -> Result<(), eyre::Report> {
    let stored = stored_record(world, &name)?;
    if stored.migrated_at().is_none() {
        return Err(eyre::eyre!("'{name}' has no migration timestamp"));
    }
    Ok(())
}

#[then("no tenant connections remain open")]
fn no_connections_open(world: &TenantWorld) -> Result<(), eyre::Report> {
    let live = world.driver.live_count();
    if live != 0 {
        return Err(eyre::eyre!("expected no open connections, found {live}"));
    }
    Ok(())
}

#[then(r#"the request fails with "{message}""#)]
fn request_fails_with(world: &TenantWorld, message: String) -> Result<(), eyre::Report> {
    let error = world
        .last_admin_error
        .as_ref()
        .ok_or_else(|| eyre::eyre!("expected the request to fail"))?;
    if error.to_string() != message {
        return Err(eyre::eyre!("expected '{message}', got '{error}'"));
    }
    Ok(())
}

#[then("every request received the same connection")]
fn same_connection(world: &TenantWorld) -> Result<(), eyre::Report> {
    let first = world
        .handle_ids
        .first()
        .ok_or_else(|| eyre::eyre!("no connection requests were made"))?;
    if world.handle_ids.iter().any(|id| id != first) {
        return Err(eyre::eyre!(
            "requests received different handles: {:?}",
            world.handle_ids
        ));
    }
    Ok(())
}

#[then("{count:usize} connection was opened")]
fn connections_opened(world: &TenantWorld, count: usize) -> Result<(), eyre::Report> {
    let opened = world.driver.opened_count();
    if opened != count {
        return Err(eyre::eyre!("expected {count} opened connections, found {opened}"));
    }
    Ok(())
}

#[then(r#"tenant "{name}" has no cached connection"#)]
fn no_cached_connection(world: &TenantWorld, name: String) -> Result<(), eyre::Report> {
    let slug = parse_slug(&name)?;
    if run_async(world.runtime.registry().is_cached(&slug)) {
        return Err(eyre::eyre!("'{name}' still has a cached connection"));
    }
    Ok(())
}

fn stored_record(world: &TenantWorld, name: &str) -> Result<TenantDatabaseRecord, eyre::Report> {
    let seeded = world.record(name)?;
    world
        .directory
        .find_record(seeded.id())
        .map_err(|err| eyre::eyre!("record lookup failed: {err}"))?
        .ok_or_else(|| eyre::eyre!("record for '{name}' disappeared"))
}
