//! Runs tenant schema migrations against the configured control plane.
//!
//! Usage:
//!
//! ```text
//! tenant_migrate [all]
//! tenant_migrate tenant <slug>
//! tenant_migrate test <slug>
//! tenant_migrate control-plane
//! ```
//!
//! `all` (the default) migrates every tenant database in sequence and exits
//! non-zero when any tenant failed. `tenant` migrates one tenant and `test`
//! only verifies that its database accepts a connection. `control-plane`
//! applies the embedded control-plane schema migrations. Settings are read
//! from `TENANCY_*` environment variables.

use std::process::ExitCode;
use tenancy::config::TenancyConfig;
use tenancy::telemetry::init_tracing;
use tenancy::tenancy::{domain::TenantSlug, runtime::PostgresTenancyRuntime};
use tracing::{error, info};

#[derive(Debug)]
enum Command {
    All,
    ControlPlane,
    Tenant(TenantSlug),
    Test(TenantSlug),
}

fn parse_command(mut args: impl Iterator<Item = String>) -> Result<Command, String> {
    let operation = args.next();
    let slug = args
        .next()
        .map(|raw| TenantSlug::new(raw).map_err(|err| err.to_string()))
        .transpose()?;
    if let Some(extra) = args.next() {
        return Err(format!("unexpected argument '{extra}'"));
    }

    match (operation.as_deref(), slug) {
        (None | Some("all"), None) => Ok(Command::All),
        (Some("control-plane"), None) => Ok(Command::ControlPlane),
        (Some("tenant"), Some(tenant)) => Ok(Command::Tenant(tenant)),
        (Some("test"), Some(tenant)) => Ok(Command::Test(tenant)),
        (Some(other), _) => Err(format!(
            "unknown or incomplete operation '{other}'; expected all, control-plane, tenant <slug>, or test <slug>"
        )),
        (None, Some(_)) => Err("missing operation".to_owned()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A subscriber installed by an embedding process is fine to keep.
    let _already_installed = init_tracing("info").is_err();

    let command = match parse_command(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(reason) => {
            error!(%reason, "invalid arguments");
            return ExitCode::from(64);
        }
    };
    let config = match TenancyConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            return ExitCode::from(78);
        }
    };
    let runtime = match PostgresTenancyRuntime::connect(&config).await {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "could not start tenancy runtime");
            return ExitCode::FAILURE;
        }
    };

    let succeeded = match command {
        Command::All => {
            let report = runtime.start().await;
            report.failed() == 0
        }
        Command::ControlPlane => match runtime.directory().apply_control_plane_migrations().await {
            Ok(applied) => {
                info!(applied = applied.len(), "control plane migrated");
                true
            }
            Err(err) => {
                error!(error = %err, "control-plane migration failed");
                false
            }
        },
        Command::Tenant(slug) => match runtime.migrations().migrate_tenant(&slug).await {
            Ok(summary) => {
                info!(
                    tenant = %slug,
                    applied = summary.applied_versions.len(),
                    "tenant migrated"
                );
                true
            }
            Err(err) => {
                error!(tenant = %slug, error = %err, "tenant migration failed");
                false
            }
        },
        Command::Test(slug) => match runtime.migrations().test_connection(&slug).await {
            Ok(()) => true,
            Err(err) => {
                error!(tenant = %slug, error = %err, "tenant connection test failed");
                false
            }
        },
    };

    runtime.shutdown().await;
    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
