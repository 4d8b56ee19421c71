//! Application services for tenant connection routing and migrations.

mod factory;
mod migration;
mod registry;

pub use factory::{ConnectionError, ConnectionFactory};
pub use migration::{
    MigrationReport, TenantAdminError, TenantMigrationError, TenantMigrationOutcome,
    TenantMigrationService, TenantMigrationSummary,
};
pub use registry::{
    DEFAULT_IDLE_TIMEOUT, RegistryError, RegistryResult, TenantConnectionRegistry,
};
