//! `PostgreSQL` adapters for the control plane and tenant databases.

mod conninfo;
mod directory;
mod driver;
mod models;
mod schema;

pub use conninfo::{TlsMode, quote_conninfo_value, render_conninfo};
pub use directory::{
    CONTROL_PLANE_MIGRATIONS, ControlPlanePool, PostgresTenantDirectory,
    run_control_plane_migrations,
};
pub use driver::{PgTenantConnection, PostgresDriverOptions, PostgresTenantDriver, TenantPgPool};
