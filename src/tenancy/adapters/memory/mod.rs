//! In-memory adapters for tests and local development.

mod directory;
mod driver;

pub use directory::InMemoryTenantDirectory;
pub use driver::{InMemoryTenantConnection, InMemoryTenantDriver, InjectedFailure, OpenedDatabase};
