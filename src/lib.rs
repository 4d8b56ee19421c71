//! Tenancy: per-tenant database connection routing and schema migration.
//!
//! A single control-plane database records where every tenant database
//! lives and how to reach it, with credentials encrypted at rest. This
//! crate turns a tenant slug into a live connection, keeps at most one such
//! connection per tenant, closes it after a period of inactivity, and
//! applies schema migrations to tenant databases on demand or in bulk at
//! startup.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: tenants, encrypted records, and decrypted settings
//! - **Ports**: directory, credential codec, and database driver traits
//! - **Adapters**: `PostgreSQL`, AES-GCM, and in-memory implementations
//!
//! # Modules
//!
//! - [`tenancy`]: routing, caching, and migration of tenant databases
//! - [`config`]: environment-driven settings
//! - [`telemetry`]: tracing bootstrap for binaries

pub mod config;
pub mod telemetry;
pub mod tenancy;
