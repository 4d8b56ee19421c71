//! Diesel row models for the control-plane tenant tables.

use super::schema::{tenant_databases, tenants};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for tenants.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tenants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TenantRow {
    /// Internal tenant identifier.
    pub id: uuid::Uuid,
    /// Display name.
    pub name: String,
    /// Unique routing key.
    pub slug: String,
    /// Whether the tenant accepts traffic.
    pub is_enabled: bool,
    /// Attached database record, if any.
    pub tenant_database_id: Option<uuid::Uuid>,
}

/// Tenant database columns that are safe to read without credentials.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tenant_databases)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DatabaseLocationRow {
    /// Internal record identifier.
    pub id: uuid::Uuid,
    /// Plaintext host.
    pub host: String,
    /// Plaintext port.
    pub port: i32,
    /// Last successful migration run.
    pub migrated_at: Option<DateTime<Utc>>,
}

/// Tenant database row including the encrypted credential columns.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tenant_databases)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DatabaseCredentialRow {
    /// Internal record identifier.
    pub id: uuid::Uuid,
    /// Plaintext host.
    pub host: String,
    /// Plaintext port.
    pub port: i32,
    /// Encrypted database name.
    pub database: String,
    /// Encrypted login role.
    pub username: String,
    /// Encrypted login password.
    pub password: String,
    /// Encrypted TLS CA material.
    pub certificate: Option<String>,
    /// Last successful migration run.
    pub migrated_at: Option<DateTime<Utc>>,
}
