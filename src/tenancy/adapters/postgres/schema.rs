//! Diesel schema for the control-plane tenant tables.

diesel::table! {
    /// Tenants known to the control plane.
    tenants (id) {
        /// Internal tenant identifier.
        id -> Uuid,
        /// Display name.
        #[max_length = 100]
        name -> Varchar,
        /// Unique routing key.
        #[max_length = 100]
        slug -> Varchar,
        /// Whether the tenant accepts traffic.
        is_enabled -> Bool,
        /// Attached database record, if any.
        tenant_database_id -> Nullable<Uuid>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Encrypted connection records for tenant databases.
    tenant_databases (id) {
        /// Internal record identifier.
        id -> Uuid,
        /// Plaintext host.
        #[max_length = 255]
        host -> Varchar,
        /// Plaintext port.
        port -> Int4,
        /// Encrypted database name.
        database -> Text,
        /// Encrypted login role.
        username -> Text,
        /// Encrypted login password.
        password -> Text,
        /// Encrypted TLS CA material.
        certificate -> Nullable<Text>,
        /// Last successful migration run.
        migrated_at -> Nullable<Timestamptz>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(tenants -> tenant_databases (tenant_database_id));
diesel::allow_tables_to_appear_in_same_query!(tenants, tenant_databases);
