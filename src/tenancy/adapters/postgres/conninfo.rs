//! libpq keyword/value connection strings for tenant databases.

use crate::tenancy::domain::ConnectionSettings;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Quotes a value for a libpq keyword/value connection string.
///
/// The value is wrapped in single quotes with backslashes and single quotes
/// escaped, so any byte sequence survives the round trip through libpq.
#[must_use]
pub fn quote_conninfo_value(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        if matches!(ch, '\'' | '\\') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('\'');
    quoted
}

/// Transport security for a tenant connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode<'a> {
    /// Plain TCP.
    Disabled,
    /// TLS verified against the CA file at the given path.
    VerifyCa(&'a str),
}

/// Renders the connection string for one tenant database.
///
/// The result embeds the password and is therefore kept secret.
#[must_use]
pub fn render_conninfo(
    settings: &ConnectionSettings,
    tls: TlsMode<'_>,
    schema: &str,
    connect_timeout: Duration,
) -> SecretString {
    let timeout_secs = connect_timeout.as_secs().max(2).to_string();
    let search_path = format!("-c search_path={schema}");
    let port = settings.port().to_string();

    let mut pairs: Vec<(&str, &str)> = vec![
        ("host", settings.host()),
        ("port", &port),
        ("dbname", settings.database_name()),
        ("user", settings.username()),
        ("password", settings.password().expose_secret()),
        ("connect_timeout", &timeout_secs),
        ("options", &search_path),
        ("application_name", "tenancy"),
    ];
    match tls {
        TlsMode::Disabled => pairs.push(("sslmode", "disable")),
        TlsMode::VerifyCa(root_cert) => {
            pairs.push(("sslmode", "verify-ca"));
            pairs.push(("sslrootcert", root_cert));
        }
    }

    let rendered = pairs
        .into_iter()
        .map(|(key, value)| format!("{key}={}", quote_conninfo_value(value)))
        .collect::<Vec<_>>()
        .join(" ");
    SecretString::from(rendered)
}
