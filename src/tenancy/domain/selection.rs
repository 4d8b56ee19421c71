//! Field selection for directory reads.

/// Whether a directory read materializes encrypted credential columns.
///
/// Encrypted columns are opt-in: unrelated queries use [`Self::Omit`] so
/// secrets are never loaded by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CredentialSelection {
    /// Return host, port and migration state only.
    #[default]
    Omit,
    /// Also return the encrypted credential columns.
    Include,
}

impl CredentialSelection {
    /// Returns `true` when encrypted columns are requested.
    #[must_use]
    pub const fn includes_credentials(self) -> bool {
        matches!(self, Self::Include)
    }
}
