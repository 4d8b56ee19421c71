//! Unit tests for the tenancy module.
//!
//! Tests are organised by layer: domain values, the credential codec, the
//! connection factory, the registry cache, and migration orchestration.
