//! Per-tenant database routing.
//!
//! Each tenant owns an independent database whose encrypted connection
//! record lives in a shared control plane. This module resolves tenants to
//! live connections, caches them with idle eviction, and migrates tenant
//! schemas individually or in bulk at startup. It follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]
//! - Wiring in [`runtime`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod runtime;
pub mod services;

#[cfg(test)]
mod tests;
