//! Step definitions for tenant migration and routing scenarios.

mod given;
mod then;
