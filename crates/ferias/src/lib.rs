//! Vacation entitlement and approval workflows for a public-sector
//! workforce: acquisition periods, staged request approval, leave grants,
//! and the surrounding service plumbing.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
