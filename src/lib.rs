//! Shared library modules for the omniwatch monitoring dashboard.
//!
//! Re-exports the modules needed by the binary and the integration
//! tests without duplicating code.

pub mod changelog;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod multisig;
pub mod params;
pub mod poller;
