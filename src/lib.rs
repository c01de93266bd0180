//! Loyalty points ledger and tier progression engine.
//!
//! The crate is split the usual hexagonal way:
//!
//! * [`domain`] holds the data model (memberships, ledger entries, tiers).
//! * [`ports`] declares the storage, tier catalog and event publishing contracts.
//! * [`adapters`] provides in-memory and logging implementations of those ports.
//! * [`commands`] contains the engine itself, with one `tower::Service` per operation.

pub mod adapters;
pub mod commands;
pub mod config;
pub mod domain;
pub mod ports;
