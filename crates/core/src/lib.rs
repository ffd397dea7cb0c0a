//! Domain types and reconciliation logic for the dedup console.
//!
//! Everything in this crate is pure: no I/O, no clocks other than
//! timestamps stamped onto state at mutation time. The networked layers
//! (`dedup-client`, `dedup-session`) feed updates in and execute the
//! [`reconcile::SideEffect`]s that come back out.

pub mod activity;
pub mod approval;
pub mod error;
pub mod job;
pub mod phase;
pub mod reconcile;
pub mod types;

pub use error::CoreError;
