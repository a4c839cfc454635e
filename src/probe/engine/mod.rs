//! Live conformance probe against a SCIM server.
//!
//! The engine runs every phase in order on one task and records a
//! [`ProbeCheck`](super::ProbeCheck) per step. A failing check never stops the
//! run; it only aborts the rest of the affected lifecycle.
//!
//! # Module Organization
//!
//! * [`driver`] - `ProbeEngine` struct, construction and the phase driver
//! * [`lifecycle`] - CRUD lifecycle of one resource type
//! * [`phases`] - Discovery, rapid lifecycle, search and error handling
//! * [`cleanup`] - Deletion of everything the run left behind

pub mod cleanup;
pub mod driver;
pub mod lifecycle;
pub mod phases;

pub use driver::{ProbeEngine, ProbeOutcome};
pub use phases::supported_kinds;
