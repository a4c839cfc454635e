//! Live conformance probing of a SCIM server.
//!
//! The probe walks a target server through discovery, a CRUD lifecycle per
//! resource type, a rapid create/delete burst, search and error handling, then
//! removes everything it created. Server responses are graded by a
//! [`DeviationPolicy`] so that tolerated deviations can be reported as warnings
//! in compat mode.
//!
//! ```rust,no_run
//! use scim_conformance::config::ProbeConfig;
//! use scim_conformance::probe::ProbeEngine;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProbeConfig::builder("https://scim.example.com/scim/v2")
//!     .with_bearer_token("token")
//!     .accept_side_effects(true)
//!     .build()?;
//! let outcome = ProbeEngine::connect(config)?.run().await?;
//! println!("{} checks", outcome.checks.len());
//! # Ok(())
//! # }
//! ```

pub mod checks;
pub mod create;
pub mod deviation;
pub mod engine;
pub mod payload;
pub mod registry;
pub mod response;

pub use checks::{CheckLog, CheckStatus, Evidence, Phase, ProbeCheck, RootCause};
pub use create::{CreateAttempt, CreateOutcome, CreateState};
pub use deviation::{DeviationClass, DeviationPolicy, DeviationRule, Severity};
pub use engine::{ProbeEngine, ProbeOutcome, supported_kinds};
pub use payload::PayloadFactory;
pub use registry::{CreationRegistry, TestResource};
pub use response::{Finding, ResponseValidator};
