#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Configuration, per-record outcomes and statistics for the curb join.
//!
//! The reporting layer depends on [`JoinStats`] and
//! [`UnresolvedRegulation`]; the engine depends on [`JoinConfig`].

pub mod config;
pub mod outcome;
pub mod stats;

pub use config::{DEFAULT_CONFIG_TOML, JoinConfig};
pub use outcome::{
    AmbiguityReason, CandidateMatch, DistanceBand, RegulationOutcome, UnmatchedReason,
    UnresolvedReason, UnresolvedRegulation,
};
pub use stats::{CategoryCounts, JoinStats};

/// Errors loading or validating a [`JoinConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The TOML could not be parsed.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration violates an invariant.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
