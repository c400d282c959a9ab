//! Join tunables.
//!
//! Defaults ship as an embedded TOML file; a host may overlay its own
//! TOML string, and any key it omits keeps the default.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Embedded default configuration.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../defaults.toml");

/// Every threshold the matcher uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    /// Candidates closer than this are a clear match.
    pub clear_max_m: f64,
    /// Candidates beyond this are rejected; between the two is the
    /// boundary band.
    pub boundary_max_m: f64,
    /// Signed-side magnitudes at or below this abstain from the vote.
    pub side_epsilon: f64,
    /// Finite-difference step for tangent estimation.
    pub tangent_epsilon_m: f64,
    /// Confidence multiplier for candidates kept under an indeterminate
    /// side.
    pub indeterminate_confidence_factor: f64,
    /// Declared length above `ratio * anchor length` triggers a span walk.
    pub multi_span_ratio: f64,
    /// A span walk stops once it covers this fraction of the declared
    /// length.
    pub span_min_ratio: f64,
    /// Coverage above this fraction of the declared length is reported
    /// as an overshoot.
    pub span_max_ratio: f64,
    /// Hard cap on blocks in one span.
    pub max_span_segments: usize,
    /// Per-step confidence multiplier away from the span anchor.
    pub span_confidence_decay: f64,
    /// Use the geometry's own length when no length is declared.
    pub measure_undeclared_length: bool,
    /// Candidates on different blocks within this distance of each other
    /// are equally plausible.
    pub tie_tolerance_m: f64,
    /// Smallest `|cos|` between a candidate centerline and the regulation
    /// for the candidate to be considered; 0 disables the check.
    pub min_alignment: f64,
    /// Endpoints closer than this are one network node.
    pub node_snap_m: f64,
    /// Worker threads for a run; 0 uses the available parallelism.
    pub worker_threads: usize,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            clear_max_m: 10.0,
            boundary_max_m: 50.0,
            side_epsilon: 0.01,
            tangent_epsilon_m: 1.0,
            indeterminate_confidence_factor: 0.5,
            multi_span_ratio: 1.2,
            span_min_ratio: 0.9,
            span_max_ratio: 1.1,
            max_span_segments: 12,
            span_confidence_decay: 0.9,
            measure_undeclared_length: true,
            tie_tolerance_m: 0.5,
            min_alignment: 0.5,
            node_snap_m: 2.0,
            worker_threads: 0,
        }
    }
}

impl JoinConfig {
    /// Parses a TOML overlay on top of the defaults and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is malformed or the resulting
    /// configuration is inconsistent.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// The embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the embedded file is malformed.
    pub fn embedded_defaults() -> Result<Self, ConfigError> {
        Self::from_toml_str(DEFAULT_CONFIG_TOML)
    }

    /// Checks that thresholds are positive and correctly ordered.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("clear_max_m", self.clear_max_m),
            ("boundary_max_m", self.boundary_max_m),
            ("tangent_epsilon_m", self.tangent_epsilon_m),
            ("multi_span_ratio", self.multi_span_ratio),
            ("span_min_ratio", self.span_min_ratio),
            ("span_max_ratio", self.span_max_ratio),
            ("node_snap_m", self.node_snap_m),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }
        if !(self.side_epsilon.is_finite() && self.side_epsilon >= 0.0) {
            return Err(ConfigError::Invalid("side_epsilon must be non-negative".into()));
        }
        if !(self.tie_tolerance_m.is_finite() && self.tie_tolerance_m >= 0.0) {
            return Err(ConfigError::Invalid("tie_tolerance_m must be non-negative".into()));
        }
        if !(0.0..=1.0).contains(&self.min_alignment) {
            return Err(ConfigError::Invalid("min_alignment must be in [0, 1]".into()));
        }
        if self.clear_max_m >= self.boundary_max_m {
            return Err(ConfigError::Invalid(
                "clear_max_m must be below boundary_max_m".into(),
            ));
        }
        if self.span_min_ratio > self.span_max_ratio {
            return Err(ConfigError::Invalid(
                "span_min_ratio must not exceed span_max_ratio".into(),
            ));
        }
        if self.multi_span_ratio < 1.0 {
            return Err(ConfigError::Invalid(
                "multi_span_ratio must be at least 1".into(),
            ));
        }
        if self.max_span_segments == 0 {
            return Err(ConfigError::Invalid(
                "max_span_segments must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("span_confidence_decay", self.span_confidence_decay),
            (
                "indeterminate_confidence_factor",
                self.indeterminate_confidence_factor,
            ),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::Invalid(format!("{name} must be in (0, 1]")));
            }
        }
        Ok(())
    }

    /// Number of workers to use for `items` regulations.
    #[must_use]
    pub fn worker_count(&self, items: usize) -> usize {
        let configured = if self.worker_threads == 0 {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        } else {
            self.worker_threads
        };
        configured.clamp(1, items.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_match_default_impl() {
        assert_eq!(JoinConfig::embedded_defaults().unwrap(), JoinConfig::default());
    }

    #[test]
    fn overlay_keeps_unspecified_defaults() {
        let config = JoinConfig::from_toml_str("clear_max_m = 8.0\nworker_threads = 2\n").unwrap();
        assert!((config.clear_max_m - 8.0).abs() < f64::EPSILON);
        assert_eq!(config.worker_threads, 2);
        assert!((config.boundary_max_m - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_inverted_bands() {
        let err = JoinConfig::from_toml_str("clear_max_m = 60.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = JoinConfig::from_toml_str("clear_max_m = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_zero_span_cap() {
        let config = JoinConfig {
            max_span_segments: 0,
            ..JoinConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_alignment_outside_unit_range() {
        let err = JoinConfig::from_toml_str("min_alignment = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(JoinConfig::from_toml_str("min_alignment = 0.0").is_ok());
    }

    #[test]
    fn worker_count_never_exceeds_items() {
        let config = JoinConfig {
            worker_threads: 8,
            ..JoinConfig::default()
        };
        assert_eq!(config.worker_count(3), 3);
        assert_eq!(config.worker_count(0), 1);
        assert_eq!(config.worker_count(100), 8);
    }
}
