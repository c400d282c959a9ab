//! Batch orchestration: direct-id fast path, geometric join, statistics.

use curb_map_join_models::{
    JoinConfig, JoinStats, RegulationOutcome, UnmatchedReason, UnresolvedRegulation,
};
use curb_map_regulation_models::{MatchMethod, RegulationAssignment, RegulationRow, RegulationShape};
use curb_map_spatial::{IndexOptions, JurisdictionIndex, SegmentIndex};
use curb_map_street_models::{Coordinate, StreetRow};
use serde::Serialize;

use crate::JoinError;
use crate::boundary::BoundaryResolver;
use crate::candidate::{PreparedRegulation, assignment};
use crate::span::SpanMatcher;

/// Everything a run produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinOutput {
    /// Curb assignments, in regulation input order.
    pub assignments: Vec<RegulationAssignment>,
    /// Regulations that produced no assignment, in input order.
    pub unresolved: Vec<UnresolvedRegulation>,
    /// Diagnostic counters.
    pub stats: JoinStats,
}

impl JoinOutput {
    fn push(&mut self, row: &RegulationRow, outcome: RegulationOutcome) {
        let category = row.category();
        self.stats.record(category, &outcome);
        match outcome {
            RegulationOutcome::Matched(assignments) => self.assignments.extend(assignments),
            other => self.unresolved.extend(UnresolvedRegulation::from_outcome(
                &row.regulation_id,
                category,
                other,
            )),
        }
    }

    fn append(&mut self, other: Self) {
        self.assignments.extend(other.assignments);
        self.unresolved.extend(other.unresolved);
        self.stats.merge(&other.stats);
    }
}

/// Joins regulation rows onto a [`SegmentIndex`].
pub struct JoinEngine {
    config: JoinConfig,
    jurisdictions: Option<JurisdictionIndex>,
}

impl JoinEngine {
    /// Creates an engine with a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`JoinError::Config`] if the configuration is inconsistent.
    pub fn new(config: JoinConfig) -> Result<Self, JoinError> {
        config.validate()?;
        Ok(Self {
            config,
            jurisdictions: None,
        })
    }

    /// Attaches the authoritative jurisdiction layer.
    #[must_use]
    pub fn with_jurisdictions(mut self, jurisdictions: JurisdictionIndex) -> Self {
        self.jurisdictions = Some(jurisdictions);
        self
    }

    /// The engine's configuration.
    #[must_use]
    pub const fn config(&self) -> &JoinConfig {
        &self.config
    }

    /// The attached jurisdiction layer, if any.
    #[must_use]
    pub const fn jurisdictions(&self) -> Option<&JurisdictionIndex> {
        self.jurisdictions.as_ref()
    }

    /// Builds the segment index with this engine's node snapping and
    /// jurisdiction layer.
    ///
    /// # Errors
    ///
    /// Returns [`JoinError::Index`] if the street network is empty or a
    /// row has no centerline.
    pub fn build_index(&self, rows: &[StreetRow]) -> Result<SegmentIndex, JoinError> {
        let options = IndexOptions {
            node_snap_m: self.config.node_snap_m,
        };
        Ok(SegmentIndex::build_with(
            rows,
            options,
            self.jurisdictions.as_ref(),
        )?)
    }

    /// Joins every regulation.
    ///
    /// Regulations are processed across worker threads; the output is the
    /// same for any worker count.
    ///
    /// # Errors
    ///
    /// Returns [`JoinError::MissingGeometry`] before any matching if a row
    /// has neither an explicit segment reference nor a geometry.
    pub fn run(
        &self,
        index: &SegmentIndex,
        regulations: &[RegulationRow],
    ) -> Result<JoinOutput, JoinError> {
        if let Some(row) = regulations.iter().find(|row| row.shape().is_none()) {
            return Err(JoinError::MissingGeometry {
                regulation_id: row.regulation_id.clone(),
            });
        }

        let workers = self.config.worker_count(regulations.len());
        log::info!(
            "Joining {} regulations onto {} street segments with {workers} workers",
            regulations.len(),
            index.len()
        );

        let output = if workers <= 1 {
            self.process(index, regulations)
        } else {
            let per_worker = regulations.len().div_ceil(workers);
            std::thread::scope(|s| {
                let tasks: Vec<_> = regulations
                    .chunks(per_worker)
                    .map(|chunk| s.spawn(move || self.process(index, chunk)))
                    .collect();

                let mut output = JoinOutput::default();
                for task in tasks {
                    match task.join() {
                        Ok(part) => output.append(part),
                        Err(panic) => std::panic::resume_unwind(panic),
                    }
                }
                output
            })
        };

        let stats = &output.stats;
        log::info!(
            "Join complete: {} matched ({} direct-id, {} multi-span, {} boundary-resolved), \
             {} unmatched ({} geometry errors), {} indeterminate side, {} unresolved boundary",
            stats.matched,
            stats.direct_id,
            stats.multi_span_matched,
            stats.boundary_resolved,
            stats.unmatched,
            stats.geometry_errors,
            stats.indeterminate_side,
            stats.unresolved_boundary
        );

        Ok(output)
    }

    /// Joins one regulation.
    #[must_use]
    pub fn join_one(&self, index: &SegmentIndex, row: &RegulationRow) -> RegulationOutcome {
        match row.shape() {
            Some(RegulationShape::DirectId {
                network_id,
                side,
                geometry,
            }) => {
                if let Some(segment) = index.exact(network_id, side) {
                    return RegulationOutcome::Matched(vec![assignment(
                        row,
                        segment,
                        MatchMethod::DirectId,
                        1.0,
                    )]);
                }
                log::warn!(
                    "Regulation {} references unknown segment ({network_id}, {side})",
                    row.regulation_id
                );
                geometry.map_or(
                    RegulationOutcome::Unmatched {
                        reason: UnmatchedReason::UnknownSegment,
                    },
                    |coords| self.join_geometry(index, row, coords),
                )
            }
            Some(RegulationShape::Geometric { geometry }) => {
                self.join_geometry(index, row, geometry)
            }
            None => RegulationOutcome::Unmatched {
                reason: UnmatchedReason::InvalidGeometry,
            },
        }
    }

    fn join_geometry(
        &self,
        index: &SegmentIndex,
        row: &RegulationRow,
        coords: &[Coordinate],
    ) -> RegulationOutcome {
        let prepared = match PreparedRegulation::new(
            row,
            coords,
            self.config.measure_undeclared_length,
        ) {
            Ok(prepared) => prepared,
            Err(e) => {
                log::debug!("Regulation {} has malformed geometry: {e}", row.regulation_id);
                return RegulationOutcome::Error(e);
            }
        };

        let nearby = match index.nearby(&prepared.line, self.config.boundary_max_m) {
            Ok(nearby) => nearby,
            Err(e) => return RegulationOutcome::Error(e),
        };

        SpanMatcher::new(
            index,
            &self.config,
            BoundaryResolver::new(self.jurisdictions.as_ref()),
        )
        .match_candidates(&prepared, &nearby)
    }

    fn process(&self, index: &SegmentIndex, rows: &[RegulationRow]) -> JoinOutput {
        let mut output = JoinOutput::default();
        for row in rows {
            let outcome = self.join_one(index, row);
            output.push(row, outcome);
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use curb_map_join_models::ConfigError;
    use curb_map_regulation_models::{RuleAttributes, Schedule};
    use curb_map_street_models::{NetworkId, Side};

    use super::*;

    fn street(id: &str, coords: &[[f64; 2]]) -> StreetRow {
        StreetRow {
            network_id: NetworkId::from(id),
            street_name: "Main St".to_string(),
            centerline: Some(coords.to_vec()),
            from_street: None,
            to_street: None,
            address_range: None,
            left_curb: None,
            right_curb: None,
            jurisdiction: None,
        }
    }

    fn rule() -> RuleAttributes {
        RuleAttributes::Permit {
            zone: "C".to_string(),
            schedule: Schedule::default(),
        }
    }

    fn engine() -> JoinEngine {
        JoinEngine::new(JoinConfig::default()).unwrap()
    }

    fn index(engine: &JoinEngine) -> SegmentIndex {
        engine
            .build_index(&[
                street("100", &[[0.0, 0.0], [100.0, 0.0]]),
                street("101", &[[100.0, 0.0], [200.0, 0.0]]),
            ])
            .unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = JoinConfig {
            clear_max_m: 60.0,
            ..JoinConfig::default()
        };
        assert!(matches!(
            JoinEngine::new(config),
            Err(JoinError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn unknown_direct_id_falls_back_to_geometry() {
        let engine = engine();
        let index = index(&engine);
        let row = RegulationRow {
            regulation_id: "r".to_string(),
            network_id: Some(NetworkId::from("999")),
            side: Some(Side::Right),
            geometry: Some(vec![[105.0, -6.0], [195.0, -6.0]]),
            declared_length_m: None,
            jurisdiction: None,
            rule: rule(),
        };
        let outcome = engine.join_one(&index, &row);
        let placed = outcome.assignments();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].network_id.as_str(), "101");
        assert_eq!(placed[0].side, Side::Right);
        assert_eq!(placed[0].match_method, MatchMethod::SingleSpan);
    }

    #[test]
    fn unknown_direct_id_without_geometry_is_unmatched() {
        let engine = engine();
        let index = index(&engine);
        let row = RegulationRow {
            regulation_id: "r".to_string(),
            network_id: Some(NetworkId::from("999")),
            side: Some(Side::Left),
            geometry: None,
            declared_length_m: None,
            jurisdiction: None,
            rule: rule(),
        };
        assert_eq!(
            engine.join_one(&index, &row),
            RegulationOutcome::Unmatched {
                reason: UnmatchedReason::UnknownSegment
            }
        );
    }

    #[test]
    fn malformed_geometry_is_a_per_record_error() {
        let engine = engine();
        let index = index(&engine);
        let row = RegulationRow {
            regulation_id: "bad".to_string(),
            network_id: None,
            side: None,
            geometry: Some(vec![[5.0, 5.0]]),
            declared_length_m: None,
            jurisdiction: None,
            rule: rule(),
        };
        let output = engine.run(&index, &[row]).unwrap();
        assert!(output.assignments.is_empty());
        assert_eq!(output.stats.unmatched, 1);
        assert_eq!(output.stats.geometry_errors, 1);
        assert_eq!(output.unresolved[0].regulation_id, "bad");
    }

    #[test]
    fn row_without_reference_or_geometry_aborts_the_batch() {
        let engine = engine();
        let index = index(&engine);
        let row = RegulationRow {
            regulation_id: "empty".to_string(),
            network_id: Some(NetworkId::from("100")),
            side: None,
            geometry: None,
            declared_length_m: None,
            jurisdiction: None,
            rule: rule(),
        };
        assert!(matches!(
            engine.run(&index, &[row]),
            Err(JoinError::MissingGeometry { regulation_id }) if regulation_id == "empty"
        ));
    }

    #[test]
    fn empty_street_network_is_fatal() {
        assert!(matches!(
            engine().build_index(&[]),
            Err(JoinError::Index(curb_map_spatial::IndexError::EmptyNetwork))
        ));
    }

    #[test]
    fn empty_batch_produces_empty_output() {
        let engine = engine();
        let index = index(&engine);
        assert_eq!(engine.run(&index, &[]).unwrap(), JoinOutput::default());
    }
}
