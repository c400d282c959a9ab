//! Single-block and multi-block matching of side-agnostic regulations.

use curb_map_geometry::{Coord, GeometryError, interpolate, length, project, tangent_at};
use curb_map_join_models::{
    AmbiguityReason, CandidateMatch, DistanceBand, JoinConfig, RegulationOutcome, UnmatchedReason,
};
use curb_map_regulation_models::{MatchMethod, RegulationAssignment};
use curb_map_spatial::{AlongStreet, NearbySegment, SegmentIndex};

use crate::boundary::BoundaryResolver;
use crate::candidate::{Candidate, PreparedRegulation, distance_confidence};
use crate::side::SideClassifier;

/// Chooses curbs for a regulation from its nearby candidates.
#[derive(Clone, Copy)]
pub struct SpanMatcher<'a> {
    index: &'a SegmentIndex,
    config: &'a JoinConfig,
    classifier: SideClassifier,
    resolver: BoundaryResolver<'a>,
}

/// How an anchor was chosen.
struct Anchor<'s> {
    candidate: Candidate<'s>,
    method: MatchMethod,
}

impl<'a> SpanMatcher<'a> {
    /// Creates a matcher over `index`.
    #[must_use]
    pub const fn new(
        index: &'a SegmentIndex,
        config: &'a JoinConfig,
        resolver: BoundaryResolver<'a>,
    ) -> Self {
        Self {
            index,
            config,
            classifier: SideClassifier::from_config(config),
            resolver,
        }
    }

    /// Matches a regulation against candidates from
    /// [`SegmentIndex::nearby`].
    #[must_use]
    pub fn match_candidates(
        &self,
        regulation: &PreparedRegulation<'_>,
        nearby: &[NearbySegment<'a>],
    ) -> RegulationOutcome {
        match self.try_match(regulation, nearby) {
            Ok(outcome) => outcome,
            Err(e) => RegulationOutcome::Error(e),
        }
    }

    fn try_match(
        &self,
        regulation: &PreparedRegulation<'_>,
        nearby: &[NearbySegment<'a>],
    ) -> Result<RegulationOutcome, GeometryError> {
        let id = &regulation.row.regulation_id;
        let heading = tangent_at(
            &regulation.line,
            length(&regulation.line) / 2.0,
            self.config.tangent_epsilon_m,
        )?;

        let mut candidates: Vec<Candidate<'a>> = Vec::new();
        let mut nearest_clear_seen = false;

        for found in unique_networks(nearby) {
            let band = DistanceBand::classify(found.distance, self.config);
            if band == DistanceBand::Rejected {
                continue;
            }
            if !self.aligned(regulation, heading, found)? {
                log::trace!(
                    "Regulation {id}: {} runs across the regulation, skipping",
                    found.segment.network_id()
                );
                continue;
            }

            let determination = self
                .classifier
                .classify(found.segment.centerline(), &regulation.line)?;
            let is_nearest_clear = band == DistanceBand::Clear && !nearest_clear_seen;
            nearest_clear_seen |= band == DistanceBand::Clear;

            let Some(side) = determination.side.side() else {
                if is_nearest_clear {
                    log::debug!(
                        "Regulation {id}: side of {} is indeterminate",
                        found.segment.network_id()
                    );
                    return Ok(RegulationOutcome::Ambiguous {
                        reason: AmbiguityReason::IndeterminateSide,
                        candidates: self.straddling(nearby),
                    });
                }
                continue;
            };

            if let Some(segment) = self.index.exact(found.segment.network_id(), side) {
                candidates.push(Candidate {
                    segment,
                    distance: found.distance,
                    band,
                    confidence: distance_confidence(found.distance),
                });
            }
        }

        if candidates.is_empty() {
            log::debug!("Regulation {id}: no candidates within range");
            return Ok(RegulationOutcome::Unmatched {
                reason: UnmatchedReason::NoCandidates,
            });
        }

        let anchor = match self.anchor(regulation, &candidates) {
            Ok(anchor) => anchor,
            Err(contenders) => {
                log::debug!("Regulation {id}: boundary ambiguity left unresolved");
                return Ok(RegulationOutcome::Ambiguous {
                    reason: AmbiguityReason::UnresolvedBoundary,
                    candidates: contenders,
                });
            }
        };

        let anchor_length = anchor.candidate.segment.length_m();
        match regulation.target_length_m {
            Some(target) if target > self.config.multi_span_ratio * anchor_length => {
                self.walk(regulation, &anchor, target)
            }
            _ => Ok(RegulationOutcome::Matched(vec![regulation.assign(
                anchor.candidate.segment,
                anchor.method,
                anchor.candidate.confidence,
            )])),
        }
    }

    /// Whether the candidate's centerline, where the regulation midpoint
    /// projects onto it, runs roughly along `heading`.
    fn aligned(
        &self,
        regulation: &PreparedRegulation<'_>,
        heading: Coord<f64>,
        found: &NearbySegment<'_>,
    ) -> Result<bool, GeometryError> {
        let centerline = found.segment.centerline();
        let foot = project(regulation.midpoint, centerline)?;
        let tangent = tangent_at(centerline, foot.arc_length, self.config.tangent_epsilon_m)?;
        let cos = tangent.x.mul_add(heading.x, tangent.y * heading.y).abs();
        Ok(cos >= self.config.min_alignment)
    }

    /// Picks the block the regulation is placed on.
    ///
    /// Returns the contenders that could not be separated on failure.
    fn anchor(
        &self,
        regulation: &PreparedRegulation<'_>,
        candidates: &[Candidate<'a>],
    ) -> Result<Anchor<'a>, Vec<CandidateMatch>> {
        let clear: Vec<Candidate<'a>> = candidates
            .iter()
            .filter(|c| c.band == DistanceBand::Clear)
            .copied()
            .collect();

        let Some(nearest) = clear.first().copied() else {
            return self
                .resolver
                .resolve(regulation, candidates)
                .map(|candidate| Anchor {
                    candidate,
                    method: MatchMethod::BoundaryResolved,
                })
                .ok_or_else(|| candidates.iter().map(Candidate::to_match).collect());
        };

        let tied: Vec<Candidate<'a>> = clear
            .iter()
            .filter(|c| c.distance - nearest.distance <= self.config.tie_tolerance_m)
            .copied()
            .collect();
        let key = &nearest.segment.street().street_key;
        let crosses_streets = tied.iter().any(|c| &c.segment.street().street_key != key);

        if crosses_streets {
            return self
                .resolver
                .resolve(regulation, &tied)
                .map(|candidate| Anchor {
                    candidate,
                    method: MatchMethod::BoundaryResolved,
                })
                .ok_or_else(|| tied.iter().map(Candidate::to_match).collect());
        }

        // Same-street ties continue into each other; the lowest block anchors.
        let candidate = tied
            .iter()
            .min_by(|a, b| a.segment.network_id().cmp(b.segment.network_id()))
            .copied()
            .unwrap_or(nearest);

        Ok(Anchor {
            candidate,
            method: MatchMethod::SingleSpan,
        })
    }

    /// Grows a contiguous run of blocks out from the anchor until it
    /// covers enough of `target` metres.
    fn walk(
        &self,
        regulation: &PreparedRegulation<'_>,
        anchor: &Anchor<'a>,
        target: f64,
    ) -> Result<RegulationOutcome, GeometryError> {
        let id = &regulation.row.regulation_id;
        let segment = anchor.candidate.segment;

        let Some(position) = self.index.chain_position(segment.network_id()) else {
            return Ok(RegulationOutcome::Unmatched {
                reason: UnmatchedReason::SpanGap,
            });
        };
        let chain = self.index.segments_along_street(
            segment.street_name(),
            segment.side().flipped_if(position.reversed),
        );

        let samples = self.samples(regulation)?;
        let required = self.config.span_min_ratio * target;
        let mut lo = position.index;
        let mut hi = position.index;
        let mut covered = segment.length_m();

        while covered < required {
            if hi - lo + 1 >= self.config.max_span_segments {
                log::debug!(
                    "Regulation {id}: span cap of {} blocks reached at {covered:.1} of {target:.1} m",
                    self.config.max_span_segments
                );
                return Ok(RegulationOutcome::Unmatched {
                    reason: UnmatchedReason::SpanShortfall,
                });
            }

            let previous = match lo.checked_sub(1) {
                Some(prev) if !chain[lo].gap_before => {
                    Some(self.alongside(&samples, &chain[prev])?.map(|d| (prev, d)))
                }
                _ => None,
            };
            let next = match chain.get(hi + 1) {
                Some(link) if !link.gap_before => {
                    Some(self.alongside(&samples, link)?.map(|d| (hi + 1, d)))
                }
                _ => None,
            };

            let step = match (previous.flatten(), next.flatten()) {
                (Some((prev, dp)), Some((next, dn))) => Some(if dn <= dp { next } else { prev }),
                (Some((prev, _)), None) => Some(prev),
                (None, Some((next, _))) => Some(next),
                (None, None) => None,
            };

            let Some(step) = step else {
                // No block on either side at all is a break in the network;
                // blocks that exist but sit away from the geometry mean the
                // declared length overstates it.
                let reason = if previous.is_none() && next.is_none() {
                    UnmatchedReason::SpanGap
                } else {
                    UnmatchedReason::SpanShortfall
                };
                log::debug!(
                    "Regulation {id}: span walk stopped at {covered:.1} of {target:.1} m ({reason})"
                );
                return Ok(RegulationOutcome::Unmatched { reason });
            };

            covered += chain[step].segment.length_m();
            if step < lo {
                lo = step;
            } else {
                hi = step;
            }
        }

        if covered > self.config.span_max_ratio * target {
            log::debug!(
                "Regulation {id}: span covers {covered:.1} m for {target:.1} m declared, keeping overshoot"
            );
        }

        log::debug!(
            "Regulation {id}: spans {} blocks of {}",
            hi - lo + 1,
            segment.street_name()
        );

        let assignments = (lo..=hi)
            .map(|i| {
                let steps = i.abs_diff(position.index);
                let confidence = anchor.candidate.confidence
                    * self
                        .config
                        .span_confidence_decay
                        .powi(i32::try_from(steps).unwrap_or(i32::MAX));
                // The anchor keeps the method that chose it.
                let method = if steps == 0 && anchor.method == MatchMethod::BoundaryResolved {
                    MatchMethod::BoundaryResolved
                } else {
                    MatchMethod::MultiSpan
                };
                let mut placed = regulation.assign(chain[i].segment, method, confidence);
                placed.spanned = true;
                placed
            })
            .collect::<Vec<RegulationAssignment>>();

        Ok(RegulationOutcome::Matched(assignments))
    }

    /// The regulation's vertices plus points every `clear_max_m` along it.
    fn samples(
        &self,
        regulation: &PreparedRegulation<'_>,
    ) -> Result<Vec<Coord<f64>>, GeometryError> {
        let total = length(&regulation.line);
        let mut points: Vec<Coord<f64>> = regulation.line.coords().copied().collect();
        let step = self.config.clear_max_m;
        for arc in std::iter::successors(Some(0.0), |arc| Some(arc + step))
            .take_while(|&arc| arc < total)
        {
            points.push(interpolate(&regulation.line, arc)?);
        }
        Ok(points)
    }

    /// Closest distance at which the regulation runs alongside a
    /// neighbouring block, if it does within `boundary_max_m`.
    ///
    /// Only samples projecting onto the block's interior count, so a
    /// regulation that merely ends at the shared node does not extend
    /// onto the next block.
    fn alongside(
        &self,
        samples: &[Coord<f64>],
        link: &AlongStreet<'_>,
    ) -> Result<Option<f64>, GeometryError> {
        let centerline = link.segment.centerline();
        let block = link.segment.length_m();
        let margin = self.config.node_snap_m.min(block / 4.0);

        let mut nearest: Option<f64> = None;
        for &point in samples {
            let foot = project(point, centerline)?;
            let interior = foot.arc_length > margin && foot.arc_length < block - margin;
            if interior && foot.distance <= self.config.boundary_max_m {
                nearest = Some(nearest.map_or(foot.distance, |d| d.min(foot.distance)));
            }
        }
        Ok(nearest)
    }

    /// Both curbs of every clear candidate, at reduced confidence.
    fn straddling(&self, nearby: &[NearbySegment<'a>]) -> Vec<CandidateMatch> {
        nearby
            .iter()
            .filter(|found| DistanceBand::classify(found.distance, self.config) == DistanceBand::Clear)
            .map(|found| CandidateMatch {
                network_id: found.segment.network_id().clone(),
                side: found.segment.side(),
                distance: found.distance,
                band: DistanceBand::Clear,
                confidence: distance_confidence(found.distance)
                    * self.config.indeterminate_confidence_factor,
            })
            .collect()
    }
}

/// The first entry of each network in `nearby`, keeping its order.
fn unique_networks<'n, 'a>(
    nearby: &'n [NearbySegment<'a>],
) -> impl Iterator<Item = &'n NearbySegment<'a>> {
    let mut seen = std::collections::HashSet::new();
    nearby
        .iter()
        .filter(move |found| seen.insert(found.segment.network_id()))
}
