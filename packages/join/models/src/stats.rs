//! Diagnostic counters for a join run.
//!
//! These counters are the contract the reporting layer reads. Each
//! regulation lands in exactly one of `matched`, `unmatched`,
//! `indeterminate_side` or `unresolved_boundary`.

use std::collections::BTreeMap;

use curb_map_regulation_models::{MatchMethod, RuleCategory};
use serde::{Deserialize, Serialize};

use crate::{AmbiguityReason, RegulationOutcome};

/// Match/ambiguous/unmatched counts for one rule category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCounts {
    /// Regulations that produced assignments.
    pub matched: u64,
    /// Regulations left ambiguous.
    pub ambiguous: u64,
    /// Regulations that matched nothing or failed.
    pub unmatched: u64,
}

/// Counters for one run, or one worker's share of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinStats {
    /// Regulations processed.
    pub total: u64,
    /// Regulations that produced at least one assignment.
    pub matched: u64,
    /// Of `matched`, those placed through the direct-id path.
    pub direct_id: u64,
    /// Of `matched`, those spread across several blocks.
    pub multi_span_matched: u64,
    /// Of `matched`, those settled by the jurisdiction layer.
    pub boundary_resolved: u64,
    /// Regulations with no assignment, including geometry errors.
    pub unmatched: u64,
    /// Of `unmatched`, those with malformed geometry.
    pub geometry_errors: u64,
    /// Regulations whose side could not be determined.
    pub indeterminate_side: u64,
    /// Regulations whose boundary ambiguity could not be resolved.
    pub unresolved_boundary: u64,
    /// Per-category summary.
    pub by_category: BTreeMap<RuleCategory, CategoryCounts>,
}

impl JoinStats {
    /// Counts one regulation's outcome.
    pub fn record(&mut self, category: RuleCategory, outcome: &RegulationOutcome) {
        self.total += 1;
        let counts = self.by_category.entry(category).or_default();

        match outcome {
            RegulationOutcome::Matched(assignments) => {
                self.matched += 1;
                counts.matched += 1;
                // A span anchored by the jurisdiction layer counts under both
                // multi-span and boundary-resolved.
                let used =
                    |method: MatchMethod| assignments.iter().any(|a| a.match_method == method);
                if used(MatchMethod::DirectId) {
                    self.direct_id += 1;
                }
                if assignments.iter().any(|a| a.spanned) {
                    self.multi_span_matched += 1;
                }
                if used(MatchMethod::BoundaryResolved) {
                    self.boundary_resolved += 1;
                }
            }
            RegulationOutcome::Ambiguous { reason, .. } => {
                counts.ambiguous += 1;
                match reason {
                    AmbiguityReason::IndeterminateSide => self.indeterminate_side += 1,
                    AmbiguityReason::UnresolvedBoundary => self.unresolved_boundary += 1,
                }
            }
            RegulationOutcome::Unmatched { .. } => {
                self.unmatched += 1;
                counts.unmatched += 1;
            }
            RegulationOutcome::Error(_) => {
                self.unmatched += 1;
                self.geometry_errors += 1;
                counts.unmatched += 1;
            }
        }
    }

    /// Adds another worker's counters into this one.
    pub fn merge(&mut self, other: &Self) {
        self.total += other.total;
        self.matched += other.matched;
        self.direct_id += other.direct_id;
        self.multi_span_matched += other.multi_span_matched;
        self.boundary_resolved += other.boundary_resolved;
        self.unmatched += other.unmatched;
        self.geometry_errors += other.geometry_errors;
        self.indeterminate_side += other.indeterminate_side;
        self.unresolved_boundary += other.unresolved_boundary;
        for (category, counts) in &other.by_category {
            let mine = self.by_category.entry(*category).or_default();
            mine.matched += counts.matched;
            mine.ambiguous += counts.ambiguous;
            mine.unmatched += counts.unmatched;
        }
    }
}
