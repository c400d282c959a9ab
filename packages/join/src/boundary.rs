//! Jurisdiction tie-breaking for boundary-band and tied candidates.

use curb_map_spatial::JurisdictionIndex;
use curb_map_street_models::Jurisdiction;

use crate::candidate::{Candidate, PreparedRegulation};

/// Settles ambiguous candidates against the authoritative jurisdiction
/// layer.
#[derive(Clone, Copy)]
pub struct BoundaryResolver<'a> {
    jurisdictions: Option<&'a JurisdictionIndex>,
}

impl<'a> BoundaryResolver<'a> {
    /// Creates a resolver. Without a layer, only declared jurisdictions
    /// can settle a case.
    #[must_use]
    pub const fn new(jurisdictions: Option<&'a JurisdictionIndex>) -> Self {
        Self { jurisdictions }
    }

    /// The jurisdiction a regulation belongs to.
    ///
    /// The polygon containing the regulation midpoint is authoritative.
    /// A declared jurisdiction that disagrees with it makes the case
    /// unresolvable. Outside polygon coverage the declared one is used.
    #[must_use]
    pub fn authority<'r>(&self, regulation: &'r PreparedRegulation<'_>) -> Option<&'r Jurisdiction>
    where
        'a: 'r,
    {
        let polygon = self
            .jurisdictions
            .and_then(|layer| layer.lookup(regulation.midpoint));
        let declared = regulation.row.jurisdiction.as_ref();

        match (polygon, declared) {
            (Some(polygon), Some(declared)) if polygon != declared => {
                log::debug!(
                    "Regulation {} declares {declared} but lies in {polygon}",
                    regulation.row.regulation_id
                );
                None
            }
            (Some(polygon), _) => Some(polygon),
            (None, declared) => declared,
        }
    }

    /// Picks the single candidate in the regulation's jurisdiction.
    ///
    /// Zero or several matching candidates yield `None`.
    #[must_use]
    pub fn resolve<'s>(
        &self,
        regulation: &PreparedRegulation<'_>,
        candidates: &[Candidate<'s>],
    ) -> Option<Candidate<'s>> {
        let authority = self.authority(regulation)?;

        let mut matching = candidates
            .iter()
            .filter(|c| c.segment.jurisdiction() == Some(authority));
        let first = matching.next()?;
        if matching.next().is_some() {
            log::debug!(
                "Regulation {}: several candidates lie in {authority}",
                regulation.row.regulation_id
            );
            return None;
        }
        Some(*first)
    }
}
