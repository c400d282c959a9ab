//! Directed street segments: one centerline, two curbs.

use std::sync::Arc;

use curb_map_street_models::{AddressRange, Jurisdiction, NetworkId, Side};
use geo::LineString;

/// One centerline block of the street network, shared by both of its
/// directed segments.
#[derive(Debug, Clone, PartialEq)]
pub struct StreetCenterline {
    /// Stable network segment ID.
    pub network_id: NetworkId,
    /// Street name as delivered.
    pub street_name: String,
    /// Normalized street name used for along-street grouping.
    pub street_key: String,
    /// Cross street at the start of the centerline.
    pub from_street: Option<String>,
    /// Cross street at the end of the centerline.
    pub to_street: Option<String>,
    /// Address range metadata.
    pub address_range: Option<AddressRange>,
    /// Centerline polyline in coordinate order.
    pub geometry: LineString<f64>,
    /// Physical length in metres.
    pub length_m: f64,
    /// Declared or inherited jurisdiction.
    pub jurisdiction: Option<Jurisdiction>,
}

/// The curb on one side of one block.
///
/// Identity `(network_id, side)` is fixed at index build time. Exactly two
/// exist per network ID and they share one [`StreetCenterline`].
#[derive(Debug, Clone, PartialEq)]
pub struct DirectedStreetSegment {
    side: Side,
    street: Arc<StreetCenterline>,
    curb: Option<LineString<f64>>,
}

impl DirectedStreetSegment {
    pub(crate) fn new(
        street: Arc<StreetCenterline>,
        side: Side,
        curb: Option<LineString<f64>>,
    ) -> Self {
        Self { side, street, curb }
    }

    /// Network segment ID.
    #[must_use]
    pub fn network_id(&self) -> &NetworkId {
        &self.street.network_id
    }

    /// Side of the centerline this curb lies on.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// The shared centerline block.
    #[must_use]
    pub fn street(&self) -> &StreetCenterline {
        &self.street
    }

    /// Centerline polyline.
    #[must_use]
    pub fn centerline(&self) -> &LineString<f64> {
        &self.street.geometry
    }

    /// Physical length in metres.
    #[must_use]
    pub fn length_m(&self) -> f64 {
        self.street.length_m
    }

    /// Street name as delivered.
    #[must_use]
    pub fn street_name(&self) -> &str {
        &self.street.street_name
    }

    /// Declared or inherited jurisdiction.
    #[must_use]
    pub fn jurisdiction(&self) -> Option<&Jurisdiction> {
        self.street.jurisdiction.as_ref()
    }

    /// Surveyed curb-offset polyline, if the street row carried one.
    #[must_use]
    pub const fn curb_line(&self) -> Option<&LineString<f64>> {
        self.curb.as_ref()
    }

    /// Whether both segments share the same centerline allocation.
    #[must_use]
    pub fn shares_centerline_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.street, &other.street)
    }
}
