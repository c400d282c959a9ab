//! Orders the blocks of one street by endpoint connectivity.
//!
//! Blocks are not guaranteed to be digitized in a consistent direction,
//! so each block is recorded with whether it runs against the chain.
//! Disconnected runs of the same street name follow one another with a
//! gap marker on the first block of each later run.

use std::collections::VecDeque;
use std::sync::Arc;

use geo::Coord;

use crate::segment::StreetCenterline;

/// One block's place in its street's ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainLink {
    /// Index of the block in the segment index.
    pub street: usize,
    /// Whether the block is digitized against the chain direction.
    pub reversed: bool,
    /// Whether the network is disconnected just before this block.
    pub gap_before: bool,
    /// Chain distance from the first block's entry to this block's entry.
    pub offset_m: f64,
}

struct Ends {
    start: Coord<f64>,
    end: Coord<f64>,
}

impl Ends {
    const fn entry(&self, reversed: bool) -> Coord<f64> {
        if reversed { self.end } else { self.start }
    }

    const fn exit(&self, reversed: bool) -> Coord<f64> {
        if reversed { self.start } else { self.end }
    }
}

/// Orders `members` (indices into `streets`, sorted by network ID) into
/// connected runs. Endpoints within `snap_m` of each other are the same
/// node.
pub fn order_street(
    members: &[usize],
    streets: &[Arc<StreetCenterline>],
    snap_m: f64,
) -> Vec<ChainLink> {
    let ends: Vec<Ends> = members
        .iter()
        .map(|&i| {
            let coords = &streets[i].geometry.0;
            Ends {
                start: coords.first().copied().unwrap_or_default(),
                end: coords.last().copied().unwrap_or_default(),
            }
        })
        .collect();

    let touches = |a: Coord<f64>, b: Coord<f64>| (a.x - b.x).hypot(a.y - b.y) <= snap_m;
    let dangling = |k: usize, at: Coord<f64>| {
        !ends
            .iter()
            .enumerate()
            .any(|(j, e)| j != k && (touches(e.start, at) || touches(e.end, at)))
    };

    let mut visited = vec![false; members.len()];
    let mut links: Vec<ChainLink> = Vec::with_capacity(members.len());
    let mut offset = 0.0;

    loop {
        let seed = (0..members.len())
            .filter(|&k| !visited[k])
            .find(|&k| dangling(k, ends[k].start) || dangling(k, ends[k].end))
            .or_else(|| visited.iter().position(|v| !v));
        let Some(seed) = seed else {
            break;
        };

        // Orient the seed so a dangling end (if any) is the chain entry.
        let seed_reversed = !dangling(seed, ends[seed].start) && dangling(seed, ends[seed].end);
        visited[seed] = true;

        let mut run: VecDeque<(usize, bool)> = VecDeque::from([(seed, seed_reversed)]);

        let mut exit = ends[seed].exit(seed_reversed);
        while let Some((k, reversed)) = next_from(exit, &ends, &visited, &touches) {
            visited[k] = true;
            run.push_back((k, reversed));
            exit = ends[k].exit(reversed);
        }

        let mut entry = ends[seed].entry(seed_reversed);
        while let Some((k, reversed)) = previous_to(entry, &ends, &visited, &touches) {
            visited[k] = true;
            run.push_front((k, reversed));
            entry = ends[k].entry(reversed);
        }

        let gap_before = !links.is_empty();
        for (pos, (k, reversed)) in run.into_iter().enumerate() {
            let street = members[k];
            links.push(ChainLink {
                street,
                reversed,
                gap_before: gap_before && pos == 0,
                offset_m: offset,
            });
            offset += streets[street].length_m;
        }
    }

    links
}

/// First unvisited block whose entry touches `exit`.
fn next_from(
    exit: Coord<f64>,
    ends: &[Ends],
    visited: &[bool],
    touches: &impl Fn(Coord<f64>, Coord<f64>) -> bool,
) -> Option<(usize, bool)> {
    ends.iter().enumerate().find_map(|(k, e)| {
        if visited[k] {
            None
        } else if touches(e.start, exit) {
            Some((k, false))
        } else if touches(e.end, exit) {
            Some((k, true))
        } else {
            None
        }
    })
}

/// First unvisited block whose exit touches `entry`.
fn previous_to(
    entry: Coord<f64>,
    ends: &[Ends],
    visited: &[bool],
    touches: &impl Fn(Coord<f64>, Coord<f64>) -> bool,
) -> Option<(usize, bool)> {
    ends.iter().enumerate().find_map(|(k, e)| {
        if visited[k] {
            None
        } else if touches(e.end, entry) {
            Some((k, false))
        } else if touches(e.start, entry) {
            Some((k, true))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use curb_map_street_models::NetworkId;
    use geo::LineString;

    use super::*;

    fn block(id: &str, coords: &[[f64; 2]]) -> Arc<StreetCenterline> {
        let geometry = LineString::from(coords.to_vec());
        let length_m = curb_map_geometry::length(&geometry);
        Arc::new(StreetCenterline {
            network_id: NetworkId::from(id),
            street_name: "Main St".to_string(),
            street_key: "MAIN ST".to_string(),
            from_street: None,
            to_street: None,
            address_range: None,
            geometry,
            length_m,
            jurisdiction: None,
        })
    }

    fn order(streets: &[Arc<StreetCenterline>]) -> Vec<(String, bool, bool)> {
        let members: Vec<usize> = (0..streets.len()).collect();
        order_street(&members, streets, 2.0)
            .into_iter()
            .map(|l| {
                (
                    streets[l.street].network_id.to_string(),
                    l.reversed,
                    l.gap_before,
                )
            })
            .collect()
    }

    #[test]
    fn orders_by_connectivity_not_id() {
        let streets = vec![
            block("1", &[[100.0, 0.0], [200.0, 0.0]]),
            block("2", &[[0.0, 0.0], [100.0, 0.0]]),
            block("3", &[[200.0, 0.0], [300.0, 0.0]]),
        ];
        assert_eq!(
            order(&streets),
            vec![
                ("2".to_string(), false, false),
                ("1".to_string(), false, false),
                ("3".to_string(), false, false),
            ]
        );
    }

    #[test]
    fn marks_blocks_digitized_backwards() {
        let streets = vec![
            block("1", &[[0.0, 0.0], [100.0, 0.0]]),
            block("2", &[[200.0, 0.0], [100.0, 0.0]]),
        ];
        assert_eq!(
            order(&streets),
            vec![
                ("1".to_string(), false, false),
                ("2".to_string(), true, false),
            ]
        );
    }

    #[test]
    fn snaps_nearly_touching_endpoints() {
        let streets = vec![
            block("1", &[[0.0, 0.0], [100.0, 0.0]]),
            block("2", &[[101.0, 0.5], [200.0, 0.0]]),
        ];
        let links = order(&streets);
        assert!(links.iter().all(|(_, _, gap)| !gap));
    }

    #[test]
    fn separate_runs_get_gap_marker() {
        let streets = vec![
            block("1", &[[0.0, 0.0], [100.0, 0.0]]),
            block("2", &[[500.0, 0.0], [600.0, 0.0]]),
        ];
        let links = order(&streets);
        assert!(!links[0].2);
        assert!(links[1].2);
    }

    #[test]
    fn offsets_accumulate_lengths() {
        let streets = vec![
            block("1", &[[0.0, 0.0], [100.0, 0.0]]),
            block("2", &[[100.0, 0.0], [150.0, 0.0]]),
        ];
        let members = vec![0, 1];
        let links = order_street(&members, &streets, 2.0);
        assert!((links[1].offset_m - 100.0).abs() < 1e-9);
    }
}
