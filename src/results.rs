// Ranked result set: a bounded, deduplicating, sorted top-K of result
// tuples (one match snapshot per pattern group, plus the aggregate
// distance at the time of the snapshot).

use crate::distance::{Distance, Match};

/// Number of unordered pairs among `group_count` groups, with the
/// original's `group_count < 2` special case (treated as 1 rather than 0)
/// so a single-group invocation still has a printable ceiling.
pub fn combinations2(group_count: usize) -> u64 {
    let g = group_count as u64;
    if g < 2 { 1 } else { g * (g - 1) / 2 }
}

/// A snapshot of every group's current match, plus the aggregate distance
/// at the time the snapshot was taken.
#[derive(Debug, Clone)]
pub struct ResultTuple {
    pub matches: Vec<Option<Match>>,
    pub distance: Distance,
}

/// Bounded top-K ranked set of result tuples, sorted ascending by distance.
pub struct ResultSet {
    nexist_ceiling: u64,
    slots: Vec<ResultTuple>,
}

impl ResultSet {
    /// `group_count` sizes each tuple's match vector; `k` is the number of
    /// ranked slots kept. Every slot starts as a sentinel with no matches
    /// and `nexist` one above the printable ceiling, so it is only ever
    /// displaced by a genuine match and never printed on its own.
    pub fn new(group_count: usize, k: usize) -> Self {
        let nexist_ceiling = combinations2(group_count);
        let sentinel = ResultTuple {
            matches: vec![None; group_count],
            distance: Distance {
                nexist: nexist_ceiling + 1,
                ..Distance::zero()
            },
        };
        Self {
            nexist_ceiling,
            slots: vec![sentinel; k],
        }
    }

    /// The `nexist` value above which a tuple represents "no real
    /// co-location found at this rank" and should not be rendered.
    pub fn nexist_ceiling(&self) -> u64 {
        self.nexist_ceiling
    }

    pub fn slots(&self) -> &[ResultTuple] {
        &self.slots
    }

    /// Offer the current groups state (`matches`, `distance`) to the set.
    ///
    /// Scans existing tuples from last to first looking for the first one
    /// that shares any non-null group match with `matches`. If found, it is
    /// replaced only when `distance` is strictly lower — and the scan stops
    /// there either way, without considering other slots. Only when no
    /// tuple shares a match does the lowest-ranked (last) slot get a chance
    /// to be replaced outright. A successful replacement is then bubbled
    /// toward the front to keep the set sorted.
    pub fn offer(&mut self, matches: &[Option<Match>], distance: Distance) {
        let n = self.slots.len();
        let mut shared_index = None;
        for i in (0..n).rev() {
            if shares(&self.slots[i].matches, matches) {
                shared_index = Some(i);
                break;
            }
        }

        let mut i = match shared_index {
            Some(idx) => {
                if distance < self.slots[idx].distance {
                    self.slots[idx].matches = matches.to_vec();
                    self.slots[idx].distance = distance;
                    idx
                } else {
                    return;
                }
            }
            None => {
                let last = n - 1;
                if distance < self.slots[last].distance {
                    self.slots[last].matches = matches.to_vec();
                    self.slots[last].distance = distance;
                }
                last
            }
        };

        while i > 0 && self.slots[i].distance < self.slots[i - 1].distance {
            self.slots.swap(i, i - 1);
            i -= 1;
        }
    }
}

fn shares(tuple_matches: &[Option<Match>], current: &[Option<Match>]) -> bool {
    tuple_matches
        .iter()
        .zip(current.iter())
        .any(|(a, b)| a.is_some() && a == b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn m(path: &str, offs: u64) -> Match {
        Match {
            path: PathBuf::from(path),
            bit_offset: offs,
            variant_index: 0,
        }
    }

    #[test]
    fn combinations2_matches_binomial() {
        assert_eq!(combinations2(0), 1);
        assert_eq!(combinations2(1), 1);
        assert_eq!(combinations2(2), 1);
        assert_eq!(combinations2(3), 3);
        assert_eq!(combinations2(4), 6);
    }

    #[test]
    fn sentinel_seeds_above_ceiling() {
        let rs = ResultSet::new(3, 2);
        assert_eq!(rs.nexist_ceiling(), 3);
        for slot in rs.slots() {
            assert_eq!(slot.distance.nexist, 4);
            assert!(slot.matches.iter().all(Option::is_none));
        }
    }

    #[test]
    fn first_offer_replaces_last_slot_and_sorts() {
        let mut rs = ResultSet::new(1, 2);
        rs.offer(&[Some(m("/a", 0))], Distance::zero());
        assert_eq!(rs.slots()[0].distance, Distance::zero());
        assert!(rs.slots()[0].matches[0].is_some());
    }

    #[test]
    fn dedup_replaces_sharing_tuple_only_if_strictly_better() {
        let mut rs = ResultSet::new(1, 3);
        let better = Distance {
            offs_diff: 5,
            ..Distance::zero()
        };
        let worse = Distance {
            offs_diff: 10,
            ..Distance::zero()
        };
        rs.offer(&[Some(m("/a", 0))], better);
        // Same match, worse distance: should not replace, and must not fall
        // through to clobbering an unrelated slot either.
        rs.offer(&[Some(m("/a", 0))], worse);
        assert_eq!(rs.slots()[0].distance, better);
        assert!(rs.slots().iter().skip(1).all(|s| s.matches[0].is_none()));
    }

    #[test]
    fn dedup_replaces_sharing_tuple_when_better() {
        let mut rs = ResultSet::new(1, 3);
        let worse = Distance {
            offs_diff: 10,
            ..Distance::zero()
        };
        let better = Distance {
            offs_diff: 1,
            ..Distance::zero()
        };
        rs.offer(&[Some(m("/a", 0))], worse);
        rs.offer(&[Some(m("/a", 0))], better);
        assert_eq!(rs.slots()[0].distance, better);
    }

    #[test]
    fn distinct_matches_fill_separate_slots_in_sorted_order() {
        let mut rs = ResultSet::new(1, 3);
        let d_mid = Distance {
            offs_diff: 5,
            ..Distance::zero()
        };
        let d_low = Distance {
            offs_diff: 1,
            ..Distance::zero()
        };
        let d_high = Distance {
            offs_diff: 9,
            ..Distance::zero()
        };
        rs.offer(&[Some(m("/a", 0))], d_mid);
        rs.offer(&[Some(m("/b", 0))], d_low);
        rs.offer(&[Some(m("/c", 0))], d_high);
        let distances: Vec<_> = rs.slots().iter().map(|s| s.distance).collect();
        let mut sorted = distances.clone();
        sorted.sort();
        assert_eq!(distances, sorted);
        assert_eq!(distances[0], d_low);
        assert_eq!(distances[1], d_mid);
        assert_eq!(distances[2], d_high);
    }

    #[test]
    fn worse_than_every_slot_is_dropped() {
        let mut rs = ResultSet::new(1, 1);
        rs.offer(&[Some(m("/a", 0))], Distance::zero());
        let worse = Distance {
            offs_diff: 100,
            ..Distance::zero()
        };
        rs.offer(&[Some(m("/b", 0))], worse);
        assert_eq!(rs.slots()[0].distance, Distance::zero());
    }
}
