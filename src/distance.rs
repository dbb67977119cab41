// Distance calculator: the four-component lexicographic distance between
// two group matches, and the incremental maintenance of the aggregate
// cross-group distance vector as one group's current match is replaced
// in a single streaming pass.

use std::path::Path;

/// One group's current match: which variant matched, where, and at what
/// absolute bit offset. `None` is the "no match" sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub path: std::path::PathBuf,
    pub bit_offset: u64,
    /// Index into `PatternGroup::variants` identifying which variant matched,
    /// used only for display/dedup identity, not for distance.
    pub variant_index: usize,
}

/// Four-component lexicographic distance: `(nexist, dir_diff, file_diff, offs_diff)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Distance {
    pub nexist: u64,
    pub dir_diff: u64,
    pub file_diff: u64,
    pub offs_diff: u64,
}

impl Distance {
    pub const fn zero() -> Self {
        Self {
            nexist: 0,
            dir_diff: 0,
            file_diff: 0,
            offs_diff: 0,
        }
    }

    fn add(self, other: Self) -> Self {
        Self {
            nexist: self.nexist + other.nexist,
            dir_diff: self.dir_diff + other.dir_diff,
            file_diff: self.file_diff + other.file_diff,
            offs_diff: self.offs_diff + other.offs_diff,
        }
    }

    /// `self - other`, returning `None` on underflow of any component —
    /// the caller falls back to a full recompute rather than proceed on a
    /// wrapped accumulator.
    fn checked_sub(self, other: Self) -> Option<Self> {
        Some(Self {
            nexist: self.nexist.checked_sub(other.nexist)?,
            dir_diff: self.dir_diff.checked_sub(other.dir_diff)?,
            file_diff: self.file_diff.checked_sub(other.file_diff)?,
            offs_diff: self.offs_diff.checked_sub(other.offs_diff)?,
        })
    }
}

/// Number of path-separator characters in `path`.
fn sep_count(path: &Path) -> u64 {
    path.as_os_str()
        .as_encoded_bytes()
        .iter()
        .filter(|&&b| b == b'/')
        .count() as u64
}

/// Count path separators in the tail of each path beyond their common
/// byte prefix. Two paths sharing their full directory prefix contribute
/// 0 regardless of basename.
fn dir_diff(a: &Path, b: &Path) -> u64 {
    let a = a.as_os_str().as_encoded_bytes();
    let b = b.as_os_str().as_encoded_bytes();
    let common = a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count();
    let tail_a = std::path::Path::new(unsafe { std::ffi::OsStr::from_encoded_bytes_unchecked(&a[common..]) });
    let tail_b = std::path::Path::new(unsafe { std::ffi::OsStr::from_encoded_bytes_unchecked(&b[common..]) });
    sep_count(tail_a) + sep_count(tail_b)
}

/// The distance between two individual group matches.
pub fn pair_distance(a: Option<&Match>, b: Option<&Match>) -> Distance {
    match (a, b) {
        (Some(a), Some(b)) => Distance {
            nexist: 0,
            dir_diff: dir_diff(&a.path, &b.path),
            file_diff: if a.path != b.path { 1 } else { 0 },
            offs_diff: a.bit_offset.abs_diff(b.bit_offset),
        },
        _ => Distance {
            nexist: 1,
            dir_diff: 0,
            file_diff: 0,
            offs_diff: 0,
        },
    }
}

/// Full `O(G^2)` recomputation of the aggregate distance vector over every
/// *unordered* pair of group matches (each pair counted once). Equivalent
/// to, but much slower than, `update_incremental` — used by tests to
/// verify the incremental path's correctness.
///
/// `ptn_group_match_dist_update` updates exactly one delta per other group
/// when a group's match changes, and the running aggregate is seeded at
/// startup from `combinations2(group_count)` (the unordered pair count) —
/// so the maintained aggregate is the single-counted unordered sum, not a
/// doubled per-ordered-pair sum.
pub fn recompute(matches: &[Option<Match>]) -> Distance {
    if matches.len() < 2 {
        return Distance::zero();
    }
    let mut total = Distance::zero();
    for i in 0..matches.len() {
        for j in (i + 1)..matches.len() {
            total = total.add(pair_distance(matches[i].as_ref(), matches[j].as_ref()));
        }
    }
    total
}

/// Incrementally update the aggregate distance `d` as group `g_index`'s
/// current match changes from `old` to `new`, given every other group's
/// current match in `others` (indexed in parallel to the full group list,
/// with `g_index` itself included but skipped).
///
/// For every group other than the one being replaced, subtract its
/// pair-distance to the old match and add its pair-distance to the new
/// match. A per-pair subtraction can transiently underflow even though the
/// final total never does; on that event we abandon the partial sum and
/// recompute the true post-update total directly, rather than let an
/// earlier valid partial delta get discarded by a reset to the pre-update
/// sum.
pub fn update_incremental(
    d: Distance,
    g_index: usize,
    old: Option<&Match>,
    new: Option<&Match>,
    others: &[Option<Match>],
) -> Distance {
    if others.len() == 1 {
        return Distance::zero();
    }
    let mut d = d;
    for (h, other) in others.iter().enumerate() {
        if h == g_index {
            continue;
        }
        let old_pair = pair_distance(other.as_ref(), old);
        let new_pair = pair_distance(other.as_ref(), new);
        match d.add(new_pair).checked_sub(old_pair) {
            Some(next) => d = next,
            None => {
                let mut after = others.to_vec();
                after[g_index] = new.cloned();
                return recompute(&after);
            }
        }
    }
    d
}
