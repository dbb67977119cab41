// Scanner: drives one file at a time through every pattern group's
// variants, maintaining the aggregate distance incrementally and
// offering each newly completed match to the ranked result set.

use std::io::Read;
use std::path::Path;

use log::{debug, trace, warn};

use crate::distance::{self, Distance, Match};
use crate::error::ScanError;
use crate::pattern::PatternGroup;
use crate::results::{self, ResultSet};

const FILE_BUF_SIZE: usize = 16 * 1024;
const CHAR_BIT: u64 = 8;

/// Live scan state: the compiled groups plus each group's current match
/// and the aggregate distance across them. Current matches persist across
/// files within one scan — only the per-variant matcher cursor is reset
/// per file.
pub struct Groups {
    pub groups: Vec<PatternGroup>,
    pub matches: Vec<Option<Match>>,
    pub distance: distance::Distance,
}

impl Groups {
    pub fn new(groups: Vec<PatternGroup>) -> Self {
        let n = groups.len();
        let matches = vec![None; n];
        // Seed the live aggregate from the all-absent baseline
        // (`nexist = combinations2(n)`), mirroring `parse_args` seeding
        // `groups->match_dist[MATCH_NEXIST] = combinations2(groups)` before
        // any file is scanned. A zero seed would let the first completed
        // match in any one group look like a perfect co-location.
        let distance = distance::recompute(&matches);
        Self {
            groups,
            matches,
            distance,
        }
    }
}

/// Scan one file, updating `groups` and offering every completed match to
/// `results`. On I/O failure the error is logged and returned; the caller
/// treats this as fatal for the whole scan.
pub fn scan_file(path: &Path, groups: &mut Groups, results: &mut ResultSet) -> Result<(), ScanError> {
    debug!("scanning {}", path.display());

    for group in &mut groups.groups {
        for variant in &mut group.variants {
            variant.reset();
        }
    }

    let mut file = std::fs::File::open(path).map_err(|source| {
        warn!("failed to open {}: {source}", path.display());
        ScanError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let mut buf = [0u8; FILE_BUF_SIZE];
    let mut file_index: u64 = 0;
    loop {
        let n = file.read(&mut buf).map_err(|source| {
            warn!("failed to read {}: {source}", path.display());
            ScanError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;
        if n == 0 {
            break;
        }

        for (buf_index, &byte) in buf[..n].iter().enumerate() {
            for g_index in 0..groups.groups.len() {
                for v_index in 0..groups.groups[g_index].variants.len() {
                    let completed = groups.groups[g_index].variants[v_index].step(byte);
                    if !completed {
                        continue;
                    }
                    let variant = &groups.groups[g_index].variants[v_index];
                    // Bit position of the start of the byte that just
                    // completed the match, advanced to its end (+CHAR_BIT),
                    // then walked back by the pattern's own bit width to
                    // its first payload bit (adjusted by the unaligned
                    // shift `offs_bits`). Mirrors the offset expression in
                    // `birch_file` exactly.
                    let p_bits = (file_index + buf_index as u64) * CHAR_BIT;
                    let bit_offset = p_bits + variant.offs_bits as u64 + CHAR_BIT
                        - variant.size_bits;
                    let new_match = Match {
                        path: path.to_path_buf(),
                        bit_offset,
                        variant_index: v_index,
                    };
                    trace!(
                        "group {g_index} variant {v_index} matched at bit {bit_offset} in {}",
                        path.display()
                    );

                    let old = groups.matches[g_index].clone();
                    groups.distance = distance::update_incremental(
                        groups.distance,
                        g_index,
                        old.as_ref(),
                        Some(&new_match),
                        &groups.matches,
                    );
                    groups.matches[g_index] = Some(new_match);
                    results.offer(&groups.matches, groups.distance);
                }
            }
        }

        file_index += n as u64;
        if n < FILE_BUF_SIZE {
            break;
        }
    }
    Ok(())
}
