//! Property-based checks of the invariants in spec §8: codec round-trip,
//! mask consistency, match correctness, and distance-aggregate equivalence
//! between the incremental and full-recompute paths.

use birch::bitarr::{parse_integer, render_hex};
use birch::distance::{self, Match};
use birch::pattern::{Alignment, DataType, Endian, PatternSpec, compile};
use proptest::prelude::*;
use std::path::PathBuf;

proptest! {
    #[test]
    fn bitarr_round_trip_any_bytes(bytes in proptest::collection::vec(any::<u8>(), 1..32)) {
        let hex = render_hex(&bytes);
        let parsed = parse_integer(&hex, bytes.len()).unwrap();
        prop_assert_eq!(parsed, bytes);
    }

    #[test]
    fn mask_consistency_for_compiled_variants(
        size_bits in 1u64..64,
        value in any::<u64>(),
        unaligned in any::<bool>(),
        both_endian in any::<bool>(),
    ) {
        let spec = PatternSpec {
            arg_text: format!("0x{value:x}"),
            data_type: DataType::Integer,
            alignment: if unaligned { Alignment::Unaligned } else { Alignment::Aligned },
            endian: if both_endian { Endian::Both } else { Endian::Little },
            size_bits,
        };
        let group = compile(&spec).unwrap();
        for v in &group.variants {
            prop_assert_eq!(v.bytes.len(), v.mask.len());
            for (b, m) in v.bytes.iter().zip(v.mask.iter()) {
                prop_assert_eq!(b & !m, 0);
            }
            // Low `offs_bits` bits of the first byte must be excluded from the mask.
            if v.offs_bits > 0 {
                let low_mask = (1u8 << v.offs_bits) - 1;
                prop_assert_eq!(v.mask[0] & low_mask, 0);
            }
        }
    }

    #[test]
    fn match_completion_iff_window_satisfies_mask(
        pattern in proptest::collection::vec(any::<u8>(), 1..4),
        haystack in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let mask = vec![0xFFu8; pattern.len()];
        let mut v = birch::pattern::PatternVariant {
            bytes: pattern.clone(),
            mask: mask.clone(),
            offs_bits: 0,
            size_bits: (pattern.len() as u64) * 8,
            size_bytes: pattern.len(),
            spec_index: 0,
            cursor: 0,
        };
        let size = pattern.len();
        for (j, &b) in haystack.iter().enumerate() {
            let completed = v.step(b);
            if j + 1 >= size {
                let window = &haystack[j + 1 - size..=j];
                let window_matches = window
                    .iter()
                    .zip(pattern.iter())
                    .zip(mask.iter())
                    .all(|((w, p), m)| (w & m) == *p);
                if window_matches {
                    prop_assert!(completed);
                }
            }
        }
    }

    #[test]
    fn distance_incremental_matches_recompute(
        updates in proptest::collection::vec(
            (0usize..4, any::<bool>(), 0u64..3, 0u64..200),
            0..80,
        ),
    ) {
        let mut matches: Vec<Option<Match>> = vec![None; 4];
        let mut d = distance::recompute(&matches);
        for (g, present, dir, offs) in updates {
            let old = matches[g].clone();
            let new = if present {
                Some(Match {
                    path: PathBuf::from(format!("/root/dir{dir}/f.bin")),
                    bit_offset: offs,
                    variant_index: 0,
                })
            } else {
                None
            };
            d = distance::update_incremental(d, g, old.as_ref(), new.as_ref(), &matches);
            matches[g] = new;
            prop_assert_eq!(d, distance::recompute(&matches));
        }
    }
}
