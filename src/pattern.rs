// Pattern compiler: expands one user pattern specification into the
// cartesian product of {bit-shift variants} x {endianness variants}.
//
// Mirrors `group_add_ptn`/`ptn_unalign`/`ptn_group_modify` in birch_main.c:
// the base variant is built first, then (if unaligned) smeared to all
// eight bit-shifts by repeatedly left-shifting the *previous* shift's
// buffer by one more bit, then (if endian is Both) duplicated and
// byte-reversed.

use std::fmt;

use bitflags::bitflags;

use crate::bitarr;
use crate::error::PatternError;

pub const CHAR_BIT: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Float,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Unaligned,
    Aligned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
    Both,
}

bitflags! {
    /// Which short flags have been seen within one `-...` CLI argument
    /// cluster so far. Used to detect a distinct endian flag repeated in
    /// the same cluster (promotes to `Endian::Both`) and to reject
    /// conflicting alignment flags, the way the original's local
    /// `endian_set` boolean (and implicit alignment overwrite) did.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClusterFlags: u32 {
        const HELP        = 1 << 0;
        const UNALIGNED   = 1 << 1;
        const ALIGNED     = 1 << 2;
        const LITTLE      = 1 << 3;
        const BIG         = 1 << 4;
        const NATIVE      = 1 << 5;
        const INTEGER     = 1 << 6;
        const STRING      = 1 << 7;
        const FLOAT       = 1 << 8;
        const GROUP_LINK  = 1 << 9;
        const RESULT_COUNT = 1 << 10;
    }
}

impl ClusterFlags {
    /// Any of the three endian flags.
    pub fn has_endian(self) -> bool {
        self.intersects(Self::LITTLE | Self::BIG | Self::NATIVE)
    }
}

pub fn native_endian() -> Endian {
    if cfg!(target_endian = "little") {
        Endian::Little
    } else {
        Endian::Big
    }
}

/// User-facing pattern specification (one `PATTERN` CLI argument).
#[derive(Debug, Clone)]
pub struct PatternSpec {
    pub arg_text: String,
    pub data_type: DataType,
    pub alignment: Alignment,
    pub endian: Endian,
    pub size_bits: u64,
}

/// One compiled expansion of a pattern for a specific shift and endianness.
#[derive(Debug, Clone)]
pub struct PatternVariant {
    pub bytes: Vec<u8>,
    pub mask: Vec<u8>,
    pub offs_bits: u32,
    pub size_bits: u64,
    pub size_bytes: usize,
    /// Which of the group's `specs` this variant was expanded from —
    /// `-g` links several distinct user patterns into one group, and a
    /// group's current match must still be traced back to the exact
    /// spec (arg text, type, alignment, endian) that produced it.
    pub spec_index: usize,
    /// Matcher cursor position, reset to 0 at the start of each file.
    pub cursor: usize,
}

impl PatternVariant {
    fn new(bytes: Vec<u8>, mask: Vec<u8>, offs_bits: u32, size_bits: u64, spec_index: usize) -> Self {
        let size_bytes = bytes.len();
        debug_assert_eq!(mask.len(), size_bytes);
        Self {
            bytes,
            mask,
            offs_bits,
            size_bits,
            size_bytes,
            spec_index,
            cursor: 0,
        }
    }
}

/// A search group: one or more user pattern specs linked together with
/// `-g`, matched against as a single logical target (whichever spec's
/// variant completes first wins the group's current match). Holds the
/// immutable compiled variants and the specs that produced them, for
/// rendering — the group's current-match slot is owned by
/// `crate::scanner`/`crate::distance`, not here.
#[derive(Clone)]
pub struct PatternGroup {
    pub specs: Vec<PatternSpec>,
    pub variants: Vec<PatternVariant>,
}

impl fmt::Debug for PatternGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternGroup")
            .field("specs", &self.specs.len())
            .field("variants", &self.variants.len())
            .finish()
    }
}

impl PatternGroup {
    /// Fold `addition` (a freshly compiled single-spec group) into `self`,
    /// appending its spec and re-indexing its variants' `spec_index` to
    /// point at the newly appended slot. Mirrors `group_add_ptn` appending
    /// one more pattern's compiled variants onto an existing group's
    /// `ptns` array.
    pub fn extend(&mut self, addition: PatternGroup) {
        let base = self.specs.len();
        self.specs.extend(addition.specs);
        self.variants.extend(addition.variants.into_iter().map(|mut v| {
            v.spec_index += base;
            v
        }));
    }
}

fn mask_for(size_bits: u64, size_bytes: usize) -> Vec<u8> {
    let mut mask = vec![0xFFu8; size_bytes];
    let rem = (size_bits % CHAR_BIT as u64) as u32;
    if rem != 0 {
        let last = mask.len() - 1;
        mask[last] = (1u16 << rem) as u8 - 1;
    }
    mask
}

/// Left-shift a little-endian buffer by `shift` bits (`shift < 8`),
/// extending into `out_size_bytes` bytes (one wider than `arr` when the
/// shift pushes bits past the top byte). Mirrors `lshift_copy`.
fn lshift_copy(arr: &[u8], out_size_bytes: usize) -> Vec<u8> {
    let mut out = vec![0u8; out_size_bytes];
    let rshift = CHAR_BIT - 1;
    let mut prev = 0u8;
    for (i, &cur) in arr.iter().enumerate() {
        out[i] = (cur << 1) | (prev >> rshift);
        prev = cur;
    }
    if arr.len() < out_size_bytes {
        out[arr.len()] = prev >> rshift;
    }
    out
}

fn byte_reverse(arr: &[u8]) -> Vec<u8> {
    arr.iter().rev().copied().collect()
}

/// Smear a single aligned (shift-0) variant into the 8 shift variants
/// `[0, CHAR_BIT)`, each built from the previous by a further 1-bit shift.
fn unalign(base: PatternVariant) -> Vec<PatternVariant> {
    let mut out = Vec::with_capacity(CHAR_BIT as usize);
    out.push(base);
    for shift in 1..CHAR_BIT {
        let prev = &out[(shift - 1) as usize];
        let new_offs = prev.offs_bits + 1;
        let new_size_bits = prev.size_bits + new_offs as u64;
        let new_size_bytes = ((new_size_bits - 1) / CHAR_BIT as u64) as usize + 1;
        let bytes = lshift_copy(&prev.bytes, new_size_bytes);
        let mask = lshift_copy(&prev.mask, new_size_bytes);
        out.push(PatternVariant::new(bytes, mask, new_offs, prev.size_bits, prev.spec_index));
    }
    out
}

/// Compile one pattern spec into its full group of variants.
pub fn compile(spec: &PatternSpec) -> Result<PatternGroup, PatternError> {
    let size_bytes = ((spec.size_bits + CHAR_BIT as u64 - 1) / CHAR_BIT as u64) as usize;
    let mask = mask_for(spec.size_bits, size_bytes);

    let base_bytes = match spec.data_type {
        DataType::Integer => bitarr::parse_integer(&spec.arg_text, size_bytes)?,
        DataType::Float => compile_float(&spec.arg_text, spec.size_bits)?,
        DataType::String => compile_string(&spec.arg_text, size_bytes)?,
    };

    let base = PatternVariant::new(base_bytes, mask, 0, spec.size_bits, 0);

    let type_default_endian = match spec.data_type {
        DataType::Integer => Endian::Little,
        DataType::Float => native_endian(),
        DataType::String => spec.endian, // endian is ignored for strings
    };

    let mut variants = if spec.alignment == Alignment::Unaligned {
        unalign(base)
    } else {
        vec![base]
    };

    if spec.data_type != DataType::String {
        if spec.endian == Endian::Both {
            let mut reversed: Vec<PatternVariant> = variants
                .iter()
                .map(|v| {
                    PatternVariant::new(
                        byte_reverse(&v.bytes),
                        byte_reverse(&v.mask),
                        v.offs_bits,
                        v.size_bits,
                        v.spec_index,
                    )
                })
                .collect();
            variants.append(&mut reversed);
        } else if spec.endian != type_default_endian {
            for v in &mut variants {
                v.bytes.reverse();
                v.mask.reverse();
            }
        }
    }

    Ok(PatternGroup {
        specs: vec![spec.clone()],
        variants,
    })
}

fn compile_float(text: &str, size_bits: u64) -> Result<Vec<u8>, PatternError> {
    match size_bits {
        32 => {
            let f: f32 = text.parse().map_err(|_| PatternError::InvalidFloat {
                text: text.to_string(),
            })?;
            Ok(f.to_ne_bytes().to_vec())
        }
        64 => {
            let d: f64 = text.parse().map_err(|_| PatternError::InvalidFloat {
                text: text.to_string(),
            })?;
            Ok(d.to_ne_bytes().to_vec())
        }
        _ => Err(PatternError::UnsupportedFloatWidth {
            text: text.to_string(),
            size_bits,
        }),
    }
}

fn compile_string(text: &str, size_bytes: usize) -> Result<Vec<u8>, PatternError> {
    let bytes = text.as_bytes();
    if bytes.len() < size_bytes {
        return Err(PatternError::StringTooShort {
            text: text.to_string(),
            len: bytes.len(),
            size_bytes,
        });
    }
    Ok(bytes.to_vec())
}

pub fn type_to_str(t: DataType) -> &'static str {
    match t {
        DataType::Integer => "i",
        DataType::Float => "f",
        DataType::String => "s",
    }
}

pub fn alignment_to_str(a: Alignment) -> &'static str {
    match a {
        Alignment::Unaligned => "u",
        Alignment::Aligned => "a",
    }
}

pub fn endian_to_str(e: Endian) -> &'static str {
    match e {
        Endian::Little => "l",
        Endian::Big => "b",
        Endian::Both => "lb",
    }
}
