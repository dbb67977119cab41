// Crate-wide error types.
//
// One enum per fallible subsystem, composed into `BirchError` at the CLI
// boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the bit-array codec (`bitarr`) and pattern compiler (`pattern`).
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("pattern '{text}': invalid integer literal")]
    InvalidInteger { text: String },
    #[error("pattern '{text}': unsupported float width {size_bits} bits (only 32 or 64 supported)")]
    UnsupportedFloatWidth { text: String, size_bits: u64 },
    #[error("pattern '{text}': invalid float literal")]
    InvalidFloat { text: String },
    #[error("pattern '{text}': string shorter than declared size ({len} < {size_bytes} bytes)")]
    StringTooShort {
        text: String,
        len: usize,
        size_bytes: usize,
    },
}

/// Errors from walking the directory tree (`walk`).
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("stat failed: {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("read directory failed: {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from scanning a single file (`scanner`).
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("read failed: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from parsing the command line (`cli`).
#[derive(Debug, Error)]
pub enum ArgError {
    #[error("requires at least one root and one pattern")]
    TooFewArgs,
    #[error("at least one root path required")]
    NoRoots,
    #[error("unrecognised flag: '{0}'")]
    UnknownFlag(char),
    #[error("expected a size in bits after '{0}'")]
    MissingSize(String),
    #[error("invalid size in bits: '{0}'")]
    InvalidSize(String),
    #[error("invalid result count: '{0}'")]
    InvalidResultCount(String),
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Top-level error, the union of every fatal condition the CLI surfaces.
#[derive(Debug, Error)]
pub enum BirchError {
    #[error(transparent)]
    Arg(#[from] ArgError),
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error(transparent)]
    Walk(#[from] WalkError),
    #[error(transparent)]
    Scan(#[from] ScanError),
}
