// Command-line surface for birch.
//
// `clap` owns only the outer shell — program name, `--version`, the
// trailing raw token capture, and the ambient `--json`/`-v`/`-q` flags.
// Everything inside that trailing capture (ROOTS, PATTERNS, and birch's
// own `-h`/`-r`/flag-cluster syntax) is interpreted by the hand-written
// state machine in `parse_args`, mirroring `parse_args` in
// `birch_main.c` — a state machine cannot be expressed as a clap
// subcommand tree because a flag cluster mutates sticky parser state and
// attaches to the *next* positional token.

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};
use log::{debug, warn};

use crate::distance::Match;
use crate::error::{ArgError, BirchError};
use crate::pattern::{
    Alignment, ClusterFlags, DataType, Endian, PatternGroup, PatternSpec, alignment_to_str,
    compile, endian_to_str, native_endian, type_to_str,
};
use crate::results::ResultSet;
use crate::scanner::{self, Groups};
use crate::walk;

const HELP_STR: &str = "\
Binary search with options for string, ints of any size, and standard \
C floats. All sizes and offsets in bits.
Attempts to find the \"smallest\" collection of one match from each search \
group. Collections will not span multiple directory tree branches.

Usage: birch ROOTS... PATTERNS... [OPTIONS...]
ROOTS: Pathnames at which to start the search, can be files or directories, \
if directories, a recursive search will be performed within.
PATTERNS: Of the form: \"type size pattern\".
type:
\tf: float
\ti: int
\ts: string
\ta: aligned
\tu: unaligned
\tl: little endian
\tb: big endian
\tn: native endian
\tg: group with last
Data type, alignment and endian can all be combined, further args maintain \
type settings from previous.
Example: \"-ial 32 42 -gf 32 42\"
a pattern group containing a 32 bit aligned little endian integer and a \
32 bit aligned little endian float.
OPTIONS: \"-r\": number of results to print, default 1.
";

#[derive(Parser, Debug)]
#[command(
    name = "birch",
    version,
    about = "Bit-level multi-pattern file search with co-location ranking",
    disable_help_flag = true,
    arg_required_else_help = true
)]
struct Cli {
    /// Emit ranked results as JSON instead of the textual block format.
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v, -vv).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error log output.
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// ROOTS..., PATTERNS..., and birch's own flag clusters (`-ial`, `-g`,
    /// `-r`, `-h`, ...), consumed verbatim by the hand-written parser.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

/// Parsed invocation: search roots, compiled pattern groups, and `-r`'s
/// result count.
struct Invocation {
    roots: Vec<PathBuf>,
    groups: Vec<PatternGroup>,
    result_count: usize,
}

/// `strtol(arg, 0, 0)` equivalent: `0x`/`0X` hex, leading `0` octal,
/// otherwise decimal.
fn parse_c_long(text: &str) -> Option<u64> {
    if let Some(rest) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(rest, 16).ok()
    } else if text.starts_with('0') && text.len() > 1 {
        u64::from_str_radix(&text[1..], 8).ok()
    } else {
        text.parse().ok()
    }
}

/// Run the §6 state machine over the raw trailing tokens.
fn parse_args(args: &[String]) -> Result<Invocation, ArgError> {
    if args.len() < 2 {
        return Err(ArgError::TooFewArgs);
    }

    #[derive(Clone, Copy, PartialEq, Eq)]
    enum State {
        Roots,
        Size,
        Pattern,
        ResultCount,
    }

    let mut state = State::Roots;
    let mut alignment = Alignment::Aligned;
    let mut endian = native_endian();
    let mut data_type = DataType::String;
    let mut data_size: u64 = crate::pattern::CHAR_BIT as u64;
    let mut group_link = false;

    let mut roots = Vec::new();
    let mut groups: Vec<PatternGroup> = Vec::new();
    let mut result_count: usize = 1;

    for arg in args {
        if let Some(cluster) = arg.strip_prefix('-') {
            let mut seen = ClusterFlags::empty();
            for c in cluster.chars() {
                match c {
                    'h' => {
                        println!("{HELP_STR}");
                        seen |= ClusterFlags::HELP;
                    }
                    'u' => {
                        alignment = Alignment::Unaligned;
                        state = State::Size;
                        seen |= ClusterFlags::UNALIGNED;
                    }
                    'a' => {
                        alignment = Alignment::Aligned;
                        state = State::Size;
                        seen |= ClusterFlags::ALIGNED;
                    }
                    'l' => {
                        endian = if !seen.has_endian() {
                            Endian::Little
                        } else if endian != Endian::Little {
                            Endian::Both
                        } else {
                            endian
                        };
                        state = State::Size;
                        seen |= ClusterFlags::LITTLE;
                    }
                    'b' => {
                        endian = if !seen.has_endian() {
                            Endian::Big
                        } else if endian != Endian::Big {
                            Endian::Both
                        } else {
                            endian
                        };
                        state = State::Size;
                        seen |= ClusterFlags::BIG;
                    }
                    'n' => {
                        endian = if !seen.has_endian() {
                            native_endian()
                        } else if endian != native_endian() {
                            Endian::Both
                        } else {
                            endian
                        };
                        state = State::Size;
                        seen |= ClusterFlags::NATIVE;
                    }
                    'i' => {
                        data_type = DataType::Integer;
                        state = State::Size;
                        seen |= ClusterFlags::INTEGER;
                    }
                    's' => {
                        data_type = DataType::String;
                        state = State::Size;
                        seen |= ClusterFlags::STRING;
                    }
                    'f' => {
                        data_type = DataType::Float;
                        state = State::Size;
                        seen |= ClusterFlags::FLOAT;
                    }
                    'g' => {
                        group_link = true;
                        seen |= ClusterFlags::GROUP_LINK;
                    }
                    'r' => {
                        state = State::ResultCount;
                        seen |= ClusterFlags::RESULT_COUNT;
                    }
                    other => return Err(ArgError::UnknownFlag(other)),
                }
            }
            continue;
        }

        match state {
            State::Roots => {
                roots.push(PathBuf::from(arg));
            }
            State::Size => {
                data_size = parse_c_long(arg).ok_or_else(|| ArgError::InvalidSize(arg.clone()))?;
                state = State::Pattern;
            }
            State::Pattern => {
                let spec = PatternSpec {
                    arg_text: arg.clone(),
                    data_type,
                    alignment,
                    endian,
                    size_bits: data_size,
                };
                let compiled = compile(&spec)?;
                if group_link {
                    if let Some(last) = groups.last_mut() {
                        last.extend(compiled);
                        group_link = false;
                    } else {
                        // `-g` with no existing group to attach to yet:
                        // start one and leave group_link set so the *next*
                        // pattern attaches to it, matching `parse_args`.
                        groups.push(compiled);
                    }
                } else {
                    groups.push(compiled);
                }
                state = State::Roots;
            }
            State::ResultCount => {
                result_count = parse_c_long(arg)
                    .ok_or_else(|| ArgError::InvalidResultCount(arg.clone()))?
                    as usize;
                state = State::Roots;
            }
        }
    }

    if result_count == 0 {
        return Err(ArgError::InvalidResultCount("0".to_string()));
    }

    Ok(Invocation {
        roots,
        groups,
        result_count,
    })
}

fn spec_tag(spec: &PatternSpec) -> String {
    format!(
        "{}{}{}",
        type_to_str(spec.data_type),
        alignment_to_str(spec.alignment),
        endian_to_str(spec.endian),
    )
}

/// Render one group's current match, or nothing if it never matched —
/// mirrors `match_print`'s `if (result->match.ptn != 0)` guard.
fn render_match_line(group: &PatternGroup, m: &Match) -> String {
    let spec = &group.specs[group.variants[m.variant_index].spec_index];
    format!(
        "\t{} {} {} 0x{:X}",
        spec.arg_text,
        spec_tag(spec),
        m.path.display(),
        m.bit_offset
    )
}

fn render_text(groups: &[PatternGroup], results: &ResultSet) {
    let ceiling = results.nexist_ceiling();
    for (rank, tuple) in results.slots().iter().enumerate() {
        if tuple.distance.nexist > ceiling {
            break;
        }
        println!(
            "{}: {:x} {:x} {:x} {:x}",
            rank + 1,
            tuple.distance.nexist,
            tuple.distance.dir_diff,
            tuple.distance.file_diff,
            tuple.distance.offs_diff
        );
        for (group, m) in groups.iter().zip(tuple.matches.iter()) {
            if let Some(m) = m {
                println!("{}", render_match_line(group, m));
            }
        }
    }
}

fn render_json(groups: &[PatternGroup], results: &ResultSet) {
    let ceiling = results.nexist_ceiling();
    let mut out = Vec::new();
    for tuple in results.slots() {
        if tuple.distance.nexist > ceiling {
            break;
        }
        let matches: Vec<serde_json::Value> = groups
            .iter()
            .zip(tuple.matches.iter())
            .map(|(group, m)| match m {
                Some(m) => {
                    let spec = &group.specs[group.variants[m.variant_index].spec_index];
                    serde_json::json!({
                        "pattern": spec.arg_text,
                        "type": spec_tag(spec),
                        "path": m.path.display().to_string(),
                        "bit_offset": m.bit_offset,
                    })
                }
                None => serde_json::Value::Null,
            })
            .collect();
        out.push(serde_json::json!({
            "distance": {
                "nexist": tuple.distance.nexist,
                "dir_diff": tuple.distance.dir_diff,
                "file_diff": tuple.distance.file_diff,
                "offs_diff": tuple.distance.offs_diff,
            },
            "matches": matches,
        }));
    }
    match serde_json::to_string_pretty(&out) {
        Ok(s) => println!("{s}"),
        Err(e) => warn!("failed to render JSON results: {e}"),
    }
}

/// Run the whole scan: walk every root, feed every file through every
/// group's variants, and return the populated ranked result set.
fn scan(invocation: &Invocation) -> Result<(Vec<PatternGroup>, ResultSet), BirchError> {
    let tree = walk::build(&invocation.roots)?;

    let group_count = invocation.groups.len();
    let mut live = Groups::new(invocation.groups.clone());
    let mut results = ResultSet::new(group_count, invocation.result_count);

    tree.visit_files(&mut |path| {
        scanner::scan_file(path, &mut live, &mut results).map_err(BirchError::from)
    })?;

    Ok((invocation.groups.clone(), results))
}

fn run_inner(cli: Cli) -> Result<(), BirchError> {
    let invocation = parse_args(&cli.args)?;

    if invocation.roots.is_empty() {
        eprintln!("At least one root path required");
        return Err(ArgError::NoRoots.into());
    }

    debug!(
        "scanning {} root(s) for {} pattern group(s), top {}",
        invocation.roots.len(),
        invocation.groups.len(),
        invocation.result_count
    );

    let (groups, results) = scan(&invocation)?;

    if cli.json {
        render_json(&groups, &results);
    } else {
        render_text(&groups, &results);
    }

    Ok(())
}

/// Main CLI entry point: parses arguments via clap's outer shell, hands
/// the trailing tokens to the state machine, scans, and renders. A fatal
/// `BirchError` prints to stderr and exits non-zero (spec calls for C's
/// `-1`; the closest `u8` exit code is 255).
pub fn run() -> ! {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let exit_code = match run_inner(cli) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("birch: {e}");
            255
        }
    };
    process::exit(exit_code);
}
