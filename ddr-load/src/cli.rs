use clap::{Parser, ValueEnum};

const PATTERN_HELP: &str = "\
Patterns (-p):
   0 - 0x55
   1 - 0xAA
   2 - 0x5A
   3 - 0xA5
   4 - 0x55AA
   5 - 0xAA55
   6 - random
   7 - 8-byte address
   8 - 8-byte user defined (-v)
   9 - walking 1's - 0x8040201008040201
  10 - walking 0's - 0x7FBFDFEFF7FBFDFE
  11 - check adjacent bytes after modifying one byte in between";

/// Load DDR memory controllers with patterns.
#[derive(Parser, Debug, Clone)]
#[command(name = "ddr-load", version, about, after_help = PATTERN_HELP)]
pub struct LoadArgs {
    /// Hex mask of targets to load: bits 0-3 = DMS0-DMS3, bit 4 = OCM
    #[arg(
        short = 'd',
        long = "ddrcmask",
        value_name = "MASK",
        value_parser = parse_hex_u32,
        default_value = "0x1",
    )]
    pub ddrc_mask: u32,

    /// Read the buffer back after populating it
    #[arg(short = 'b', long)]
    pub readback: bool,

    /// Pattern selector, 0..=11
    #[arg(short = 'p', long, value_name = "PATTERN", default_value_t = 6)]
    pub pattern: u32,

    /// Hex 8-byte value for the user defined and adjacency patterns
    #[arg(
        short = 'v',
        long,
        value_name = "VALUE",
        value_parser = parse_hex_u64,
        default_value = "0xA55AAA555AA555AA",
    )]
    pub value: u64,

    /// Seconds to run; 0 runs until the pattern completes or the process is stopped
    #[arg(short = 't', long, value_name = "SECONDS", default_value_t = 0)]
    pub time: u64,

    /// Hex size of the buffer allocated per worker
    #[arg(
        short = 's',
        long,
        value_name = "SIZE",
        value_parser = parse_hex_usize,
        default_value = "0x100000",
    )]
    pub size: usize,

    /// Worker threads per selected target
    #[arg(
        short = 'w',
        long = "workers",
        visible_alias = "threads",
        value_name = "THREADS",
        default_value_t = 1,
    )]
    pub workers: u32,

    /// Access the buffer in random rather than sequential order
    #[arg(short = 'r', long)]
    pub random: bool,

    /// Measure copy bandwidth instead of loading a pattern
    #[arg(short = 'f', long)]
    pub performance: bool,

    /// Compare readback against the expected pattern and count mismatches
    #[arg(long)]
    pub verify: bool,

    /// Bulk copy strategy used by --performance
    #[arg(long, value_enum, default_value_t = CopyArg::Library)]
    pub copy: CopyArg,

    /// Threads used by the chunked copy strategy
    #[arg(long, value_name = "THREADS", default_value_t = 4)]
    pub copy_threads: usize,

    /// Seed for the random pattern and random offsets
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CopyArg {
    Library,
    Block,
    Chunked,
}

fn strip_hex_prefix(s: &str) -> String {
    let t = s.trim();
    t.strip_prefix("0x")
        .or_else(|| t.strip_prefix("0X"))
        .unwrap_or(t)
        .replace('_', "")
}

/// Parse a hexadecimal number; the `0x` prefix is optional.
pub fn parse_hex_u64(s: &str) -> Result<u64, String> {
    u64::from_str_radix(&strip_hex_prefix(s), 16)
        .map_err(|e| format!("invalid hex value '{}': {}", s, e))
}

pub fn parse_hex_u32(s: &str) -> Result<u32, String> {
    u32::from_str_radix(&strip_hex_prefix(s), 16)
        .map_err(|e| format!("invalid hex value '{}': {}", s, e))
}

pub fn parse_hex_usize(s: &str) -> Result<usize, String> {
    usize::from_str_radix(&strip_hex_prefix(s), 16)
        .map_err(|e| format!("invalid hex value '{}': {}", s, e))
}
