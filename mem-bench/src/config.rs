use serde::Serialize;

use mem_primitives::CopyKind;

use crate::cli::BenchArgs;
use crate::error::BenchError;

const MB: usize = 1024 * 1024;
const GB: usize = 1024 * MB;

/// Accepted SIZE arguments.
pub const SIZES: [(&str, usize); 7] = [
    ("1MB", MB),
    ("2MB", 2 * MB),
    ("4MB", 4 * MB),
    ("8MB", 8 * MB),
    ("256MB", 256 * MB),
    ("512MB", 512 * MB),
    ("1GB", GB),
];

/// Sizes the single-access tests accept.
pub const SINGLE_ACCESS_SIZES: [usize; 4] = [MB, 4 * MB, 8 * MB, GB];

/// Thread counts the chunked copy test accepts.
pub const COPY_THREADS: [usize; 4] = [1, 2, 4, 8];

/// Which measurement to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchTest {
    LibraryCopy,
    BlockCopy,
    ChunkedCopy { threads: usize },
    SingleRead,
    SingleWrite,
}

impl BenchTest {
    pub fn number(self) -> u32 {
        match self {
            BenchTest::LibraryCopy => 1,
            BenchTest::BlockCopy => 2,
            BenchTest::ChunkedCopy { .. } => 3,
            BenchTest::SingleRead => 4,
            BenchTest::SingleWrite => 5,
        }
    }

    /// Copy strategy for the iterated copy tests.
    pub fn copy_kind(self) -> Option<CopyKind> {
        match self {
            BenchTest::LibraryCopy => Some(CopyKind::Library),
            BenchTest::BlockCopy => Some(CopyKind::Block),
            BenchTest::ChunkedCopy { threads } => Some(CopyKind::Chunked { threads }),
            BenchTest::SingleRead | BenchTest::SingleWrite => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    pub test: BenchTest,
    pub size: usize,
    pub iterations: u32,
}

impl BenchConfig {
    pub fn from_args(args: &BenchArgs) -> Result<Self, BenchError> {
        if !(1..=5).contains(&args.test) {
            return Err(BenchError::InvalidTest(args.test));
        }
        let size = parse_size(&args.size)?;
        if args.test >= 4 && !SINGLE_ACCESS_SIZES.contains(&size) {
            return Err(BenchError::SizeNotAllowed {
                test: args.test,
                size: args.size.clone(),
            });
        }
        let test = match args.test {
            1 => BenchTest::LibraryCopy,
            2 => BenchTest::BlockCopy,
            3 => {
                let threads = args.threads.ok_or(BenchError::MissingThreads)?;
                if !COPY_THREADS.contains(&threads) {
                    return Err(BenchError::InvalidThreads(threads));
                }
                BenchTest::ChunkedCopy { threads }
            }
            4 => BenchTest::SingleRead,
            _ => BenchTest::SingleWrite,
        };
        if args.iterations == 0 {
            return Err(BenchError::NoIterations);
        }
        Ok(Self {
            test,
            size,
            iterations: args.iterations,
        })
    }
}

/// Parse a SIZE argument such as "256MB". Case-insensitive.
pub fn parse_size(s: &str) -> Result<usize, BenchError> {
    let t = s.trim();
    SIZES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(t))
        .map(|&(_, bytes)| bytes)
        .ok_or_else(|| BenchError::InvalidSize(s.to_string()))
}

/// Human-readable byte size.
pub fn format_size(bytes: usize) -> String {
    if bytes >= GB && bytes % GB == 0 {
        format!("{}GB", bytes / GB)
    } else if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= 1024 && bytes % 1024 == 0 {
        format!("{}KB", bytes / 1024)
    } else {
        format!("{}B", bytes)
    }
}
