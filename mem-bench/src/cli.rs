use clap::Parser;

const TEST_HELP: &str = "\
Tests:
  1 - library memcpy
  2 - 128-byte block copy
  3 - multi-threaded chunked copy (THREADS: 1, 2, 4 or 8)
  4 - single timed read  (SIZE: 1MB, 4MB, 8MB or 1GB)
  5 - single timed write (SIZE: 1MB, 4MB, 8MB or 1GB)

Tests 1-3 time each iteration in three phases:
  T1 - invalidate the source cache
  T2 - copy source to destination
  T3 - flush the destination cache";

/// Memory copy and cache-maintenance timing
#[derive(Parser, Debug)]
#[command(name = "mem-bench", version, about, after_help = TEST_HELP)]
pub struct BenchArgs {
    /// Test number, 1..=5
    #[arg(value_name = "TEST")]
    pub test: u32,

    /// Buffer size: 1MB, 2MB, 4MB, 8MB, 256MB, 512MB or 1GB
    #[arg(value_name = "SIZE")]
    pub size: String,

    /// Copy threads for test 3
    #[arg(value_name = "THREADS")]
    pub threads: Option<usize>,

    /// Timed iterations for tests 1-3
    #[arg(long, default_value_t = 1000)]
    pub iterations: u32,

    /// Write JSON results to file
    #[arg(long)]
    pub json_file: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_args() {
        let args = BenchArgs::try_parse_from(["mem-bench", "3", "8MB", "4"]).unwrap();
        assert_eq!(args.test, 3);
        assert_eq!(args.size, "8MB");
        assert_eq!(args.threads, Some(4));
        assert_eq!(args.iterations, 1000);
        assert!(args.json_file.is_none());
    }

    #[test]
    fn test_threads_optional() {
        let args = BenchArgs::try_parse_from(["mem-bench", "1", "1MB"]).unwrap();
        assert_eq!(args.threads, None);
    }

    #[test]
    fn test_missing_size_is_error() {
        assert!(BenchArgs::try_parse_from(["mem-bench", "1"]).is_err());
    }

    #[test]
    fn test_flags() {
        let args = BenchArgs::try_parse_from([
            "mem-bench",
            "2",
            "4MB",
            "--iterations",
            "10",
            "--json-file",
            "out.json",
        ])
        .unwrap();
        assert_eq!(args.iterations, 10);
        assert_eq!(args.json_file.as_deref(), Some("out.json"));
    }
}
