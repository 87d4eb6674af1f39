mod cli;
mod config;
mod error;
mod harness;
mod output;
mod stats;

use clap::Parser;
use cli::BenchArgs;
use config::{format_size, BenchConfig};
use harness::{run_bench, BenchResult};
use mem_primitives::MemfdAllocator;
use output::progress::BenchProgress;
use output::summary::print_summary;
use output::table::render_table;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = match BenchArgs::try_parse() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let config = match BenchConfig::from_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        test = config.test.number(),
        size = %format_size(config.size),
        iterations = config.iterations,
        "mem-bench starting"
    );

    let size_label = format_size(config.size);
    let (label, steps) = match config.test.copy_kind() {
        Some(kind) => (format!("{} @ {}", kind.build().name(), size_label), config.iterations),
        None => (format!("test {} @ {}", config.test.number(), size_label), 1),
    };
    let progress = BenchProgress::new(&label, steps);
    let cb = progress.callback();
    let result = run_bench(&config, &MemfdAllocator::new(), Some(&cb));
    progress.finish();

    let result = match result {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    print_summary(&result);
    if let BenchResult::Copy(ref r) = result {
        render_table(r);
    }

    if let Some(ref path) = args.json_file {
        if let Err(e) = output::json::write_json(path, &result) {
            eprintln!("Error writing JSON: {}", e);
            std::process::exit(1);
        }
    }
}
