use ddr_load::signal::{install_handlers, SHUTDOWN};
use mem_primitives::MemfdAllocator;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    install_handlers();

    let alloc = MemfdAllocator::new();
    let mut stderr = std::io::stderr();
    let code = ddr_load::run_cli(std::env::args_os(), &alloc, &SHUTDOWN, &mut stderr);
    std::process::exit(code);
}
