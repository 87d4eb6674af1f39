//! SIGINT/SIGTERM handling.

use std::sync::atomic::{AtomicBool, Ordering};

/// Set once a termination signal arrives; polled by the driver.
pub static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn signal_handler(_sig: i32) {
    SHUTDOWN.store(true, Ordering::Release);
}

/// Route SIGINT and SIGTERM to [`SHUTDOWN`].
pub fn install_handlers() {
    // SAFETY: the handler only stores to an atomic, which is async-signal-safe.
    unsafe {
        libc::signal(libc::SIGTERM, signal_handler as *const () as libc::sighandler_t);
        libc::signal(libc::SIGINT, signal_handler as *const () as libc::sighandler_t);
    }
}
