use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Turns on verbose diagnostics. Flipped once at startup from the CLI flag;
/// never turned off again.
pub fn enable() {
    VERBOSE.store(true, Ordering::Relaxed);
}

/// Writes a diagnostic line to stderr when verbose mode is on. Payload
/// output always goes to stdout, never through here.
pub fn trace(message: &str) {
    if VERBOSE.load(Ordering::Relaxed) {
        eprintln!("{message}");
    }
}
