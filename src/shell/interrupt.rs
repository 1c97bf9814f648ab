//! Ctrl-C handling for runs.
//!
//! The first SIGINT sets a flag the executor checks between steps and
//! restores the default disposition, so a second Ctrl-C kills the process.
//! Children in the foreground process group receive the signal too, so the
//! step running at that moment usually fails on its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

static INTERRUPTED: OnceLock<Arc<AtomicBool>> = OnceLock::new();

fn flag() -> &'static Arc<AtomicBool> {
    INTERRUPTED.get_or_init(|| Arc::new(AtomicBool::new(false)))
}

/// Install the SIGINT handler and return the flag it sets.
///
/// Safe to call more than once; every call returns the same flag.
pub fn install_interrupt_handler() -> Arc<AtomicBool> {
    let flag = Arc::clone(flag());

    #[cfg(unix)]
    {
        let handler = on_sigint as extern "C" fn(libc::c_int);
        // SAFETY: the handler only performs an atomic store and calls
        // signal(), which is async-signal-safe.
        unsafe {
            libc::signal(libc::SIGINT, handler as libc::sighandler_t);
        }
    }

    flag
}

#[cfg(unix)]
extern "C" fn on_sigint(_signal: libc::c_int) {
    if let Some(flag) = INTERRUPTED.get() {
        flag.store(true, Ordering::SeqCst);
    }
    // SAFETY: see install_interrupt_handler.
    unsafe {
        libc::signal(libc::SIGINT, libc::SIG_DFL);
    }
}
