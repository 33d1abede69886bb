//! SIGINT capture.
//!
//! The handler only flips an atomic flag; the executor polls it while a child
//! runs and the pipelines check it between steps.

use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Install the SIGINT handler. Call once, early in `main`.
pub fn install_handlers() -> anyhow::Result<()> {
    cfg_if::cfg_if! {
        if #[cfg(unix)] {
            use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

            extern "C" fn handler(_sig: i32) {
                INTERRUPTED.store(true, Ordering::SeqCst);
            }

            let action = SigAction::new(
                SigHandler::Handler(handler),
                SaFlags::empty(),
                SigSet::empty(),
            );
            unsafe {
                signal::sigaction(Signal::SIGINT, &action)
                    .map_err(|e| anyhow::anyhow!("Failed to register SIGINT handler: {e}"))?;
            }
        }
    }
    Ok(())
}

/// Whether the operator has pressed Ctrl-C since startup.
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Mark the run as interrupted from non-signal code (an aborted prompt).
pub fn raise() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}
