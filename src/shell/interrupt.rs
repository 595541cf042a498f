//! Ctrl-C handling.
//!
//! A SIGINT handler only flips a process-wide flag. Long-running work polls
//! an [`InterruptFlag`] between units of work and while waiting on child
//! processes, then unwinds with [`ResolverError::Interrupted`].

use crate::error::{ResolverError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static SIGINT_SEEN: AtomicBool = AtomicBool::new(false);

/// Install the SIGINT handler for the process.
pub fn install_handler() {
    #[cfg(unix)]
    {
        // SAFETY: the handler only performs an atomic store, which is
        // async-signal-safe.
        unsafe {
            libc::signal(libc::SIGINT, handle_sigint as libc::sighandler_t);
        }
    }
}

#[cfg(unix)]
extern "C" fn handle_sigint(_signal: libc::c_int) {
    SIGINT_SEEN.store(true, Ordering::SeqCst);
}

/// A cancellation flag, either the process-wide SIGINT flag or a local one.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    local: Option<Arc<AtomicBool>>,
}

impl InterruptFlag {
    /// The flag set by the SIGINT handler.
    pub fn process() -> Self {
        Self { local: None }
    }

    /// An independent flag, used by tests and embedders.
    pub fn detached() -> Self {
        Self {
            local: Some(Arc::new(AtomicBool::new(false))),
        }
    }

    fn cell(&self) -> &AtomicBool {
        match &self.local {
            Some(flag) => flag,
            None => &SIGINT_SEEN,
        }
    }

    pub fn is_set(&self) -> bool {
        self.cell().load(Ordering::SeqCst)
    }

    /// Raise the flag as if Ctrl-C had been pressed.
    pub fn raise(&self) {
        self.cell().store(true, Ordering::SeqCst);
    }

    /// Return `Err(Interrupted)` once the flag is raised.
    pub fn check(&self) -> Result<()> {
        if self.is_set() {
            Err(ResolverError::Interrupted)
        } else {
            Ok(())
        }
    }
}
