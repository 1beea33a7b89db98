use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{LedgerError, Result};

/// Entry lock shared by every state-mutating entry point.
///
/// Mutating calls are serialized system-wide, so a second acquisition while
/// the flag is held can only be a recipient handler re-entering mid-payout.
/// Acquisition fails instead of waiting.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: AtomicBool,
}

impl ReentrancyGuard {
    pub fn enter(&self) -> Result<EntryToken<'_>> {
        if self
            .entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(LedgerError::ReentrantCall);
        }
        Ok(EntryToken { guard: self })
    }

    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Relaxed)
    }
}

/// Releases the guard when dropped, on every exit path.
#[derive(Debug)]
pub struct EntryToken<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for EntryToken<'_> {
    fn drop(&mut self) {
        self.guard.entered.store(false, Ordering::Release);
    }
}
