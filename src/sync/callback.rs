//! Phase/progress callback contract (engine-side view): the engine calls
//! into a host-supplied [`SyncCallback`] at well-defined points so a UI (or
//! a headless logger) can report progress and, critically, interrupt a
//! long-running phase by returning a cancellation.
//!
//! Grounded in the same "progress sink that can abort the operation" shape
//! as [`orbit_core_interface::CopyProgress`], generalized to the coarser
//! phases of the sync engine itself (scanning, comparing, synchronizing)
//! rather than a single file's byte count.

use crate::error::OrbitError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Which stage of the overall run is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scanning,
    Comparing,
    Synchronizing,
}

/// Host-supplied sink for engine progress and cancellation.
///
/// Default method bodies are no-ops so a minimal implementation only needs
/// to override what it cares about -- mirroring `orbit_core_interface`'s
/// default-bodied `OrbitSystem` methods.
pub trait SyncCallback: Send + Sync {
    /// Called once when a new phase starts; `item_count` is a best-effort
    /// estimate of work items in the phase, when known in advance.
    fn init_new_phase(&self, phase: Phase, item_count: Option<u64>) {
        let _ = (phase, item_count);
    }

    /// Called frequently with a short human-readable status line.
    fn update_status(&self, message: &str) {
        let _ = message;
    }

    fn log_info(&self, message: &str) {
        let _ = message;
    }

    /// Polled periodically so a UI can repaint; `force` requests an
    /// immediate repaint regardless of the host's own throttling.
    /// Returning `false` requests cancellation of the current phase.
    fn request_ui_update(&self, force: bool) -> bool {
        let _ = force;
        true
    }

    /// A recoverable problem the engine is continuing past (e.g. one
    /// file's mod-time couldn't be set). Not fatal by itself.
    fn report_warning(&self, message: &str) {
        let _ = message;
    }

    /// A problem the engine cannot continue past for this item; the host
    /// decides whether the run as a whole should abort.
    fn report_error(&self, message: &str) -> ErrorResponse {
        let _ = message;
        ErrorResponse::Retry
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorResponse {
    Retry,
    Ignore,
    Abort,
}

/// A [`SyncCallback`] that reports nothing and never cancels; used as the
/// default when no host callback is supplied.
pub struct NoopCallback;
impl SyncCallback for NoopCallback {}

/// A cooperative cancellation flag shared between a host (which flips it,
/// e.g. from a "Cancel" button handler) and the engine (which checks it at
/// safe points between items, never mid-copy).
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns `OrbitError::Cancelled` if cancellation has been requested,
    /// else `Ok(())`. Intended to be called between items in a loop.
    pub fn check(&self) -> Result<(), OrbitError> {
        if self.is_cancelled() {
            Err(OrbitError::Cancelled)
        } else {
            Ok(())
        }
    }
}
