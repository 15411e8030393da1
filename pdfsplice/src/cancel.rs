//! Cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{PdfSpliceError, Result};

/// A cloneable cancellation flag.
///
/// Clones share the same flag: cancel one and every holder observes it.
/// Long-running operations poll [`Cancellation::check`] between units of
/// work (one page in the page-tree walk, one object during copying) and
/// abandon their partial output with [`PdfSpliceError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    /// Create a flag that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Return `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(PdfSpliceError::Cancelled)
        } else {
            Ok(())
        }
    }
}
