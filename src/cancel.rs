use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Owner side of a cancellation request.
///
/// The run loop holds the source; only [`CancelSignal`] handles are passed
/// to the code that needs to stop early. Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelSource {
    flag: Arc<AtomicBool>,
}

/// Read-only view of a [`CancelSource`]
#[derive(Debug, Clone)]
pub struct CancelSignal {
    flag: Arc<AtomicBool>,
}

impl CancelSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Hand out a read-only signal
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            flag: self.flag.clone(),
        }
    }
}

impl CancelSignal {
    /// A signal that is never cancelled
    pub fn never() -> Self {
        CancelSource::new().signal()
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
