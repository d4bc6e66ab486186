use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};

/// Sequence number handed out when a request starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn number(&self) -> u64 {
        self.0
    }
}

/// Holds the result of the most recently *started* request.
///
/// A slow, older request that finishes after a newer one is discarded instead
/// of overwriting the newer result.
#[derive(Debug)]
pub struct LatestSlot<T> {
    issued: AtomicU64,
    current: Mutex<Option<(Ticket, T)>>,
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self {
            issued: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }
}

impl<T: Clone> LatestSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_latest(&self, ticket: Ticket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.0
    }

    /// Store `value` if `ticket` is still the latest one issued.
    pub fn apply(&self, ticket: Ticket, value: T) -> bool {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);

        // Checked under the lock so two finishing requests cannot interleave.
        if !self.is_latest(ticket) {
            return false;
        }

        *current = Some((ticket, value));
        true
    }

    pub fn current(&self) -> Option<T> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(_, value)| value.clone())
    }
}
