//! Latest-wins result slots for overlapping asynchronous requests.
//!
//! Each request takes a [`Ticket`] before it starts. When it finishes it
//! offers its result with that ticket; the slot only accepts results whose
//! ticket is newer than the last accepted one, so a slow response can never
//! overwrite a fresher one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Monotonic request number issued by [`LatestWins::issue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct Slot<T> {
    accepted: u64,
    value: Option<T>,
}

/// Holds the result of the newest completed request.
#[derive(Debug)]
pub struct LatestWins<T> {
    next: AtomicU64,
    slot: RwLock<Slot<T>>,
}

impl<T: Clone> LatestWins<T> {
    /// An empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
            slot: RwLock::new(Slot {
                accepted: 0,
                value: None,
            }),
        }
    }

    /// A slot seeded with an initial value that any issued ticket may replace.
    #[must_use]
    pub const fn with_value(value: T) -> Self {
        Self {
            next: AtomicU64::new(0),
            slot: RwLock::new(Slot {
                accepted: 0,
                value: Some(value),
            }),
        }
    }

    /// Take a ticket for a request that is about to start.
    pub fn issue(&self) -> Ticket {
        Ticket(self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Offer a completed result. Returns `false` if a newer result was
    /// already accepted and this one was discarded.
    pub fn offer(&self, ticket: Ticket, value: T) -> bool {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if ticket.0 <= slot.accepted {
            return false;
        }
        slot.accepted = ticket.0;
        slot.value = Some(value);
        true
    }

    /// The newest accepted value.
    pub fn current(&self) -> Option<T> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .value
            .clone()
    }

    /// Ticket of the newest accepted value, if any request has been accepted.
    pub fn accepted(&self) -> Option<Ticket> {
        let accepted = self
            .slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .accepted;
        (accepted > 0).then_some(Ticket(accepted))
    }
}

impl<T: Clone> Default for LatestWins<T> {
    fn default() -> Self {
        Self::new()
    }
}
