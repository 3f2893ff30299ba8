//! Single pending-work slot.
//!
//! Tracks the one scheduled-but-not-yet-finished work item a throttler may
//! own. Work items are identified by [`Ticket`]s carrying a monotonic
//! generation, so cancellation never depends on the execution context being
//! able to retract a queued job: a stale ticket simply fails [`PendingSlot::begin`].
//!
//! # State Machine
//!
//! ```text
//!              install()                begin(t)
//! ┌───────┐ ───────────> ┌───────────┐ ─────────> ┌─────────┐
//! │ Empty │              │ Scheduled │            │ Running │
//! └───────┘ <─────────── └───────────┘            └─────────┘
//!     ↑       cancel()         │ install()             │
//!     │                        ↓ (new ticket)          │ finish(t)
//!     └────────────────────────────────────────────────┘
//! ```
//!
//! The slot itself is not synchronized; the owner holds it behind a lock so
//! that install/cancel/begin are atomic with respect to each other.

/// Handle for one installed work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    /// Generation number of this ticket. Strictly increasing per slot.
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Phase of the work item currently held by the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Nothing pending
    Empty,
    /// Work item submitted, waiting for its delay or the worker
    Scheduled(Ticket),
    /// Work item is executing its action
    Running(Ticket),
}

/// At-most-one pending work item, keyed by generation.
///
/// # Invariants
///
/// - At most one ticket is live (Scheduled or Running) at any time
/// - A ticket transitions to Running at most once
/// - Generations issued by `install` strictly increase
#[derive(Debug, Clone)]
pub struct PendingSlot {
    state: SlotState,
    next_generation: u64,
}

impl Default for PendingSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self { state: SlotState::Empty, next_generation: 0 }
    }

    /// Cancel whatever is pending and install a fresh work item.
    ///
    /// A Running item is not interrupted; it simply stops being the current
    /// item, so its `finish` will not clear the new one.
    pub fn install(&mut self) -> Ticket {
        let ticket = Ticket(self.next_generation);
        self.next_generation += 1;
        self.state = SlotState::Scheduled(ticket);
        ticket
    }

    /// Clear the slot. Returns the ticket that was current, if any.
    ///
    /// Idempotent: cancelling an empty slot returns `None` and changes nothing.
    pub fn cancel(&mut self) -> Option<Ticket> {
        let previous = self.current();
        self.state = SlotState::Empty;
        previous
    }

    /// Atomically check that `ticket` is still scheduled and mark it running.
    ///
    /// Returns `false` if the ticket was cancelled, superseded, or has already
    /// started; the caller must then skip the action.
    pub fn begin(&mut self, ticket: Ticket) -> bool {
        if self.state == SlotState::Scheduled(ticket) {
            self.state = SlotState::Running(ticket);
            true
        } else {
            false
        }
    }

    /// Mark `ticket` finished, clearing the slot if it is still current.
    ///
    /// Returns `true` if the slot was cleared.
    pub fn finish(&mut self, ticket: Ticket) -> bool {
        if self.current() == Some(ticket) {
            self.state = SlotState::Empty;
            true
        } else {
            false
        }
    }

    /// The live ticket, whether scheduled or running.
    pub fn current(&self) -> Option<Ticket> {
        match self.state {
            SlotState::Empty => None,
            SlotState::Scheduled(ticket) | SlotState::Running(ticket) => Some(ticket),
        }
    }

    /// Current phase.
    pub fn state(&self) -> SlotState {
        self.state
    }

    /// Returns true if no work item is live.
    pub fn is_empty(&self) -> bool {
        self.state == SlotState::Empty
    }

    /// Returns true if the current work item is executing.
    pub fn is_running(&self) -> bool {
        matches!(self.state, SlotState::Running(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_then_begin_then_finish() {
        let mut slot = PendingSlot::new();
        assert!(slot.is_empty());

        let ticket = slot.install();
        assert_eq!(slot.state(), SlotState::Scheduled(ticket));

        assert!(slot.begin(ticket));
        assert!(slot.is_running());

        assert!(slot.finish(ticket));
        assert!(slot.is_empty());
    }

    #[test]
    fn superseded_ticket_cannot_begin() {
        let mut slot = PendingSlot::new();
        let first = slot.install();
        let second = slot.install();

        assert!(second.generation() > first.generation());
        assert!(!slot.begin(first));
        assert!(slot.begin(second));
    }

    #[test]
    fn cancelled_ticket_cannot_begin() {
        let mut slot = PendingSlot::new();
        let ticket = slot.install();

        assert_eq!(slot.cancel(), Some(ticket));
        assert!(!slot.begin(ticket));
        assert!(slot.is_empty());
    }

    #[test]
    fn cancel_on_empty_is_noop() {
        let mut slot = PendingSlot::new();

        assert_eq!(slot.cancel(), None);
        assert_eq!(slot.cancel(), None);
        assert!(slot.is_empty());
    }

    #[test]
    fn ticket_begins_at_most_once() {
        let mut slot = PendingSlot::new();
        let ticket = slot.install();

        assert!(slot.begin(ticket));
        assert!(!slot.begin(ticket));
    }

    #[test]
    fn finishing_stale_ticket_keeps_newer_item() {
        let mut slot = PendingSlot::new();
        let running = slot.install();
        assert!(slot.begin(running));

        // New request arrives while the old action is still executing
        let next = slot.install();

        assert!(!slot.finish(running));
        assert_eq!(slot.state(), SlotState::Scheduled(next));
    }

    #[test]
    fn cancel_while_running_clears_slot() {
        let mut slot = PendingSlot::new();
        let ticket = slot.install();
        assert!(slot.begin(ticket));

        assert_eq!(slot.cancel(), Some(ticket));
        assert!(!slot.finish(ticket));
        assert!(slot.is_empty());
    }
}
