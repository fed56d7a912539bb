//! Quiet-window coalescing for rapid input.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

/// Identifies one scheduled dispatch; only the newest ticket may fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTicket(u64);

#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    generation: AtomicU64,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            generation: AtomicU64::new(0),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Supersedes any pending ticket and returns a fresh one.
    pub fn schedule(&self) -> DebounceTicket {
        DebounceTicket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Invalidates whatever is pending without scheduling anything new.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, ticket: DebounceTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }

    /// Waits out the quiet window; true when no newer ticket was issued meanwhile.
    pub async fn settle(&self, ticket: DebounceTicket) -> bool {
        tokio::time::sleep(self.window).await;
        self.is_current(ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn newer_ticket_supersedes_older_one() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let first = debouncer.schedule();
        let second = debouncer.schedule();

        assert!(!debouncer.settle(first).await);
        assert!(debouncer.settle(second).await);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_invalidates_pending_ticket() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let ticket = debouncer.schedule();
        debouncer.cancel();
        assert!(!debouncer.settle(ticket).await);
    }

    #[tokio::test(start_paused = true)]
    async fn settle_waits_for_the_full_window() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let started = tokio::time::Instant::now();
        let ticket = debouncer.schedule();
        assert!(debouncer.settle(ticket).await);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }
}
