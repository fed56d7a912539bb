//! Background scroll lock held by open modals.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tracing::debug;

/// Counts open modals; the background is locked while any guard is alive.
#[derive(Debug, Clone, Default)]
pub struct ScrollLock {
    holders: Arc<AtomicUsize>,
}

impl ScrollLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, holder: &'static str) -> ScrollLockGuard {
        let held = self.holders.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(holder, held, "background scroll locked");
        ScrollLockGuard {
            holders: Arc::clone(&self.holders),
            holder,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.holders.load(Ordering::SeqCst) > 0
    }

    pub fn holders(&self) -> usize {
        self.holders.load(Ordering::SeqCst)
    }
}

/// Releases its hold when dropped, whichever path closes the modal.
#[derive(Debug)]
pub struct ScrollLockGuard {
    holders: Arc<AtomicUsize>,
    holder: &'static str,
}

impl ScrollLockGuard {
    pub fn holder(&self) -> &'static str {
        self.holder
    }
}

impl Drop for ScrollLockGuard {
    fn drop(&mut self) {
        let held = self.holders.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        debug!(holder = self.holder, held, "background scroll released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_is_held_until_every_guard_drops() {
        let lock = ScrollLock::new();
        assert!(!lock.is_locked());

        let detail = lock.acquire("detail");
        let dialog = lock.acquire("create");
        assert_eq!(lock.holders(), 2);

        drop(detail);
        assert!(lock.is_locked());
        drop(dialog);
        assert!(!lock.is_locked());
    }

    #[test]
    fn clones_share_the_same_counter() {
        let lock = ScrollLock::new();
        let view = lock.clone();
        let guard = lock.acquire("detail");
        assert!(view.is_locked());
        assert_eq!(guard.holder(), "detail");
    }
}
