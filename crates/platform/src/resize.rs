//! Resize notification shared between the event loop and the frame driver.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// A shared dirty flag carrying the most recent window size.
///
/// The event loop raises the flag on every resize event; the frame driver
/// polls it once per frame with [`ResizeSignal::take`], which lowers the flag
/// and returns the pending size. Cloning is cheap and all clones observe the
/// same flag.
#[derive(Clone, Default)]
pub struct ResizeSignal {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    dirty: AtomicBool,
    width: AtomicU32,
    height: AtomicU32,
}

impl ResizeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new window size and raise the flag.
    pub fn notify(&self, width: u32, height: u32) {
        self.inner.width.store(width, Ordering::Relaxed);
        self.inner.height.store(height, Ordering::Relaxed);
        // Release pairs with the Acquire in `take` so the stored size is
        // visible to whichever thread consumes the flag.
        self.inner.dirty.store(true, Ordering::Release);
    }

    /// Consume a pending resize, if any.
    ///
    /// Returns `Some((width, height))` exactly once per raised flag; repeated
    /// notifications before a `take` coalesce into the latest size.
    pub fn take(&self) -> Option<(u32, u32)> {
        if self.inner.dirty.swap(false, Ordering::Acquire) {
            Some((
                self.inner.width.load(Ordering::Relaxed),
                self.inner.height.load(Ordering::Relaxed),
            ))
        } else {
            None
        }
    }

    /// Whether a resize is pending, without consuming it.
    pub fn is_pending(&self) -> bool {
        self.inner.dirty.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_consumes_flag() {
        let signal = ResizeSignal::new();
        assert_eq!(signal.take(), None);

        signal.notify(800, 600);
        assert!(signal.is_pending());
        assert_eq!(signal.take(), Some((800, 600)));
        assert_eq!(signal.take(), None);
    }

    #[test]
    fn test_notifications_coalesce() {
        let signal = ResizeSignal::new();
        signal.notify(800, 600);
        signal.notify(1024, 768);
        assert_eq!(signal.take(), Some((1024, 768)));
        assert_eq!(signal.take(), None);
    }

    #[test]
    fn test_clones_share_state() {
        let signal = ResizeSignal::new();
        let clone = signal.clone();
        signal.notify(640, 480);
        assert_eq!(clone.take(), Some((640, 480)));
        assert_eq!(signal.take(), None);
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ResizeSignal>();
    }
}
