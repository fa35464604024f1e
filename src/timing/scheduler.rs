//! Per-frame wake-up requests.
//!
//! An engine never loops on its own.  After each unit of work it asks its
//! [`FrameScheduler`] for one more frame and remembers the returned
//! [`FrameToken`].  The host (the egui window, or a test) pumps the scheduler
//! once per display refresh and hands each due token back to the engine.
//!
//! ```text
//! engine ──request_frame()──▶ FrameQueue ──take_due()──▶ host
//!   ▲                                                      │
//!   └──────────────────── on_frame(token) ◀────────────────┘
//! ```
//!
//! Cancelling removes the request so it is never handed out.  A token that
//! was already handed out but no longer matches the engine's pending token is
//! stale and must be ignored by the engine.

// ---------------------------------------------------------------------------
// FrameToken
// ---------------------------------------------------------------------------

/// Opaque handle for one requested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameToken(u64);

impl FrameToken {
    /// Numeric id (monotonically increasing per scheduler).
    pub fn id(&self) -> u64 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// FrameScheduler trait
// ---------------------------------------------------------------------------

/// Source of "call me again on the next frame" requests.
pub trait FrameScheduler {
    /// Request one callback on the next frame.
    fn request_frame(&mut self) -> FrameToken;

    /// Withdraw a request.  Unknown or already-delivered tokens are ignored.
    fn cancel_frame(&mut self, token: FrameToken);

    /// Hand out every request that is due, oldest first.
    fn take_due(&mut self) -> Vec<FrameToken>;
}

// ---------------------------------------------------------------------------
// FrameQueue
// ---------------------------------------------------------------------------

/// Scheduler where every outstanding request is due on the next pump.
///
/// This matches a display-refresh callback: whatever was requested during
/// frame N runs during frame N+1.  The counters exist for tests that assert
/// the loop was (or was not) re-armed.
#[derive(Debug, Default)]
pub struct FrameQueue {
    next_id: u64,
    pending: Vec<FrameToken>,
    requested: u64,
    cancelled: u64,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests waiting for the next pump.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` when nothing is waiting.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Total requests made since construction.
    pub fn requested_count(&self) -> u64 {
        self.requested
    }

    /// Total requests withdrawn before delivery.
    pub fn cancelled_count(&self) -> u64 {
        self.cancelled
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&mut self) -> FrameToken {
        self.next_id += 1;
        self.requested += 1;
        let token = FrameToken(self.next_id);
        self.pending.push(token);
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        let before = self.pending.len();
        self.pending.retain(|t| *t != token);
        if self.pending.len() != before {
            self.cancelled += 1;
        }
    }

    fn take_due(&mut self) -> Vec<FrameToken> {
        std::mem::take(&mut self.pending)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_frames_become_due_once() {
        let mut q = FrameQueue::new();
        let a = q.request_frame();
        let b = q.request_frame();
        assert_eq!(q.take_due(), vec![a, b]);
        assert!(q.take_due().is_empty());
    }

    #[test]
    fn cancelled_frame_is_never_delivered() {
        let mut q = FrameQueue::new();
        let a = q.request_frame();
        q.cancel_frame(a);
        assert!(q.is_idle());
        assert!(q.take_due().is_empty());
        assert_eq!(q.cancelled_count(), 1);
    }

    #[test]
    fn cancelling_unknown_token_is_harmless() {
        let mut q = FrameQueue::new();
        let a = q.request_frame();
        let _ = q.take_due();
        q.cancel_frame(a);
        assert_eq!(q.cancelled_count(), 0);
    }

    #[test]
    fn tokens_are_unique_and_increasing() {
        let mut q = FrameQueue::new();
        let a = q.request_frame();
        let b = q.request_frame();
        assert!(b > a);
        assert_ne!(a.id(), b.id());
        assert_eq!(q.requested_count(), 2);
    }
}
