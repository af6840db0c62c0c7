//! Triple-buffer pool.
//!
//! At any given time the pool can have:
//! - one buffer being filled by the worker thread,
//! - one buffer just completed and waiting to be shown on the next
//!   presentation tick,
//! - one buffer checked out by the renderer.
//!
//! Three slots make that rotation safe by construction regardless of the
//! relative speed of the two sides: producer and consumer can never hold
//! the same buffer, even when the consumer ticks far less often than the
//! producer publishes. Buffers are allocated once and recycled forever;
//! ownership moves with the buffer value itself, so there is nothing to
//! lock.
//!
//! Publishing over an unconsumed buffer supersedes it: the newest frame
//! wins and the stale one silently returns to the free list. That loss is
//! a design decision (freshness over completeness), counted but not
//! reported as an error.

/// Number of buffers per pool.
pub const POOL_SLOTS: usize = 3;

/// Fixed pool of reusable buffers with ownership hand-off.
#[derive(Debug)]
pub struct BufferPool<B> {
    free: Vec<B>,
    /// Buffers checked out for production (at most one by invariant).
    in_flight: usize,
    /// The completed buffer awaiting its presentation tick.
    ready: Option<B>,
    /// Buffers checked out for showing.
    showing: usize,
    superseded: u64,
}

impl<B> BufferPool<B> {
    /// Build a pool from a factory, invoked once per slot at startup.
    pub fn new(mut make: impl FnMut() -> B) -> Self {
        Self {
            free: (0..POOL_SLOTS).map(|_| make()).collect(),
            in_flight: 0,
            ready: None,
            showing: 0,
            superseded: 0,
        }
    }

    /// Check a buffer out for production.
    ///
    /// # Panics
    ///
    /// Panics if a buffer is already being produced, or if no slot is
    /// free. Both are programmer errors — the three-slot rotation
    /// guarantees a free buffer whenever the single-producer invariant
    /// holds.
    pub fn acquire(&mut self) -> B {
        assert!(
            self.in_flight == 0,
            "buffer pool: a buffer is already checked out for production"
        );
        let buffer = self
            .free
            .pop()
            .expect("buffer pool: no free slot despite rotation invariant");
        self.in_flight += 1;
        buffer
    }

    /// Hand a produced buffer over for presentation. If the previous one
    /// was never consumed it is superseded (latest frame wins).
    pub fn publish(&mut self, buffer: B) {
        debug_assert!(self.in_flight > 0, "publish without acquire");
        self.in_flight -= 1;
        if let Some(stale) = self.ready.replace(buffer) {
            self.superseded += 1;
            self.free.push(stale);
        }
    }

    /// Take the buffer awaiting show, if any. Non-blocking; a second call
    /// without an intervening publish returns `None` and the presenter
    /// simply repeats its last frame.
    pub fn take_ready(&mut self) -> Option<B> {
        let buffer = self.ready.take()?;
        self.showing += 1;
        Some(buffer)
    }

    /// Return a buffer the presenter has finished showing.
    pub fn release(&mut self, buffer: B) {
        debug_assert!(self.showing > 0, "release without take_ready");
        self.showing -= 1;
        self.free.push(buffer);
    }

    /// Return a produced buffer without publishing it (fault path, and
    /// the audio pair round-trip which has no show step).
    pub fn recycle(&mut self, buffer: B) {
        debug_assert!(self.in_flight > 0, "recycle without acquire");
        self.in_flight -= 1;
        self.free.push(buffer);
    }

    /// Whether a published buffer is waiting to be shown.
    #[must_use]
    pub fn has_ready(&self) -> bool {
        self.ready.is_some()
    }

    /// Frames deliberately dropped by supersession.
    #[must_use]
    pub fn superseded_count(&self) -> u64 {
        self.superseded
    }

    /// Whether a buffer is currently checked out for production.
    #[must_use]
    pub fn producing(&self) -> bool {
        self.in_flight > 0
    }

    #[cfg(test)]
    fn accounted_slots(&self) -> usize {
        self.free.len() + self.in_flight + usize::from(self.ready.is_some()) + self.showing
    }
}
