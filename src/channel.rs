use crate::ring::Ring;
use std::sync::Arc;
use thiserror::Error;

/// Error returned by [`Receiver::try_recv`] when no value is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TryRecvError {
    /// The channel is currently empty but at least one sender is alive; a
    /// value may still arrive.
    #[error("channel is empty")]
    Empty,
    /// Every sender has been dropped. This call may race a final send and
    /// report `Disconnected` while that value is already queued; the next
    /// call returns it. Once the channel is drained as well, every further
    /// call returns `Disconnected`.
    #[error("all senders have disconnected")]
    Disconnected,
}

/// Creates a bounded channel with `capacity` slots, returning the sending
/// and receiving halves.
///
/// `capacity` must be a positive power of two (slot indices are computed
/// with a mask instead of a modulo); any other value aborts the process
/// before either handle exists.
///
/// # Example
///
/// ```
/// let (tx, mut rx) = mpsc_ring::channel::<u64>(8);
///
/// tx.send(1);
/// tx.send(2);
/// assert_eq!(rx.recv(), Some(1));
///
/// drop(tx);
/// // Queued values survive disconnection ...
/// assert_eq!(rx.recv(), Some(2));
/// // ... and afterwards the stream is permanently ended.
/// assert_eq!(rx.recv(), None);
/// ```
pub fn channel<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    let ring = Arc::new(Ring::new(capacity));
    let sender = Sender::attach(Arc::clone(&ring));
    (sender, Receiver { ring })
}

/// The sending half of a channel. Cloneable; fan-in grows by cloning.
///
/// Dropping the last `Sender` closes the channel: a receiver blocked in
/// [`Receiver::recv`] wakes up and observes end-of-stream once the queue is
/// drained.
pub struct Sender<T> {
    ring: Arc<Ring<T>>,
}

impl<T> Sender<T> {
    pub(crate) fn attach(ring: Arc<Ring<T>>) -> Self {
        ring.inc_sender();
        Self { ring }
    }

    /// Sends a value, blocking while the channel is full.
    ///
    /// Backpressure is blocking, never an error: there is no "channel full"
    /// result, and the call returns only once the value occupies a slot.
    ///
    /// # Hazard: no receiver-liveness detection
    ///
    /// A `Sender` cannot tell that the [`Receiver`] has been dropped. Sends
    /// into a receiverless channel succeed silently until the ring fills,
    /// after which they block forever. Structure shutdown so that senders
    /// stop before the receiver goes away.
    pub fn send(&self, value: T) {
        self.ring.send(value);
    }

    /// Returns the channel capacity.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self::attach(Arc::clone(&self.ring))
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        self.ring.dec_sender();
    }
}

/// The receiving half of a channel. Unique and move-only: it is never
/// cloned, and its methods take `&mut self`, which is what lets the ring
/// treat the head index as a single-writer field.
pub struct Receiver<T> {
    ring: Arc<Ring<T>>,
}

impl<T> Receiver<T> {
    /// Receives the next value, blocking while the channel is empty and at
    /// least one sender is alive.
    ///
    /// Returns `None` once every [`Sender`] has been dropped and all queued
    /// values have been received; from then on every call returns `None`.
    pub fn recv(&mut self) -> Option<T> {
        self.ring.recv()
    }

    /// Attempts to receive without blocking.
    ///
    /// Distinguishes a momentarily empty channel
    /// ([`TryRecvError::Empty`]) from one that can never produce another
    /// value ([`TryRecvError::Disconnected`]).
    pub fn try_recv(&mut self) -> Result<T, TryRecvError> {
        self.ring.try_recv()
    }

    /// Returns the channel capacity.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

// Note: Receiver intentionally does NOT implement Clone. A second receiver
// would break the single-writer invariant on the ring's head index that the
// whole consumer path relies on.
