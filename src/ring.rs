use crate::channel::TryRecvError;
use crate::fatal::{fatal, fatal_assert};
use crate::semaphore::Semaphore;
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// A single ring shared by all producers. Slot ownership is handed around by
// three mechanisms, none of which takes a lock on the fast path:
//
// ## Slot claiming (producer vs producer, producer vs consumer)
//
// 1. `free_slots` (counting semaphore, initially `capacity`) gates entry: a
//    producer holds a permit before it may touch any slot. This is the
//    backpressure point and the only place a producer can block.
// 2. `tail.fetch_add(1)` then assigns a unique logical position; masked,
//    that is the producer's exclusive slot index. The semaphore guarantees
//    the slot behind that index has been vacated by the consumer (permits
//    exist only for vacated slots), and the fetch-add guarantees no other
//    producer holds the same index.
//
// ## Publication (producer -> consumer)
//
// The producer writes the value, then stores `ready[i] = true` (SeqCst).
// The consumer loads `ready[i]` with at least Acquire before touching the
// slot, so observing the flag implies observing the complete value. The
// consumer clears the flag (SeqCst) only after moving the value out and
// before releasing a permit, so a producer can never be handed a slot whose
// flag is still set from the previous occupant.
//
// ## Parking (consumer wait / producer wake) — the lost-wakeup race
//
// The consumer parks on the condvar when the head slot is not ready. The
// naive protocol loses wakeups:
//
//   consumer: ready[i] is false
//   producer: ready[i] = true
//   producer: waiting is false, so does not notify
//   consumer: waiting = true; parks forever
//
// The fix is ordering on both sides, with SeqCst so the two stores and the
// two loads fall into a single total order:
//
//   consumer: waiting = true  BEFORE its final check of ready[i]
//             (the check runs inside the wait predicate, under the mutex)
//   producer: ready[i] = true BEFORE its check of waiting
//
// Whichever side's store lands second, the other side's subsequent load
// sees it: either the producer observes `waiting == true` and notifies
// (under the mutex, so never in the gap between the consumer's predicate
// check and its park), or the consumer's predicate observes
// `ready[i] == true` and never parks. The same pairing covers
// disconnection, with `sender_count` hitting zero playing the role of the
// ready flag.
//
// ## Single-writer field
//
// `head` is a plain (non-atomic) cell: it is read and written only by the
// consumer. There is exactly one `Receiver`, it cannot be cloned, and its
// receive methods take `&mut self`, so the single-writer invariant is
// enforced statically at the handle layer.
//
// =============================================================================

/// The shared channel core: slot array, claim/publish protocol, and the
/// park/wake rendezvous. Lives behind an `Arc` held by the handles; never
/// exposed to users directly.
pub(crate) struct Ring<T> {
    // === PRODUCER HOT ===
    /// Next logical position to claim. Claim order is delivery order.
    ///
    /// Unbounded u64 sequence, masked only at slot access: monotonic values
    /// keep the accounting arithmetic (`tail - head`) trivial, and wrapping
    /// a u64 is not a practical concern.
    tail: CachePadded<AtomicU64>,

    // === CONSUMER HOT ===
    /// Next logical position to drain. Written only by the consumer.
    head: CachePadded<UnsafeCell<u64>>,

    // === RENDEZVOUS === (touched only around blocking)
    /// True while the consumer is parked in `recv`.
    waiting: AtomicBool,
    /// Number of live `Sender` handles.
    sender_count: AtomicUsize,
    /// Guards only the park/wake handshake, never the slot storage.
    monitor: Mutex<()>,
    /// Signalled when a value is published or the last sender disconnects.
    head_slot_event: Condvar,

    /// Producer backpressure: one permit per vacated slot.
    free_slots: Semaphore,

    // === STORAGE ===
    mask: usize,
    /// Occupancy flags, one per slot. `ready[i]` is true iff `slots[i]`
    /// holds a fully written value not yet moved out.
    ready: Box<[AtomicBool]>,
    /// Raw slot storage. A slot is initialized exactly while its ready flag
    /// is observable as true, plus the claiming producer's private window
    /// between write and publish.
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// Safety: the claim/publish protocol hands each slot to exactly one thread
// at a time, so the ring may be shared freely between threads moving T's
// through it.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    /// Creates a ring with `capacity` slots and no live senders.
    ///
    /// Aborts the process if `capacity` is zero or not a power of two; this
    /// fires before any handle exists.
    pub(crate) fn new(capacity: usize) -> Self {
        fatal_assert!(capacity > 0, "channel capacity must be non-zero");
        fatal_assert!(
            capacity.is_power_of_two(),
            "channel capacity must be a power of two, got {capacity}"
        );

        let ready: Box<[AtomicBool]> = (0..capacity).map(|_| AtomicBool::new(false)).collect();
        let slots: Box<[UnsafeCell<MaybeUninit<T>>]> = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();

        Self {
            tail: CachePadded::new(AtomicU64::new(0)),
            head: CachePadded::new(UnsafeCell::new(0)),
            waiting: AtomicBool::new(false),
            sender_count: AtomicUsize::new(0),
            monitor: Mutex::new(()),
            head_slot_event: Condvar::new(),
            free_slots: Semaphore::new(capacity),
            mask: capacity - 1,
            ready,
            slots,
        }
    }

    /// Returns the ring capacity.
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.mask + 1
    }

    // ---------------------------------------------------------------------
    // PRODUCER SIDE
    // ---------------------------------------------------------------------

    /// Enqueues a value, blocking while the ring is full.
    pub(crate) fn send(&self, value: T) {
        // Backpressure gate. Holding a permit means one slot in
        // [head, head + capacity) is vacated and unclaimed.
        self.free_slots.acquire();

        // Claim: unique among producers per the fetch-add, vacated by the
        // consumer per the permit.
        let i = (self.tail.fetch_add(1, Ordering::Relaxed) as usize) & self.mask;

        // SAFETY: the permit plus the tail fetch-add make this slot
        // exclusively ours; no other thread reads or writes it until the
        // ready flag below is observed true.
        unsafe {
            (*self.slots[i].get()).write(value);
        }

        // Publish. Must come before the `waiting` load: see the lost-wakeup
        // analysis in the module header.
        self.ready[i].store(true, Ordering::SeqCst);

        if !self.waiting.load(Ordering::SeqCst) {
            return;
        }
        // Taking the mutex orders this notify after the consumer's
        // predicate check; it cannot land in the gap between the consumer's
        // last look at the flag and its park.
        let _guard = self
            .monitor
            .lock()
            .unwrap_or_else(|_| fatal!("ring monitor mutex poisoned"));
        self.head_slot_event.notify_one();
    }

    /// Registers one more live sender handle.
    pub(crate) fn inc_sender(&self) {
        self.sender_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Unregisters a sender handle; the last one out wakes a parked
    /// consumer so it can observe end-of-stream.
    pub(crate) fn dec_sender(&self) {
        // SeqCst, not AcqRel: the decrement plays the role of the ready
        // flag in the lost-wakeup pairing (module header), so it must fall
        // into the single total order with the consumer's `waiting` store
        // and its `sender_count` predicate load. A weaker RMW would permit
        // this thread to read a stale `waiting == false` below while the
        // consumer's predicate still reads a stale nonzero count, and the
        // consumer parks forever.
        let prev = self.sender_count.fetch_sub(1, Ordering::SeqCst);
        fatal_assert!(prev > 0, "sender count underflow");
        if prev > 1 {
            return;
        }
        // All senders are now disconnected.
        if !self.waiting.load(Ordering::SeqCst) {
            return;
        }
        let _guard = self
            .monitor
            .lock()
            .unwrap_or_else(|_| fatal!("ring monitor mutex poisoned"));
        self.head_slot_event.notify_one();
    }

    // ---------------------------------------------------------------------
    // CONSUMER SIDE
    // ---------------------------------------------------------------------
    //
    // Both methods read and write `head` without atomics. This is sound
    // because the one `Receiver` is their only caller: it is never cloned
    // and its receive methods take `&mut self`, so exactly one thread runs
    // this code at a time.

    /// Dequeues the next value, blocking while the ring is empty and at
    /// least one sender is alive. Returns `None` once every sender has
    /// disconnected and the ring is drained.
    pub(crate) fn recv(&self) -> Option<T> {
        // SAFETY: single consumer, see above.
        let head = unsafe { *self.head.get() };
        let i = (head as usize) & self.mask;

        // Acquire pairs with the producer's publish: a true flag implies a
        // fully written value.
        if !self.ready[i].load(Ordering::Acquire) {
            {
                let mut guard = self
                    .monitor
                    .lock()
                    .unwrap_or_else(|_| fatal!("ring monitor mutex poisoned"));
                // `waiting` must be set before the predicate's re-check of
                // the flag; see the lost-wakeup analysis in the module
                // header.
                self.waiting.store(true, Ordering::SeqCst);
                // Predicate wait: immune to spurious wakeups.
                while !(self.sender_count.load(Ordering::SeqCst) == 0
                    || self.ready[i].load(Ordering::SeqCst))
                {
                    guard = self
                        .head_slot_event
                        .wait(guard)
                        .unwrap_or_else(|_| fatal!("ring monitor mutex poisoned"));
                }
            }
            // Awake; ordering on the flag no longer matters.
            self.waiting.store(false, Ordering::Relaxed);
            if !self.ready[i].load(Ordering::Relaxed) {
                // Only reachable through the disconnect arm of the
                // predicate: no value here and none can ever arrive.
                debug_assert_eq!(self.sender_count.load(Ordering::Relaxed), 0);
                return None;
            }
        }

        Some(self.take(head, i))
    }

    /// Non-blocking dequeue, distinguishing a momentarily empty ring from a
    /// fully disconnected one.
    pub(crate) fn try_recv(&self) -> Result<T, TryRecvError> {
        // SAFETY: single consumer, see above.
        let head = unsafe { *self.head.get() };
        let i = (head as usize) & self.mask;

        if !self.ready[i].load(Ordering::Acquire) {
            return if self.sender_count.load(Ordering::SeqCst) == 0 {
                Err(TryRecvError::Disconnected)
            } else {
                Err(TryRecvError::Empty)
            };
        }
        Ok(self.take(head, i))
    }

    /// Vacates slot `i` (logical position `head`) after its ready flag was
    /// observed true with at least Acquire ordering.
    fn take(&self, head: u64, i: usize) -> T {
        // SAFETY: flag observed true, so the slot holds a fully written
        // value, and no producer touches it again until the permit release
        // below.
        let value = unsafe { (*self.slots[i].get()).assume_init_read() };
        // SAFETY: single consumer, see above.
        unsafe {
            *self.head.get() = head + 1;
        }
        // Clear after the read (the storage must be logically empty before
        // any producer can recycle it) and before the permit release (a
        // producer handed this slot must never find the flag still set).
        self.ready[i].store(false, Ordering::SeqCst);
        self.free_slots.release();
        value
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        // No handle remains, so nothing is in flight: every position is
        // either free or fully queued.
        let tail = self.tail.load(Ordering::Relaxed);
        let head = *self.head.get_mut();
        let queued = tail.wrapping_sub(head) as usize;

        fatal_assert!(
            self.capacity() == self.free_slots.available() + queued,
            "slot accounting broken at teardown: capacity {} != free {} + queued {}",
            self.capacity(),
            self.free_slots.available(),
            queued
        );

        // Values sent but never received still own their payloads.
        for pos in head..tail {
            let i = (pos as usize) & self.mask;
            // SAFETY: positions in [head, tail) were published and never
            // vacated, so each slot holds an initialized value.
            unsafe {
                self.slots[i].get_mut().assume_init_drop();
            }
        }
    }
}
