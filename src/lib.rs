//! mpsc-ring - Bounded Blocking Multi-Producer Single-Consumer Channel
//!
//! A fixed-capacity MPSC channel backed by a single circular buffer. Any
//! number of producer threads hand values to exactly one consumer thread
//! with bounded memory, backpressure when full, and a blocking wait when
//! empty.
//!
//! # Design
//!
//! - Producers claim slots with a counting semaphore (backpressure) plus an
//!   atomic fetch-and-increment of the tail (exclusivity). No two producers
//!   ever share a slot; no producer overwrites an unvacated slot.
//! - Each slot carries a ready flag; publishing a value is a release-style
//!   store of that flag, so the consumer never observes a torn value.
//! - The common path is lock-free: when slots are free and data is present,
//!   no mutex is touched. A mutex/condvar pair exists solely so the
//!   consumer can park when the channel is empty, with the flag protocol
//!   arranged so no wakeup is ever lost.
//! - Values arrive at the consumer in slot-claim order, which is the
//!   combined arrival order across all producers; per-producer order is
//!   always preserved.
//! - Capacity is a power of two, fixed at creation (mask indexing, no
//!   modulo).
//!
//! Closure is not an error: when every [`Sender`] is gone and the queue is
//! drained, [`Receiver::recv`] returns `None`, permanently. The only other
//! failure class (misuse of the constructor, broken internal accounting) is
//! treated as unrecoverable and aborts the process.
//!
//! # Example
//!
//! ```
//! use std::thread;
//!
//! let (tx, mut rx) = mpsc_ring::channel::<u64>(128);
//!
//! let producers: Vec<_> = (0..4)
//!     .map(|id| {
//!         let tx = tx.clone();
//!         thread::spawn(move || {
//!             for i in 0..100 {
//!                 tx.send(id * 1_000 + i);
//!             }
//!         })
//!     })
//!     .collect();
//! drop(tx);
//!
//! let mut received = 0;
//! while let Some(_value) = rx.recv() {
//!     received += 1;
//! }
//! assert_eq!(received, 400);
//!
//! for p in producers {
//!     p.join().unwrap();
//! }
//! ```

mod channel;
mod fatal;
mod ring;
mod semaphore;

pub use channel::{channel, Receiver, Sender, TryRecvError};
