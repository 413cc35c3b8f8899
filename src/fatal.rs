//! Fatal invariant checks.
//!
//! The channel has exactly two failure classes: expected run-time conditions
//! (an empty or disconnected channel, reported as values) and impossible
//! states (broken slot accounting, misuse of the constructor, a failed OS
//! synchronization primitive). The second class is never recoverable and is
//! never surfaced as a `Result`; it aborts the process with a diagnostic.
//!
//! Unlike `debug_assert!`, these checks stay active in release builds. They
//! guard memory safety (a miscounted slot means a double read or a lost
//! value), so compiling them out would trade a loud failure for a silent one.

use std::fmt;

/// Prints a diagnostic to stderr and aborts the process.
///
/// `abort` rather than `panic!`: a violated channel invariant means shared
/// state is already inconsistent, and unwinding through it (or catching the
/// panic) could let other threads keep using it.
#[cold]
#[inline(never)]
pub(crate) fn die(msg: fmt::Arguments<'_>) -> ! {
    eprintln!("mpsc-ring fatal: {msg}");
    std::process::abort();
}

/// Aborts the process with a formatted diagnostic.
macro_rules! fatal {
    ($($arg:tt)*) => {
        $crate::fatal::die(::std::format_args!($($arg)*))
    };
}

/// Aborts the process if the condition does not hold.
///
/// Used for construction-time validation and for the slot-accounting
/// check performed when the ring is torn down.
macro_rules! fatal_assert {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            $crate::fatal::die(::std::format_args!($($arg)*));
        }
    };
}

pub(crate) use fatal;
pub(crate) use fatal_assert;
