//! railmutex provides a first-come-first-served async mutex
//!
//! Requests are granted strictly in the order they were made, which makes it suitable
//! for serializing sequences of commands (such as a train console talking to its
//! controller) that must never interleave. A small single-threaded runtime with
//! simulated time is included to drive such tasks deterministically.

use std::cell::RefCell;
use std::future::Future;

pub mod sync;

pub mod time;

pub mod runtime;
pub use runtime::Runtime;

pub use railmutex_macros::{main, test};

mod task;
pub use task::Task;
pub(crate) use task::{RcWrapper, TaskQueue};

thread_local! {
    /// The currently active runtime, if any
    static CONTEXT: RefCell<Option<runtime::Handle>> = const { RefCell::new(None) };
}

/// Spawn a new task in the current railmutex context
///
/// Note, this will panic if no railmutex context is active
pub fn spawn(future: impl Future<Output = ()> + 'static) {
    get_runtime().spawn(future)
}

pub fn get_runtime() -> runtime::Handle {
    CONTEXT.with(|hdl| {
        hdl.borrow()
            .as_ref()
            .expect("Not in a railmutex context!")
            .clone()
    })
}
