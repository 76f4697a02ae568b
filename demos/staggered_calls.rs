//! Staggered Calls Example
//!
//! Three callers need the same lock. Their critical sections take 3s, 2s and 1s,
//! and the whole sequence is issued twice. Even though the shorter calls would
//! finish first if they ran concurrently, the mutex grants access in call order:
//!
//! ```text
//! three, two, one, three, two, one
//! ```
//!
//! Run with `RUST_LOG=trace` to see requests being queued and granted.

use std::rc::Rc;

use railmutex::sync::AsyncMutex;
use railmutex::time::{self, Duration};

async fn call(mutex: Rc<AsyncMutex>, seconds: u64, msg: &'static str) {
    let request = mutex.acquire().await;

    println!("[{}] {msg} calling", time::now());
    time::sleep(Duration::from_seconds(seconds)).await;
    println!("[{}] {msg} resolved", time::now());

    if let Err(err) = mutex.release(&request) {
        eprintln!("{msg}: {err}");
    }
}

#[railmutex::main]
async fn main() {
    env_logger::init();

    let mutex = Rc::new(AsyncMutex::with_name("calls"));

    for _ in 0..2 {
        railmutex::spawn(call(mutex.clone(), 3, "\t\tthree"));
        railmutex::spawn(call(mutex.clone(), 2, "\ttwo"));
        railmutex::spawn(call(mutex.clone(), 1, "one"));
    }

    // Let the callers queue up, then wait behind all of them
    time::sleep(Duration::from_micros(1)).await;
    let last = mutex.acquire().await;
    mutex.release(&last).unwrap();

    println!("All calls finished at {}", time::now());
}
