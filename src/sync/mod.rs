//! Synchronization primitives for tasks running on a railmutex runtime

mod error;
pub use error::ReleaseError;

mod queue;
pub use queue::{Acquire, AsyncMutex, LockRequest};

mod mutex;
pub use mutex::{LockFuture, LockGuard, Mutex};

pub use tokio::sync::oneshot;
