use std::cell::{RefCell, RefMut};
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::task::{Context, Poll};

use super::{Acquire, AsyncMutex, LockRequest};

/// A Mutex that owns its data and hands out access in the order `lock` was called
/// Useful if you want to hold a lock while waiting for some other task to complete
pub struct Mutex<T> {
    data: RefCell<T>,
    queue: AsyncMutex,
}

pub struct LockFuture<'a, T> {
    acquire: Acquire<'a>,
    mutex: &'a Mutex<T>,
}

/// Releases the lock when dropped
pub struct LockGuard<'a, T> {
    data: RefMut<'a, T>,
    request: LockRequest,
    mutex: &'a Mutex<T>,
}

impl<T> Mutex<T> {
    pub fn new(data: T) -> Self {
        Self {
            data: RefCell::new(data),
            queue: AsyncMutex::new(),
        }
    }

    pub fn with_name(data: T, name: impl Into<String>) -> Self {
        Self {
            data: RefCell::new(data),
            queue: AsyncMutex::with_name(name),
        }
    }

    /// Takes a place in line right away; await the result to get the guard
    ///
    /// Dropping the returned future before it resolves abandons its place in line,
    /// and every later `lock` call then waits forever.
    pub fn lock(&self) -> LockFuture<'_, T> {
        LockFuture {
            acquire: self.queue.acquire(),
            mutex: self,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.queue.is_locked()
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<'a, T> Future for LockFuture<'a, T> {
    type Output = LockGuard<'a, T>;

    fn poll(mut self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<Self::Output> {
        match Acquire::poll(Pin::new(&mut self.acquire), ctx) {
            Poll::Ready(request) => {
                let mutex = self.mutex;

                Poll::Ready(LockGuard {
                    data: mutex.data.borrow_mut(),
                    request,
                    mutex,
                })
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Deref for LockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T> DerefMut for LockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

impl<T> Drop for LockGuard<'_, T> {
    fn drop(&mut self) {
        // Waking only schedules the next holder; the borrow ends before it runs
        if let Err(err) = self.mutex.queue.release(&self.request) {
            log::error!(
                "{}: failed to release lock guard #{}: {err}",
                self.mutex.queue.name(),
                self.request.id()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};

    use super::{LockFuture, Mutex};

    use futures::task::{waker_ref, ArcWake};

    struct DummyWaker {}

    impl ArcWake for DummyWaker {
        fn wake_by_ref(_self_ptr: &Arc<Self>) {}
    }

    #[test]
    fn lock_unlock_mutex() {
        let mutex = Mutex::new(0u32);

        let waker = Arc::new(DummyWaker {});
        let waker = waker_ref(&waker);
        let context = &mut Context::from_waker(&waker);

        {
            let mut lock_fut = mutex.lock();
            let mut guard = match LockFuture::poll(Pin::new(&mut lock_fut), context) {
                Poll::Ready(guard) => guard,
                Poll::Pending => panic!("Lock returned pending"),
            };
            *guard += 1;

            // This lock should fail as the other one is still held
            let mut lock_fut = mutex.lock();
            let res = LockFuture::poll(Pin::new(&mut lock_fut), context);
            assert!(matches!(res, Poll::Pending));

            drop(guard);

            // The waiting request is next in line
            let res = LockFuture::poll(Pin::new(&mut lock_fut), context);
            assert!(matches!(res, Poll::Ready(ref guard) if **guard == 1));
        }

        assert!(!mutex.is_locked());
        assert_eq!(mutex.into_inner(), 1);
    }

    #[test]
    fn no_barging_after_release() {
        let mutex = Mutex::new(vec![]);

        let waker = Arc::new(DummyWaker {});
        let waker = waker_ref(&waker);
        let context = &mut Context::from_waker(&waker);

        let mut first = mutex.lock();
        let guard = match LockFuture::poll(Pin::new(&mut first), context) {
            Poll::Ready(guard) => guard,
            Poll::Pending => panic!("Lock returned pending"),
        };

        let mut waiting = mutex.lock();
        assert!(LockFuture::poll(Pin::new(&mut waiting), context).is_pending());

        drop(guard);

        // A newcomer must not overtake the request that was already waiting
        let mut newcomer = mutex.lock();
        assert!(LockFuture::poll(Pin::new(&mut newcomer), context).is_pending());

        match LockFuture::poll(Pin::new(&mut waiting), context) {
            Poll::Ready(mut guard) => guard.push("waiting"),
            Poll::Pending => panic!("waiting request was not granted"),
        }

        match LockFuture::poll(Pin::new(&mut newcomer), context) {
            Poll::Ready(mut guard) => guard.push("newcomer"),
            Poll::Pending => panic!("newcomer was not granted"),
        }

        drop((first, waiting, newcomer));
        assert_eq!(mutex.into_inner(), vec!["waiting", "newcomer"]);
    }

    #[test]
    fn dropped_lock_future_blocks_later_locks() {
        let mutex = Mutex::new(());

        let waker = Arc::new(DummyWaker {});
        let waker = waker_ref(&waker);
        let context = &mut Context::from_waker(&waker);

        let mut first = mutex.lock();
        let guard = match LockFuture::poll(Pin::new(&mut first), context) {
            Poll::Ready(guard) => guard,
            Poll::Pending => panic!("Lock returned pending"),
        };

        let mut abandoned = mutex.lock();
        assert!(LockFuture::poll(Pin::new(&mut abandoned), context).is_pending());
        drop(abandoned);
        drop(guard);

        let mut later = mutex.lock();
        assert!(LockFuture::poll(Pin::new(&mut later), context).is_pending());
        assert!(mutex.is_locked());
    }
}
