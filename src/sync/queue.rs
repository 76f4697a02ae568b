use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use super::ReleaseError;

struct RequestState {
    id: u64,
    released: Cell<bool>,
    /// The task waiting for this request to be released, if any
    successor: RefCell<Option<Waker>>,
}

impl RequestState {
    fn settle(&self) {
        self.released.set(true);

        let waker = self.successor.borrow_mut().take();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

/// A first-come-first-served mutex for async critical sections
///
/// Every call to [`acquire`](Self::acquire) appends a request to the tail of a queue.
/// A request is granted once the request queued directly before it has been released,
/// so grants happen strictly in the order `acquire` was called.
///
/// The mutex does not guard any data and does not release anything on its own.
/// A request that is never passed to [`release`](Self::release) blocks every request
/// queued after it, forever. There is no timeout and no cancellation.
///
/// Acquiring again while already holding the lock is not supported and deadlocks.
#[derive(Default)]
pub struct AsyncMutex {
    name: Option<String>,
    requests: RefCell<VecDeque<Rc<RequestState>>>,
    next_request_id: Cell<u64>,
}

/// A handle to one queued or granted request
///
/// Clones refer to the same request.
#[derive(Clone)]
pub struct LockRequest {
    state: Rc<RequestState>,
}

/// Future returned by [`AsyncMutex::acquire`]
///
/// The request is already queued when this is created; polling only waits for the grant.
pub struct Acquire<'a> {
    mutex: &'a AsyncMutex,
    request: Rc<RequestState>,
    prior: Option<Rc<RequestState>>,
    granted: bool,
}

impl AsyncMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mutex with a name that shows up in log messages
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("mutex")
    }

    /// Queue a new request and return a future that resolves once it is granted
    ///
    /// The request takes its place in line immediately, even if the returned future
    /// is not polled until later.
    pub fn acquire(&self) -> Acquire<'_> {
        let id = self.next_request_id.get();
        self.next_request_id.set(id + 1);

        let request = Rc::new(RequestState {
            id,
            released: Cell::new(false),
            successor: RefCell::new(None),
        });

        let prior = {
            let mut requests = self.requests.borrow_mut();
            let prior = requests.back().cloned();
            requests.push_back(request.clone());
            prior
        };

        if let Some(prior) = &prior {
            log::trace!(
                "{}: request #{id} queued behind #{}",
                self.name(),
                prior.id
            );
        } else {
            log::trace!("{}: request #{id} queued at head", self.name());
        }

        Acquire {
            mutex: self,
            request,
            prior,
            granted: false,
        }
    }

    /// Release a granted request and let the next one in line proceed
    ///
    /// Only the request at the head of the queue can be released. Otherwise the queue is
    /// left untouched and the reason is returned.
    pub fn release(&self, request: &LockRequest) -> Result<(), ReleaseError> {
        let position = self
            .requests
            .borrow()
            .iter()
            .position(|queued| Rc::ptr_eq(queued, &request.state));

        match position {
            Some(0) => {
                let head = self.requests.borrow_mut().pop_front();
                if let Some(head) = head {
                    head.settle();
                }

                log::debug!("{}: released request #{}", self.name(), request.id());
                Ok(())
            }
            Some(ahead) => {
                log::warn!(
                    "{}: cannot release request #{} ({ahead} requests ahead of it)",
                    self.name(),
                    request.id()
                );
                Err(ReleaseError::OutOfOrder)
            }
            None => {
                log::warn!(
                    "{}: cannot release request #{} (not queued)",
                    self.name(),
                    request.id()
                );
                Err(ReleaseError::NotFound)
            }
        }
    }

    /// Run `func` while holding the lock
    ///
    /// Once granted, the request is released when the critical section finishes,
    /// panics, or the returned future is dropped. Dropping the future while it is
    /// still waiting for the grant abandons the queued request, which then blocks
    /// every later request.
    pub async fn run_exclusive<F, Fut, T>(&self, func: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let request = self.acquire().await;
        let _release = ReleaseOnDrop {
            mutex: self,
            request,
        };

        func().await
    }

    /// Is any request queued or granted?
    pub fn is_locked(&self) -> bool {
        !self.requests.borrow().is_empty()
    }

    /// Number of requests that have not been released yet (including the holder)
    pub fn queue_len(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl fmt::Debug for AsyncMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<u64> = self.requests.borrow().iter().map(|r| r.id).collect();

        f.debug_struct("AsyncMutex")
            .field("name", &self.name())
            .field("requests", &ids)
            .finish()
    }
}

struct ReleaseOnDrop<'a> {
    mutex: &'a AsyncMutex,
    request: LockRequest,
}

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.mutex.release(&self.request) {
            log::error!(
                "{}: failed to release request #{} after critical section: {err}",
                self.mutex.name(),
                self.request.id()
            );
        }
    }
}

impl LockRequest {
    /// Position of this request in the order of `acquire` calls on its mutex
    pub fn id(&self) -> u64 {
        self.state.id
    }

    pub fn is_released(&self) -> bool {
        self.state.released.get()
    }
}

impl PartialEq for LockRequest {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl Eq for LockRequest {}

impl fmt::Debug for LockRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockRequest")
            .field("id", &self.id())
            .field("released", &self.is_released())
            .finish()
    }
}

impl Acquire<'_> {
    /// The handle for the queued request, available before it is granted
    pub fn request(&self) -> LockRequest {
        LockRequest {
            state: self.request.clone(),
        }
    }

    pub fn is_granted(&self) -> bool {
        self.granted
    }
}

impl Future for Acquire<'_> {
    type Output = LockRequest;

    fn poll(mut self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(prior) = &self.prior {
            if !prior.released.get() {
                *prior.successor.borrow_mut() = Some(ctx.waker().clone());
                return Poll::Pending;
            }
        }

        if !self.granted {
            self.granted = true;
            self.prior = None;
            log::debug!(
                "{}: granted request #{}",
                self.mutex.name(),
                self.request.id
            );
        }

        Poll::Ready(self.request())
    }
}

impl Drop for Acquire<'_> {
    fn drop(&mut self) {
        if !self.granted && !self.request.released.get() {
            log::warn!(
                "{}: request #{} dropped before it was granted; it stays queued",
                self.mutex.name(),
                self.request.id
            );
        }
    }
}
