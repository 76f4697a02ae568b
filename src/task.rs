use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use futures::task::ArcWake;

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Tasks that have been woken, in the order they were woken
pub(crate) type TaskQueue = Vec<Rc<Task>>;

pub(crate) struct RcWrapper(Rc<Task>);

// Wakers must be Send/Sync, but tasks never leave the runtime's thread
unsafe impl Send for RcWrapper {}
unsafe impl Sync for RcWrapper {}

impl From<Rc<Task>> for RcWrapper {
    fn from(task: Rc<Task>) -> Self {
        Self(task)
    }
}

impl ArcWake for RcWrapper {
    fn wake_by_ref(self_ptr: &Arc<Self>) {
        let task = &self_ptr.0;
        log::trace!("Waking task #{}", task.id);
        task.ready_tasks.borrow_mut().push(task.clone());
    }
}

/// A spawned future together with the queue it re-enters when woken
pub struct Task {
    id: u64,
    future: Mutex<Option<BoxFuture<'static, ()>>>,
    ready_tasks: Rc<RefCell<TaskQueue>>,
}

impl Task {
    pub(crate) fn new(
        id: u64,
        future: impl Future<Output = ()> + 'static,
        ready_tasks: Rc<RefCell<TaskQueue>>,
    ) -> Self {
        Self {
            id,
            future: Mutex::new(Some(Box::pin(future))),
            ready_tasks,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The future is `None` once the task has completed
    pub(crate) fn get_future(&self) -> MutexGuard<'_, Option<BoxFuture<'static, ()>>> {
        self.future.lock()
    }
}
