use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;
use std::task::Context;

use futures::task::waker_ref;

use crate::time::Timer;
use crate::{RcWrapper, Task, TaskQueue, CONTEXT};

/// A single-threaded, cooperative executor
///
/// Tasks only yield at `.await` points. Waking a task never polls it right away;
/// it is appended to the ready queue and runs on the next call to `execute_tasks`.
/// When no task is ready, simulated time jumps to the next pending sleep.
#[derive(Default)]
pub struct Runtime {
    ready_tasks: Rc<RefCell<TaskQueue>>,
    timer: Rc<Timer>,
    next_task_id: Rc<Cell<u64>>,
}

struct ContextLock {}

impl ContextLock {
    fn new(runtime: &Runtime) -> Self {
        CONTEXT.with(|hdl| {
            let mut context = hdl.borrow_mut();
            if context.is_some() {
                panic!("We are already in a railmutex context!");
            }
            *context = Some(runtime.handle());
        });

        Self {}
    }
}

impl Drop for ContextLock {
    fn drop(&mut self) {
        CONTEXT.with(|hdl| {
            *hdl.borrow_mut() = None;
        });
    }
}

fn push_task(
    ready_tasks: &Rc<RefCell<TaskQueue>>,
    next_task_id: &Cell<u64>,
    future: impl Future<Output = ()> + 'static,
) {
    let id = next_task_id.get();
    next_task_id.set(id + 1);

    log::trace!("Spawning task #{id}");
    let task = Rc::new(Task::new(id, future, ready_tasks.clone()));
    ready_tasks.borrow_mut().push(task);
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run all tasks that are ready right now
    /// Will return true if any task ran
    pub fn execute_tasks(&self) -> bool {
        let ready_tasks = {
            let mut tasks = self.ready_tasks.borrow_mut();
            std::mem::take(&mut *tasks)
        };

        if ready_tasks.is_empty() {
            return false;
        } else {
            log::trace!("Found {} tasks that are ready", ready_tasks.len());
        }

        let context_lock = ContextLock::new(self);

        for task in ready_tasks.into_iter() {
            let mut fut_lock = task.get_future();

            if let Some(mut future) = fut_lock.take() {
                let wrapper: RcWrapper = task.clone().into();
                let wrapper = Arc::new(wrapper);
                let waker = waker_ref(&wrapper);
                let context = &mut Context::from_waker(&waker);

                if future.as_mut().poll(context).is_pending() {
                    *fut_lock = Some(future);
                } else {
                    log::trace!("Task #{} finished", task.id());
                }
            }
        }

        drop(context_lock);
        true
    }

    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) {
        push_task(&self.ready_tasks, &self.next_task_id, future);
    }

    /// Runs tasks and advances time until nothing can make progress anymore
    ///
    /// Tasks that are blocked forever (for example behind a lock that is never
    /// released) are left in place.
    pub fn run_until_stalled(&self) {
        while self.execute_tasks() || self.timer.advance() {}
    }

    /// Spawns a task and drives the runtime until it completes
    ///
    /// Note: This cannot be called from within a railmutex context.
    /// Panics if the future can no longer make progress.
    pub fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let output = Rc::new(RefCell::new(None));

        {
            let output = output.clone();
            self.spawn(async move {
                let value = future.await;
                *output.borrow_mut() = Some(value);
            });
        }

        loop {
            if let Some(value) = output.borrow_mut().take() {
                return value;
            }

            if !self.execute_tasks() && !self.timer.advance() {
                panic!("Runtime stalled: no task is ready and no timer is pending");
            }
        }
    }

    /// Drops all ready tasks and pending timers, so nothing runs again
    /// unless it is spawned anew
    pub fn stop(&self) {
        self.ready_tasks.borrow_mut().clear();
        self.timer.clear();
    }

    /// Creates a handle to this runtime
    /// that can be passed around
    pub fn handle(&self) -> Handle {
        Handle {
            ready_tasks: self.ready_tasks.clone(),
            timer: self.timer.clone(),
            next_task_id: self.next_task_id.clone(),
        }
    }

    pub fn get_timer(&self) -> &Timer {
        &self.timer
    }
}

#[derive(Clone)]
pub struct Handle {
    ready_tasks: Rc<RefCell<TaskQueue>>,
    timer: Rc<Timer>,
    next_task_id: Rc<Cell<u64>>,
}

impl Handle {
    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) {
        push_task(&self.ready_tasks, &self.next_task_id, future);
    }

    /// Drops all ready tasks and pending timers, so nothing runs again
    /// unless it is spawned anew
    pub fn stop(&self) {
        self.ready_tasks.borrow_mut().clear();
        self.timer.clear();
    }

    pub fn get_timer(&self) -> &Timer {
        &self.timer
    }
}
