use std::cell::{Cell, RefCell};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use super::{Duration, Time};

struct TimeEvent {
    wake_time: Time,
    /// Breaks ties so events due at the same time fire in registration order
    sequence: u64,
    waker: Waker,
}

impl TimeEvent {
    fn key(&self) -> (Time, u64) {
        (self.wake_time, self.sequence)
    }
}

impl PartialEq for TimeEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for TimeEvent {}

impl PartialOrd for TimeEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

#[derive(Default)]
struct TimerState {
    next_sequence: Cell<u64>,
    events: RefCell<BinaryHeap<Reverse<TimeEvent>>>,
}

impl TimerState {
    fn register(&self, wake_time: Time, waker: Waker) {
        let sequence = self.next_sequence.get();
        self.next_sequence.set(sequence + 1);

        self.events.borrow_mut().push(Reverse(TimeEvent {
            wake_time,
            sequence,
            waker,
        }));
    }
}

#[derive(Default)]
pub struct Timer {
    current_time: Rc<Cell<Time>>,
    state: Rc<TimerState>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time
    pub fn now(&self) -> Time {
        self.current_time.get()
    }

    /// Forget all pending wake-ups; sleeping tasks will not be woken again
    pub fn clear(&self) {
        self.state.events.borrow_mut().clear();
    }

    pub fn has_pending_events(&self) -> bool {
        !self.state.events.borrow().is_empty()
    }

    /// Move time forward to the next event and wake everything due at that time
    ///
    /// Returns false if there was nothing left to wait for.
    pub fn advance(&self) -> bool {
        let mut due = vec![];

        {
            let mut events = self.state.events.borrow_mut();
            let Some(Reverse(first)) = events.pop() else {
                return false;
            };

            let wake_time = first.wake_time;
            due.push(first);

            while events
                .peek()
                .is_some_and(|Reverse(next)| next.wake_time == wake_time)
            {
                if let Some(Reverse(next)) = events.pop() {
                    due.push(next);
                }
            }

            if wake_time > self.current_time.get() {
                log::trace!("Advancing time to {wake_time}");
                self.current_time.set(wake_time);
            }
        }

        for event in due {
            event.waker.wake();
        }

        true
    }

    #[must_use]
    pub fn sleep_for(&self, duration: Duration) -> SleepFut {
        if duration.is_zero() {
            log::warn!("sleep_for called with no delay");
        }

        SleepFut {
            current_time: self.current_time.clone(),
            state: self.state.clone(),
            wake_time: self.now() + duration,
            registered: false,
        }
    }
}

pub struct SleepFut {
    current_time: Rc<Cell<Time>>,
    state: Rc<TimerState>,
    wake_time: Time,
    registered: bool,
}

impl Future for SleepFut {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.current_time.get() >= self.wake_time {
            Poll::Ready(())
        } else {
            // Spurious polls must not queue the same wake-up twice
            if !self.registered {
                self.registered = true;
                self.state.register(self.wake_time, ctx.waker().clone());
            }

            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::task::Context;

    use futures::task::{waker_ref, ArcWake};

    use super::{SleepFut, Timer};
    use crate::time::{Duration, Time};

    #[derive(Default)]
    struct CountingWaker {
        wakes: AtomicUsize,
    }

    impl ArcWake for CountingWaker {
        fn wake_by_ref(self_ptr: &Arc<Self>) {
            self_ptr.wakes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn advance_jumps_to_next_event() {
        let timer = Timer::new();
        let waker = Arc::new(CountingWaker::default());
        let task_waker = waker_ref(&waker);
        let context = &mut Context::from_waker(&task_waker);

        let mut short = timer.sleep_for(Duration::from_seconds(1));
        let mut long = timer.sleep_for(Duration::from_seconds(3));
        assert!(SleepFut::poll(Pin::new(&mut short), context).is_pending());
        assert!(SleepFut::poll(Pin::new(&mut long), context).is_pending());
        assert!(SleepFut::poll(Pin::new(&mut long), context).is_pending());

        assert!(timer.advance());
        assert_eq!(timer.now(), Time::from_seconds(1));
        assert_eq!(waker.wakes.load(Ordering::SeqCst), 1);
        assert!(SleepFut::poll(Pin::new(&mut short), context).is_ready());
        assert!(SleepFut::poll(Pin::new(&mut long), context).is_pending());

        assert!(timer.advance());
        assert_eq!(timer.now(), Time::from_seconds(3));
        assert!(SleepFut::poll(Pin::new(&mut long), context).is_ready());

        assert!(!timer.has_pending_events());
        assert!(!timer.advance());
    }

    #[test]
    fn huge_sleep_does_not_overflow() {
        let timer = Timer::new();
        let waker = Arc::new(CountingWaker::default());
        let task_waker = waker_ref(&waker);
        let context = &mut Context::from_waker(&task_waker);

        let mut forever = timer.sleep_for(Duration::from_micros(u64::MAX));
        assert!(SleepFut::poll(Pin::new(&mut forever), context).is_pending());

        timer.clear();
        assert!(!timer.has_pending_events());
        assert!(!timer.advance());
        assert_eq!(waker.wakes.load(Ordering::SeqCst), 0);
    }
}
