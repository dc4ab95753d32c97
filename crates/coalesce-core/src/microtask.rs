//! Single-threaded microtask queue
//!
//! Deferred flushes are scheduled through the [`Scheduler`] trait so hosts can
//! plug in their own event loop. [`MicrotaskQueue`] is the bundled
//! implementation: a FIFO of one-shot tasks that the host drains at the end of
//! each synchronous turn with [`MicrotaskQueue::run_until_idle`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// A one-shot deferred callback
pub type Task = Box<dyn FnOnce()>;

/// Something that can run a task after the current synchronous turn
pub trait Scheduler {
    /// Queue `task` to run once, after every task queued before it
    fn schedule(&self, task: Task);
}

/// FIFO microtask queue
///
/// Cloning yields another handle to the same queue.
#[derive(Clone, Default)]
pub struct MicrotaskQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

thread_local! {
    static CURRENT: MicrotaskQueue = MicrotaskQueue::new();
}

impl MicrotaskQueue {
    /// Create an empty, independent queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to this thread's shared queue
    pub fn current() -> Self {
        CURRENT.with(Clone::clone)
    }

    /// Number of queued tasks
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Check if no task is queued
    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Run the oldest task, returning false if the queue was empty
    pub fn run_one(&self) -> bool {
        // The borrow must end before the task runs: tasks may schedule more tasks.
        let task = self.tasks.borrow_mut().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run tasks until the queue is empty, including tasks queued by the
    /// tasks themselves. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }
}

impl Scheduler for MicrotaskQueue {
    fn schedule(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }
}

impl fmt::Debug for MicrotaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicrotaskQueue")
            .field("queued", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_fifo_order() {
        let queue = MicrotaskQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let log = Rc::clone(&log);
            queue.schedule(Box::new(move || log.borrow_mut().push(i)));
        }

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.run_until_idle(), 3);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_tasks_scheduled_while_running_run_after() {
        let queue = MicrotaskQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_queue = queue.clone();
        let inner_log = Rc::clone(&log);
        queue.schedule(Box::new(move || {
            inner_log.borrow_mut().push("outer");
            let nested_log = Rc::clone(&inner_log);
            inner_queue.schedule(Box::new(move || nested_log.borrow_mut().push("nested")));
        }));
        let tail_log = Rc::clone(&log);
        queue.schedule(Box::new(move || tail_log.borrow_mut().push("tail")));

        assert_eq!(queue.run_until_idle(), 3);
        assert_eq!(*log.borrow(), vec!["outer", "tail", "nested"]);
    }

    #[test]
    fn test_each_task_runs_once() {
        let queue = MicrotaskQueue::new();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        queue.schedule(Box::new(move || c.set(c.get() + 1)));

        assert!(queue.run_one());
        assert!(!queue.run_one());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_current_is_shared_per_thread() {
        let a = MicrotaskQueue::current();
        let b = MicrotaskQueue::current();
        a.schedule(Box::new(|| {}));
        assert_eq!(b.len(), 1);
        b.run_until_idle();
        assert!(a.is_empty());
    }
}
