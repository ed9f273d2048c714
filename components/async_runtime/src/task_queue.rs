//! Priority-banded task queue.
//!
//! Tasks are grouped into bands by [`TaskPriority`]. The highest non-empty band
//! is always served first, and tasks within a band run in submission order.

use std::collections::VecDeque;
use std::fmt;

/// Priority of a task on the main thread, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskPriority {
    /// Bootstrap work that must run before any user-visible task.
    Internal,
    /// Ordinary calls from native code.
    Immediate,
    /// Event dispatch.
    Events,
    /// Timer callbacks.
    Timer,
}

impl TaskPriority {
    /// All priorities, highest first.
    pub const ALL: [TaskPriority; 4] = [
        TaskPriority::Internal,
        TaskPriority::Immediate,
        TaskPriority::Events,
        TaskPriority::Timer,
    ];

    fn band(self) -> usize {
        self as usize
    }
}

/// A unit of work for the main thread.
pub struct Task {
    name: String,
    priority: TaskPriority,
    sequence: u64,
    callback: Box<dyn FnOnce() + Send>,
}

impl Task {
    /// Creates a new Task from a closure.
    ///
    /// # Arguments
    ///
    /// * `priority` - The band the task is queued in
    /// * `name` - Label used in log output
    /// * `f` - The function to execute when the task runs
    pub fn new<F>(priority: TaskPriority, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            name: name.into(),
            priority,
            sequence: 0,
            callback: Box::new(f),
        }
    }

    /// The task label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The task priority.
    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// Position in submission order, assigned when queued.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Executes the task.
    pub fn run(self) {
        (self.callback)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

/// A queue for tasks.
///
/// Tasks are processed highest band first, FIFO within a band.
#[derive(Debug, Default)]
pub struct TaskQueue {
    bands: [VecDeque<Task>; 4],
    next_sequence: u64,
}

impl TaskQueue {
    /// Creates a new empty TaskQueue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task to the end of its band.
    pub fn enqueue(&mut self, mut task: Task) {
        task.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.bands[task.priority.band()].push_back(task);
    }

    /// Removes and returns the next task to run.
    pub fn dequeue(&mut self) -> Option<Task> {
        self.bands.iter_mut().find_map(VecDeque::pop_front)
    }

    /// Removes every queued task, in the order they would have run.
    pub fn drain(&mut self) -> Vec<Task> {
        self.bands.iter_mut().flat_map(|band| band.drain(..)).collect()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.bands.iter().all(VecDeque::is_empty)
    }

    /// Returns the number of tasks in the queue.
    pub fn len(&self) -> usize {
        self.bands.iter().map(VecDeque::len).sum()
    }
}
