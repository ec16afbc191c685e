use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

#[derive(Debug)]
struct PendingTask<T> {
    id: TaskId,
    deadline: Duration,
    payload: T,
}

/// Timed continuations driven by the simulation tick.
///
/// Time only moves when [`SimScheduler::advance`] is called, so a wait never blocks the
/// thread and always elapses after the same number of ticks for a given `dt`. Due tasks
/// come back as payloads for the owner to dispatch; the scheduler never calls out.
#[derive(Debug)]
pub struct SimScheduler<T> {
    now: Duration,
    next_id: u64,
    pending: Vec<PendingTask<T>>,
}

impl<T> Default for SimScheduler<T> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            pending: Vec::new(),
        }
    }
}

impl<T> SimScheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule_after(&mut self, delay: Duration, payload: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.pending.push(PendingTask {
            id,
            deadline: self.now.saturating_add(delay),
            payload,
        });
        id
    }

    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|task| task.id != id);
        self.pending.len() != before
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.pending.iter().any(|task| task.id == id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Moves simulation time forward by `dt` and returns every payload whose deadline has
    /// been reached, ordered by deadline then by scheduling order.
    pub fn advance(&mut self, dt: Duration) -> Vec<T> {
        self.now = self.now.saturating_add(dt);
        if self.pending.is_empty() {
            return Vec::new();
        }

        let now = self.now;
        let (mut due, still_pending): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|task| task.deadline <= now);
        self.pending = still_pending;
        due.sort_by_key(|task| (task.deadline, task.id));
        due.into_iter().map(|task| task.payload).collect()
    }
}
