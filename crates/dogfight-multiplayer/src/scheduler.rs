//! Cancellable one-shot tasks keyed on simulation time.
//!
//! Delayed work (wreck removal, respawn re-announcements) is queued here
//! instead of on wall-clock timers so it can be cancelled by handle and
//! driven deterministically from the tick.

use std::time::Duration;

/// Handle to a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Debug)]
struct Scheduled<T> {
    handle: TaskHandle,
    due: Duration,
    task: T,
}

/// Pending tasks, fired when simulation time reaches their due time.
#[derive(Debug)]
pub struct Scheduler<T> {
    next_id: u64,
    tasks: Vec<Scheduled<T>>,
}

impl<T> Scheduler<T> {
    /// Empty scheduler.
    pub fn new() -> Self {
        Self {
            next_id: 0,
            tasks: Vec::new(),
        }
    }

    /// Queue `task` to fire at `due`.
    pub fn schedule(&mut self, due: Duration, task: T) -> TaskHandle {
        let handle = TaskHandle(self.next_id);
        self.next_id += 1;
        self.tasks.push(Scheduled { handle, due, task });
        handle
    }

    /// Cancel a task. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.handle != handle);
        self.tasks.len() != before
    }

    /// Cancel every task matching `predicate`. Returns how many were
    /// cancelled.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !predicate(&t.task));
        before - self.tasks.len()
    }

    /// Whether `handle` is still waiting to fire.
    pub fn is_scheduled(&self, handle: TaskHandle) -> bool {
        self.tasks.iter().any(|t| t.handle == handle)
    }

    /// Remove and return every task due at or before `now`, earliest first.
    /// Tasks due at the same time fire in scheduling order.
    pub fn drain_due(&mut self, now: Duration) -> Vec<(TaskHandle, T)> {
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(|t| t.due <= now);
        self.tasks = pending;
        due.sort_by_key(|t| (t.due, t.handle.0));
        due.into_iter().map(|t| (t.handle, t.task)).collect()
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_tasks_fire_when_due_in_order() {
        let mut s = Scheduler::new();
        s.schedule(ms(500), "late");
        s.schedule(ms(100), "early");
        s.schedule(ms(100), "early-second");

        assert!(s.drain_due(ms(99)).is_empty());
        let fired: Vec<_> = s.drain_due(ms(100)).into_iter().map(|(_, t)| t).collect();
        assert_eq!(fired, ["early", "early-second"]);
        assert_eq!(s.len(), 1);

        let fired: Vec<_> = s.drain_due(ms(10_000)).into_iter().map(|(_, t)| t).collect();
        assert_eq!(fired, ["late"]);
        assert!(s.is_empty());
    }

    #[test]
    fn test_cancelled_task_never_fires() {
        let mut s = Scheduler::new();
        let handle = s.schedule(ms(100), 1);
        assert!(s.is_scheduled(handle));
        assert!(s.cancel(handle));
        assert!(!s.cancel(handle));
        assert!(s.drain_due(ms(1_000)).is_empty());
    }

    #[test]
    fn test_cancel_where() {
        let mut s = Scheduler::new();
        s.schedule(ms(100), 1);
        s.schedule(ms(100), 2);
        s.schedule(ms(100), 3);
        assert_eq!(s.cancel_where(|n| n % 2 == 1), 2);
        let fired: Vec<_> = s.drain_due(ms(100)).into_iter().map(|(_, t)| t).collect();
        assert_eq!(fired, [2]);
    }
}
