//! # Delayed Tasks
//!
//! Fire-and-forget timers owned by the controller. Every task is tagged with
//! the epoch that was current when it was scheduled; [`TimerQueue::invalidate`]
//! bumps the epoch and drops everything, so a conversation switch can never
//! be touched by a timer armed for the previous one.

use std::time::{Duration, Instant};

use crate::core::state::GenerationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayedTask {
    /// Hide the progress overlay armed by this generation's sections.
    HideProgress { generation: GenerationId },
    /// One attempt of the forced scroll-to-bottom series.
    ForceScroll { attempt: usize },
}

#[derive(Debug)]
struct Scheduled<T> {
    due: Instant,
    epoch: u64,
    seq: u64,
    task: T,
}

#[derive(Debug)]
pub struct TimerQueue<T> {
    pending: Vec<Scheduled<T>>,
    epoch: u64,
    seq: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            epoch: 0,
            seq: 0,
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn schedule(&mut self, now: Instant, delay: Duration, task: T) {
        self.seq += 1;
        self.pending.push(Scheduled {
            due: now + delay,
            epoch: self.epoch,
            seq: self.seq,
            task,
        });
    }

    /// Drops pending tasks matching `pred`. Returns how many were dropped.
    pub fn cancel_where<F: Fn(&T) -> bool>(&mut self, pred: F) -> usize {
        let before = self.pending.len();
        self.pending.retain(|s| !pred(&s.task));
        before - self.pending.len()
    }

    /// Drops every pending task and starts a new epoch.
    pub fn invalidate(&mut self) {
        self.epoch += 1;
        self.pending.clear();
    }

    /// Removes and returns the tasks due at `now`, earliest first. Tasks
    /// scheduled under an older epoch are discarded.
    pub fn drain_due(&mut self, now: Instant) -> Vec<T> {
        let epoch = self.epoch;
        self.pending.retain(|s| s.epoch == epoch);

        let (mut due, rest): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|s| s.due <= now);
        self.pending = rest;

        due.sort_by_key(|s| (s.due, s.seq));
        due.into_iter().map(|s| s.task).collect()
    }

    /// Earliest pending deadline, for sizing the event loop's poll timeout.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|s| s.due).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_due_in_deadline_order() {
        let now = Instant::now();
        let mut q = TimerQueue::new();
        q.schedule(now, Duration::from_millis(300), "late");
        q.schedule(now, Duration::from_millis(100), "early");
        q.schedule(now, Duration::from_millis(100), "early-second");

        assert!(q.drain_due(now).is_empty());
        assert_eq!(
            q.drain_due(now + Duration::from_millis(150)),
            vec!["early", "early-second"]
        );
        assert_eq!(q.len(), 1);
        assert_eq!(q.next_deadline(), Some(now + Duration::from_millis(300)));
        assert_eq!(q.drain_due(now + Duration::from_secs(1)), vec!["late"]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_invalidate_drops_stale_tasks() {
        let now = Instant::now();
        let mut q = TimerQueue::new();
        q.schedule(
            now,
            Duration::from_millis(10),
            DelayedTask::HideProgress {
                generation: GenerationId::new(1),
            },
        );
        q.invalidate();
        assert_eq!(q.epoch(), 1);
        assert!(q.drain_due(now + Duration::from_secs(5)).is_empty());

        q.schedule(now, Duration::ZERO, DelayedTask::ForceScroll { attempt: 1 });
        assert_eq!(
            q.drain_due(now),
            vec![DelayedTask::ForceScroll { attempt: 1 }]
        );
    }

    #[test]
    fn test_cancel_where_keeps_other_tasks() {
        let now = Instant::now();
        let mut q = TimerQueue::new();
        q.schedule(now, Duration::from_millis(10), "hide");
        q.schedule(now, Duration::from_millis(20), "scroll");
        q.schedule(now, Duration::from_millis(30), "hide");

        assert_eq!(q.cancel_where(|t| *t == "hide"), 2);
        assert_eq!(q.drain_due(now + Duration::from_secs(1)), vec!["scroll"]);
        assert_eq!(q.cancel_where(|t| *t == "hide"), 0);
    }
}
