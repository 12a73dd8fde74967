//! # Timers
//!
//! Deferred tasks keyed by virtual time.
//!
//! Paced moves and NPC turns are chains of tasks rather than nested callbacks.
//! Each task carries the token it was scheduled under; the world compares it with
//! the current token when the task fires and drops stale ones.

use crate::{NpcId, PlayerId};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

/// A unit of deferred game work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Advance a player's in-flight move by one step.
    MoveStep { player: PlayerId, token: u64 },
    /// Let an NPC take its next action in the battle it was scheduled for.
    NpcAction { npc: NpcId, battle: u64 },
}

#[derive(Debug, Clone)]
struct Scheduled {
    due: Duration,
    seq: u64,
    task: Task,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior in BinaryHeap
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-queue of tasks ordered by due time, then by scheduling order.
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Scheduled>,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a task to run at `due`.
    pub fn schedule(&mut self, due: Duration, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled { due, seq, task });
    }

    /// Pops the earliest task due at or before `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<(Duration, Task)> {
        if self.heap.peek()?.due > now {
            return None;
        }
        self.heap.pop().map(|s| (s.due, s.task))
    }

    /// Due time of the earliest pending task.
    pub fn next_due(&self) -> Option<Duration> {
        self.heap.peek().map(|s| s.due)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npc(id: &str) -> Task {
        Task::NpcAction {
            npc: id.to_string(),
            battle: 1,
        }
    }

    #[test]
    fn test_pops_in_due_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(Duration::from_millis(300), npc("late"));
        timers.schedule(Duration::from_millis(100), npc("early"));

        assert_eq!(timers.next_due(), Some(Duration::from_millis(100)));
        assert_eq!(timers.pop_due(Duration::from_millis(50)), None);
        assert_eq!(
            timers.pop_due(Duration::from_millis(500)),
            Some((Duration::from_millis(100), npc("early")))
        );
        assert_eq!(
            timers.pop_due(Duration::from_millis(500)),
            Some((Duration::from_millis(300), npc("late")))
        );
        assert!(timers.is_empty());
    }

    #[test]
    fn test_equal_due_times_keep_schedule_order() {
        let mut timers = TimerQueue::new();
        let due = Duration::from_millis(200);
        timers.schedule(due, npc("first"));
        timers.schedule(due, npc("second"));
        timers.schedule(due, npc("third"));

        let order: Vec<Task> = std::iter::from_fn(|| timers.pop_due(due).map(|(_, t)| t)).collect();
        assert_eq!(order, vec![npc("first"), npc("second"), npc("third")]);
    }
}
