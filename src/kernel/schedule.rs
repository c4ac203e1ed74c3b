//! Single-slot deadline registers for deferred work.
//!
//! Each concern owns exactly one slot. Scheduling into an occupied slot either
//! keeps the pending deadline (coalesce) or replaces it (debounce). The owner
//! polls [`Scheduler::take_due`] from its tick.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskSlot {
    ToolboxUpdate,
    TargetsDebounce,
    MetricsDispatch,
}

impl TaskSlot {
    /// Order in which due slots run within one tick.
    pub const ALL: [TaskSlot; 3] = [
        TaskSlot::ToolboxUpdate,
        TaskSlot::TargetsDebounce,
        TaskSlot::MetricsDispatch,
    ];

    fn index(self) -> usize {
        match self {
            TaskSlot::ToolboxUpdate => 0,
            TaskSlot::TargetsDebounce => 1,
            TaskSlot::MetricsDispatch => 2,
        }
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    deadlines: [Option<Instant>; 3],
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `slot` unless it is already pending. Returns `true` if newly armed.
    pub fn coalesce(&mut self, slot: TaskSlot, now: Instant, delay: Duration) -> bool {
        let entry = &mut self.deadlines[slot.index()];
        if entry.is_some() {
            return false;
        }
        *entry = Some(now + delay);
        true
    }

    /// Arms `slot`, pushing any pending deadline back to `now + delay`.
    pub fn debounce(&mut self, slot: TaskSlot, now: Instant, delay: Duration) {
        self.deadlines[slot.index()] = Some(now + delay);
    }

    pub fn is_pending(&self, slot: TaskSlot) -> bool {
        self.deadlines[slot.index()].is_some()
    }

    pub fn deadline(&self, slot: TaskSlot) -> Option<Instant> {
        self.deadlines[slot.index()]
    }

    pub fn cancel(&mut self, slot: TaskSlot) -> bool {
        self.deadlines[slot.index()].take().is_some()
    }

    pub fn cancel_all(&mut self) {
        self.deadlines = [None; 3];
    }

    /// Clears and returns every slot due at `now`, in [`TaskSlot::ALL`] order.
    pub fn take_due(&mut self, now: Instant) -> Vec<TaskSlot> {
        let mut due = Vec::new();
        for slot in TaskSlot::ALL {
            let entry = &mut self.deadlines[slot.index()];
            if entry.is_some_and(|deadline| deadline <= now) {
                *entry = None;
                due.push(slot);
            }
        }
        due
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.iter().flatten().min().copied()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/schedule.rs"]
mod tests;
