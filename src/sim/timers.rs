//! One-shot timers
//!
//! Delayed continuations (claw animations, settle pauses, the slip check).
//! Every pending timer is tracked here so teardown can cancel them all.

use super::tick::MachineEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
struct Timer {
    handle: TimerHandle,
    due_ms: u64,
    event: MachineEvent,
}

#[derive(Debug, Clone, Default)]
pub struct Timers {
    pending: Vec<Timer>,
    next_handle: u64,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `event` once the clock reaches `now_ms + delay_ms`
    pub fn schedule(&mut self, now_ms: u64, delay_ms: u32, event: MachineEvent) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.pending.push(Timer {
            handle,
            due_ms: now_ms + delay_ms as u64,
            event,
        });
        handle
    }

    /// Returns false if the timer already fired or was cancelled
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.handle != handle);
        self.pending.len() != before
    }

    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|t| t.handle == handle)
    }

    /// Whether any pending timer will fire `event`
    pub fn is_scheduled(&self, event: MachineEvent) -> bool {
        self.pending.iter().any(|t| t.event == event)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove and return every event due at `now_ms`, ordered by (due, handle)
    pub fn drain_due(&mut self, now_ms: u64) -> Vec<MachineEvent> {
        let mut due: Vec<Timer> = Vec::new();
        self.pending.retain(|t| {
            if t.due_ms <= now_ms {
                due.push(*t);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|t| (t.due_ms, t.handle));
        due.into_iter().map(|t| t.event).collect()
    }
}
