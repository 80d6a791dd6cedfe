use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

/// Callbacks the coordinator chains through the event loop's timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Action { Poll, ClearLabel }

/// Fire-and-forget, single-shot delayed callbacks.
pub trait Scheduler {
    fn schedule_after(&mut self, delay: Duration, action: Action);
}

/// Timer queue for a frame-driven UI loop: actions go in with a deadline and
/// come back out of `take_due` once it has passed.
#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<(Instant, u64, Action)>>,
    seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self { Self::default() }

    pub fn schedule_at(&mut self, deadline: Instant, action: Action) {
        self.seq += 1;
        self.heap.push(Reverse((deadline, self.seq, action)));
    }

    /// Removes every action whose deadline is at or before `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<Action> {
        let mut due = Vec::new();
        while let Some(Reverse((deadline, _, _))) = self.heap.peek() {
            if *deadline > now { break; }
            if let Some(Reverse((_, _, action))) = self.heap.pop() { due.push(action); }
        }
        due
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse((deadline, _, _))| *deadline)
    }

    pub fn len(&self) -> usize { self.heap.len() }

    pub fn is_empty(&self) -> bool { self.heap.is_empty() }

    pub fn clear(&mut self) { self.heap.clear(); }
}

impl Scheduler for TimerQueue {
    fn schedule_after(&mut self, delay: Duration, action: Action) {
        self.schedule_at(Instant::now() + delay, action);
    }
}
