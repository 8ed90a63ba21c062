//! Timer queue for deferred view work.
//!
//! Timers are stored in a min-heap keyed by `(due, insertion_order)`.
//! Earlier deadlines fire first; ties fire in the order they were
//! scheduled.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

#[derive(Debug)]
struct Entry<E> {
    event: E,
    due: u64,
    seq: u64,
}

impl<E> PartialEq for Entry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<E> Eq for Entry<E> {}

impl<E> PartialOrd for Entry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Entry<E> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.due.cmp(&other.due).then(self.seq.cmp(&other.seq))
    }
}

/// A queue of events that become due at a millisecond timestamp.
#[derive(Debug)]
pub struct TimerQueue<E> {
    heap: BinaryHeap<Reverse<Entry<E>>>,
    seq: u64,
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            seq: 0,
        }
    }

    /// Schedule `event` to fire at `due_ms`.
    pub fn schedule(&mut self, event: E, due_ms: u64) {
        let seq = self.seq;
        self.seq += 1;
        self.heap.push(Reverse(Entry {
            event,
            due: due_ms,
            seq,
        }));
    }

    /// Pops every event due at or before `now_ms`, earliest first.
    pub fn pop_due(&mut self, now_ms: u64) -> Vec<E> {
        let mut due = Vec::new();
        while self.heap.peek().is_some_and(|Reverse(e)| e.due <= now_ms) {
            if let Some(Reverse(entry)) = self.heap.pop() {
                due.push(entry.event);
            }
        }
        due
    }

    /// Deadline of the earliest pending event.
    pub fn next_due(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse(e)| e.due)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Keeps only the events for which `predicate` returns `true`.
    pub fn retain(&mut self, predicate: impl Fn(&E) -> bool) {
        let old_heap = std::mem::take(&mut self.heap);
        self.heap = old_heap
            .into_iter()
            .filter(|Reverse(entry)| predicate(&entry.event))
            .collect();
    }
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_deadline_order() {
        let mut q = TimerQueue::new();
        q.schedule("late", 300);
        q.schedule("early", 100);
        q.schedule("middle", 200);
        assert_eq!(q.next_due(), Some(100));
        assert_eq!(q.pop_due(250), vec!["early", "middle"]);
        assert_eq!(q.len(), 1);
        assert!(q.pop_due(299).is_empty());
        assert_eq!(q.pop_due(300), vec!["late"]);
        assert!(q.is_empty());
    }

    #[test]
    fn equal_deadlines_are_fifo() {
        let mut q = TimerQueue::new();
        for i in 0..5 {
            q.schedule(i, 50);
        }
        assert_eq!(q.pop_due(50), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn retain_drops_cancelled_timers() {
        let mut q = TimerQueue::new();
        q.schedule(1, 10);
        q.schedule(2, 20);
        q.schedule(3, 30);
        q.retain(|&e| e != 2);
        assert_eq!(q.pop_due(100), vec![1, 3]);
    }
}
