//! Flood-controlled outgoing line queue.
//!
//! The scheduler never touches a clock itself; the driver passes `now` in
//! and sleeps until [`WriteScheduler::next_deadline`].

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Default send rate with flood control on.
pub const DEFAULT_LINES_PER_SECOND: u32 = 2;

#[derive(Debug, Clone)]
pub struct WriteScheduler {
    queue: VecDeque<String>,
    interval: Option<Duration>,
    next_send: Option<Instant>,
    closed: bool,
}

impl WriteScheduler {
    /// `None` (or zero) disables flood control: every queued line is due
    /// immediately.
    pub fn new(lines_per_second: Option<u32>) -> Self {
        let interval = lines_per_second
            .filter(|n| *n > 0)
            .map(|n| Duration::from_millis(1000 / u64::from(n)));
        WriteScheduler {
            queue: VecDeque::new(),
            interval,
            next_send: None,
            closed: false,
        }
    }

    /// Queue a line. Ignored while closed.
    pub fn push(&mut self, line: String) {
        if !self.closed {
            self.queue.push_back(line);
        }
    }

    /// Lines due at `now`, oldest first.
    pub fn poll(&mut self, now: Instant) -> Vec<String> {
        let Some(interval) = self.interval else {
            return self.queue.drain(..).collect();
        };
        if self.next_send.map_or(false, |t| now < t) {
            return Vec::new();
        }
        match self.queue.pop_front() {
            Some(line) => {
                self.next_send = Some(now + interval);
                vec![line]
            }
            None => Vec::new(),
        }
    }

    /// When the next queued line becomes due, or `None` when idle.
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        if self.queue.is_empty() {
            return None;
        }
        match self.next_send {
            Some(t) if self.interval.is_some() && t > now => Some(t),
            _ => Some(now),
        }
    }

    /// Drop everything queued and refuse new lines.
    pub fn close(&mut self) {
        self.closed = true;
        self.queue.clear();
        self.next_send = None;
    }

    pub fn open(&mut self) {
        self.closed = false;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unthrottled_drains_everything() {
        let mut sched = WriteScheduler::new(None);
        sched.push("A".into());
        sched.push("B".into());
        let now = Instant::now();
        assert_eq!(sched.next_deadline(now), Some(now));
        assert_eq!(sched.poll(now), vec!["A", "B"]);
        assert_eq!(sched.next_deadline(now), None);
    }

    #[test]
    fn test_rate_limited() {
        let mut sched = WriteScheduler::new(Some(2));
        for l in ["1", "2", "3"] {
            sched.push(l.into());
        }
        let t0 = Instant::now();
        assert_eq!(sched.poll(t0), vec!["1"]);
        assert!(sched.poll(t0 + Duration::from_millis(100)).is_empty());
        assert_eq!(
            sched.next_deadline(t0 + Duration::from_millis(100)),
            Some(t0 + Duration::from_millis(500))
        );
        assert_eq!(sched.poll(t0 + Duration::from_millis(500)), vec!["2"]);
        assert_eq!(sched.poll(t0 + Duration::from_millis(1000)), vec!["3"]);
        assert!(sched.is_empty());
    }

    #[test]
    fn test_closed_ignores_push() {
        let mut sched = WriteScheduler::new(Some(2));
        sched.push("x".into());
        sched.close();
        assert!(sched.is_empty());
        sched.push("y".into());
        assert!(sched.is_empty());
        sched.open();
        sched.push("z".into());
        assert_eq!(sched.poll(Instant::now()), vec!["z"]);
    }
}
