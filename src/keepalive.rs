//! Client-side PING keepalive.
//!
//! Sends a PING after `interval` of silence and gives up if nothing at all
//! arrives within `timeout`. Any inbound line counts as proof of life.

use std::time::{Duration, Instant};

/// What the driver should do at a deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeepaliveAction {
    SendPing,
    TimedOut,
    Idle,
}

#[derive(Debug, Clone)]
pub struct Keepalive {
    interval: Duration,
    timeout: Duration,
    next_ping: Option<Instant>,
    pong_deadline: Option<Instant>,
}

impl Keepalive {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Keepalive {
            interval,
            timeout,
            next_ping: None,
            pong_deadline: None,
        }
    }

    /// Arm both timers from `now`.
    pub fn start(&mut self, now: Instant) {
        self.on_traffic(now);
    }

    /// Inbound traffic: push both deadlines out.
    pub fn on_traffic(&mut self, now: Instant) {
        self.next_ping = Some(now + self.interval);
        self.pong_deadline = Some(now + self.timeout);
    }

    pub fn stop(&mut self) {
        self.next_ping = None;
        self.pong_deadline = None;
    }

    pub fn poll(&mut self, now: Instant) -> KeepaliveAction {
        if self.pong_deadline.map_or(false, |t| now >= t) {
            self.stop();
            return KeepaliveAction::TimedOut;
        }
        if self.next_ping.map_or(false, |t| now >= t) {
            self.next_ping = Some(now + self.interval);
            return KeepaliveAction::SendPing;
        }
        KeepaliveAction::Idle
    }

    /// Earliest armed deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.next_ping, self.pong_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// PING payload: wall-clock milliseconds, so the PONG doubles as a lag probe.
pub fn ping_token() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}
