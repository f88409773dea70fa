//! Reconnection policy.

use std::time::Duration;

/// When and how often to reconnect after an unexpected disconnect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    pub max_retries: u32,
    pub wait: Duration,
    /// Staying registered this long counts as a healthy connection and
    /// resets the retry counter.
    pub safe_registration: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            enabled: true,
            max_retries: 3,
            wait: Duration::from_secs(4),
            safe_registration: Duration::from_secs(10),
        }
    }
}

/// What happened on the connection that just closed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectionHistory {
    /// Reconnect attempts made since the last healthy connection.
    pub attempts: u32,
    /// The caller asked for the disconnect (QUIT).
    pub requested_disconnect: bool,
    /// How long the connection was registered, if it ever was.
    pub registered_for: Option<Duration>,
}

impl ReconnectPolicy {
    /// Whether the connection counted as healthy.
    pub fn was_safe(&self, history: &ConnectionHistory) -> bool {
        history
            .registered_for
            .map_or(false, |d| d >= self.safe_registration)
    }

    /// Delay before the next attempt, or `None` to stop.
    pub fn decide(&self, history: &ConnectionHistory) -> Option<Duration> {
        if !self.enabled || history.requested_disconnect {
            return None;
        }
        if self.was_safe(history) || history.attempts < self.max_retries {
            Some(self.wait)
        } else {
            None
        }
    }

    /// Attempt counter to carry into the next connection. A safe
    /// registration resets the count to zero before this attempt is added.
    pub fn next_attempts(&self, history: &ConnectionHistory) -> u32 {
        if self.was_safe(history) {
            1
        } else {
            history.attempts + 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_until_exhausted() {
        let policy = ReconnectPolicy::default();
        let mut history = ConnectionHistory::default();
        for _ in 0..3 {
            assert_eq!(policy.decide(&history), Some(Duration::from_secs(4)));
            history.attempts = policy.next_attempts(&history);
        }
        assert_eq!(history.attempts, 3);
        assert_eq!(policy.decide(&history), None);
    }

    #[test]
    fn test_requested_disconnect_never_retries() {
        let policy = ReconnectPolicy::default();
        let history = ConnectionHistory {
            requested_disconnect: true,
            ..Default::default()
        };
        assert_eq!(policy.decide(&history), None);
    }

    #[test]
    fn test_disabled() {
        let policy = ReconnectPolicy {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(policy.decide(&ConnectionHistory::default()), None);
    }

    #[test]
    fn test_safe_registration_resets() {
        let policy = ReconnectPolicy::default();
        let history = ConnectionHistory {
            attempts: 3,
            requested_disconnect: false,
            registered_for: Some(Duration::from_secs(60)),
        };
        assert!(policy.decide(&history).is_some());
        assert_eq!(policy.next_attempts(&history), 1);

        let brief = ConnectionHistory {
            registered_for: Some(Duration::from_secs(2)),
            ..history
        };
        assert_eq!(policy.decide(&brief), None);
    }
}
