//! Pure reconnection decision core.
//!
//! [`ReconnectPolicy`] holds the retry counter and the manual-disconnect
//! flag, and turns each connection closure into a [`RetryDecision`]. It
//! performs no I/O and owns no timers, which is what makes the state
//! machine testable: the driver task asks it what to do and sleeps (or
//! does not) accordingly.
//!
//! The rules, in priority order:
//! 1. A close while the manual-disconnect flag is set never retries.
//! 2. A clean close (the close code reserved for user-initiated
//!    shutdown) never retries.
//! 3. An abnormal close with the counter below the maximum schedules a
//!    retry after `min(base * 2^retries, max)` and increments the
//!    counter.
//! 4. An abnormal close with the counter at the maximum is terminal
//!    until a manual reconnect resets it.

use std::time::Duration;

/// What the driver should do after a connection closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Schedule a reconnect attempt after the given delay.
    RetryAfter(Duration),
    /// Do not retry: the disconnect was user-initiated or clean.
    Suppressed,
    /// Do not retry: the retry budget is spent. Terminal until a manual
    /// reconnect.
    Exhausted,
}

/// Retry counter + manual-disconnect flag with bounded exponential
/// backoff.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    base_delay: Duration,
    max_delay: Duration,
    max_attempts: u32,
    retries: u32,
    manual_disconnect: bool,
}

impl ReconnectPolicy {
    /// Create a policy with the given backoff bounds and retry budget.
    pub const fn new(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts,
            retries: 0,
            manual_disconnect: false,
        }
    }

    /// Current retry counter.
    pub const fn retries(&self) -> u32 {
        self.retries
    }

    /// Whether the manual-disconnect flag is set.
    pub const fn is_manual_disconnect(&self) -> bool {
        self.manual_disconnect
    }

    /// Whether the retry budget is spent.
    pub const fn is_exhausted(&self) -> bool {
        self.retries >= self.max_attempts
    }

    /// The backoff delay for a given retry ordinal:
    /// `min(base * 2^retry_count, max)`, saturating at `max` when the
    /// doubling overflows.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        2u32.checked_pow(retry_count)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// A connection attempt succeeded: reset the retry counter.
    pub const fn on_open(&mut self) {
        self.retries = 0;
    }

    /// A connection closed (or an attempt failed). `clean` is true only
    /// for the close code reserved for user-initiated shutdown.
    pub fn on_close(&mut self, clean: bool) -> RetryDecision {
        if self.manual_disconnect {
            return RetryDecision::Suppressed;
        }
        if clean {
            return RetryDecision::Suppressed;
        }
        if self.is_exhausted() {
            return RetryDecision::Exhausted;
        }
        let delay = self.delay_for(self.retries);
        self.retries = self.retries.saturating_add(1);
        RetryDecision::RetryAfter(delay)
    }

    /// The user asked to disconnect: suppress automatic retries until a
    /// manual reconnect clears the flag.
    pub const fn manual_disconnect(&mut self) {
        self.manual_disconnect = true;
    }

    /// The user asked to reconnect: clear the flag and the counter so
    /// automatic retry is re-armed.
    pub const fn manual_reconnect(&mut self) {
        self.manual_disconnect = false;
        self.retries = 0;
    }

    /// Whether a "network became reachable" signal should trigger an
    /// immediate reconnect attempt: only when not manually disconnected
    /// and not exhausted.
    pub const fn allows_network_retry(&self) -> bool {
        !self.manual_disconnect && !self.is_exhausted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy::new(Duration::from_secs(2), Duration::from_secs(60), 8)
    }

    #[test]
    fn backoff_sequence_is_non_decreasing_and_capped() {
        let policy = policy();
        let delays: Vec<Duration> = (0..12).map(|n| policy.delay_for(n)).collect();

        // 2s, 4s, 8s, 16s, 32s, then capped at 60s.
        assert_eq!(delays.first(), Some(&Duration::from_secs(2)));
        assert_eq!(delays.get(1), Some(&Duration::from_secs(4)));
        assert_eq!(delays.get(4), Some(&Duration::from_secs(32)));
        assert_eq!(delays.get(5), Some(&Duration::from_secs(60)));
        assert_eq!(delays.last(), Some(&Duration::from_secs(60)));

        for pair in delays.windows(2) {
            assert!(pair.first() <= pair.get(1), "backoff decreased");
        }
    }

    #[test]
    fn doubling_overflow_saturates_at_max() {
        let policy = ReconnectPolicy::new(
            Duration::from_secs(2),
            Duration::from_secs(60),
            u32::MAX,
        );
        assert_eq!(policy.delay_for(40), Duration::from_secs(60));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn abnormal_closes_escalate_then_exhaust() {
        let mut policy = ReconnectPolicy::new(
            Duration::from_secs(2),
            Duration::from_secs(60),
            2,
        );

        assert_eq!(
            policy.on_close(false),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );
        assert_eq!(
            policy.on_close(false),
            RetryDecision::RetryAfter(Duration::from_secs(4))
        );
        assert_eq!(policy.on_close(false), RetryDecision::Exhausted);
        assert!(policy.is_exhausted());

        // Only a manual reconnect clears the terminal state.
        policy.manual_reconnect();
        assert!(!policy.is_exhausted());
        assert_eq!(
            policy.on_close(false),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );
    }

    #[test]
    fn successful_open_resets_the_counter() {
        let mut policy = policy();
        let _ = policy.on_close(false);
        let _ = policy.on_close(false);
        assert_eq!(policy.retries(), 2);

        policy.on_open();
        assert_eq!(policy.retries(), 0);
        assert_eq!(
            policy.on_close(false),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );
    }

    #[test]
    fn manual_disconnect_suppresses_abnormal_close() {
        let mut policy = policy();
        policy.manual_disconnect();

        // An abnormal close right after a manual disconnect must not
        // schedule anything.
        assert_eq!(policy.on_close(false), RetryDecision::Suppressed);
        assert_eq!(policy.on_close(true), RetryDecision::Suppressed);
        assert!(!policy.allows_network_retry());
    }

    #[test]
    fn clean_close_does_not_retry() {
        let mut policy = policy();
        assert_eq!(policy.on_close(true), RetryDecision::Suppressed);
        assert_eq!(policy.retries(), 0);
    }

    #[test]
    fn network_signal_allowed_only_when_armed() {
        let mut policy = ReconnectPolicy::new(
            Duration::from_secs(2),
            Duration::from_secs(60),
            1,
        );
        assert!(policy.allows_network_retry());

        policy.manual_disconnect();
        assert!(!policy.allows_network_retry());
        policy.manual_reconnect();
        assert!(policy.allows_network_retry());

        let _ = policy.on_close(false);
        assert!(policy.is_exhausted());
        assert!(!policy.allows_network_retry());
    }
}
