//! Cooperative cancellation.
//!
//! Long-running searches take a [`Deadline`] from the caller and poll it at
//! fixed points (once per recursive call, per network node, or per round).
//! Nothing is pre-empted: an expired deadline only makes the next poll
//! return `true`, after which the search unwinds with its best result so
//! far.
//!
//! Besides wall-clock deadlines, a deadline can expire after a fixed number
//! of polls, which makes cancellation deterministic in tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// A cancellation token shared by reference between worker threads.
#[derive(Debug, Default)]
pub struct Deadline {
    at: Option<Instant>,
    polls: Option<PollBudget>,
}

#[derive(Debug)]
struct PollBudget {
    limit: usize,
    used: AtomicUsize,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn never() -> Self {
        Self::default()
    }

    /// Expires at the given instant.
    pub fn at(instant: Instant) -> Self {
        Self {
            at: Some(instant),
            polls: None,
        }
    }

    /// Expires `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(instant) => Self::at(instant),
            None => Self::never(),
        }
    }

    /// Expires `timeout` from now, or never if `timeout` is `None`.
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or_else(Self::never, Self::after)
    }

    /// Expires once it has been polled `limit` times: poll number `limit + 1`
    /// (and every later poll) reports expiry.
    ///
    /// ```
    /// use spn_map::deadline::Deadline;
    ///
    /// let deadline = Deadline::after_polls(2);
    /// assert!(!deadline.is_expired());
    /// assert!(!deadline.is_expired());
    /// assert!(deadline.is_expired());
    /// ```
    pub fn after_polls(limit: usize) -> Self {
        Self {
            at: None,
            polls: Some(PollBudget {
                limit,
                used: AtomicUsize::new(0),
            }),
        }
    }

    /// An already expired deadline.
    pub fn expired() -> Self {
        Self::after_polls(0)
    }

    /// Polls the deadline.
    ///
    /// Safe to call concurrently from several threads.
    pub fn is_expired(&self) -> bool {
        if let Some(budget) = &self.polls {
            let used = budget.used.fetch_add(1, Ordering::Relaxed);
            if used >= budget.limit {
                return true;
            }
        }
        match self.at {
            Some(at) => Instant::now() >= at,
            None => false,
        }
    }

    /// Number of polls so far, if this is a poll-counting deadline.
    pub fn polls(&self) -> Option<usize> {
        self.polls.as_ref().map(|b| b.used.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never() {
        let deadline = Deadline::never();
        for _ in 0..1000 {
            assert!(!deadline.is_expired());
        }
        assert_eq!(deadline.polls(), None);
    }

    #[test]
    fn test_expired() {
        let deadline = Deadline::expired();
        assert!(deadline.is_expired());
        assert!(deadline.is_expired());
    }

    #[test]
    fn test_wall_clock() {
        assert!(Deadline::at(Instant::now()).is_expired());
        assert!(!Deadline::after(Duration::from_secs(3600)).is_expired());
        assert!(!Deadline::from_timeout(None).is_expired());
        assert!(!Deadline::after(Duration::MAX).is_expired());
    }

    #[test]
    fn test_poll_budget() {
        let deadline = Deadline::after_polls(3);
        let results: Vec<bool> = (0..5).map(|_| deadline.is_expired()).collect();
        assert_eq!(results, vec![false, false, false, true, true]);
        assert_eq!(deadline.polls(), Some(5));
    }
}
