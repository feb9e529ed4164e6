//! # Adaptive Poller
//!
//! Tunes a standing poll interval across many independent poll cycles based
//! on success and error streaks. This is a distinct algorithm from
//! [`crate::retry`]: it does not retry a failed call, it decides how long a
//! long-running watcher waits until its next cycle.
//!
//! After `success_threshold` consecutive successes the interval shrinks
//! (divide by the multiplier, floored at the initial interval); after
//! `error_threshold` consecutive failures it expands (multiply, capped at
//! the maximum interval). Whenever the opposite outcome occurs, the
//! non-triggering streak resets to zero.

use crate::config::PollConfig;
use crate::observability::metrics;
use std::time::Duration;
use tracing::debug;

/// Mutable state of one polling loop; never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollState {
    pub interval: Duration,
    pub success_count: u64,
    pub error_count: u64,
}

impl PollState {
    /// Starting state: the configured initial interval, no streaks
    pub fn new(config: &PollConfig) -> Self {
        Self {
            interval: config.initial_interval(),
            success_count: 0,
            error_count: 0,
        }
    }

    /// Advance the state by one poll outcome
    pub fn observe(&mut self, config: &PollConfig, success: bool) {
        let (interval, success_count, error_count) = exponential_backoff(
            config,
            success,
            self.interval,
            self.success_count,
            self.error_count,
        );
        self.interval = interval;
        self.success_count = success_count;
        self.error_count = error_count;
    }
}

/// Calculate the next poll interval from the outcome of the current cycle
///
/// Returns the next interval together with the updated success and error
/// streaks. An interval adjustment resets both streaks to zero; otherwise
/// only the streak matching the outcome advances and the opposite streak
/// resets.
pub fn exponential_backoff(
    config: &PollConfig,
    success: bool,
    interval: Duration,
    success_count: u64,
    error_count: u64,
) -> (Duration, u64, u64) {
    // Boundary corrections: a multiplier below one and an initial interval
    // above the maximum are configuration mistakes, not tuning choices.
    let factor = config.backoff_multiplier.max(1);
    let min_interval = config.initial_interval().min(config.max_interval());
    let max_interval = config.max_interval();

    if success {
        let next_success_count = success_count + 1;

        if next_success_count >= config.success_threshold {
            let shrunk = interval / u32::try_from(factor).unwrap_or(u32::MAX);
            let next_interval = shrunk.max(min_interval);
            debug!(
                "Poll interval shrank to {} ms after {} successes",
                next_interval.as_millis(),
                next_success_count
            );
            metrics::increment_poll_adjustment("shrink");
            return (next_interval, 0, 0);
        }

        return (interval, next_success_count, 0);
    }

    let next_error_count = error_count + 1;

    if next_error_count >= config.error_threshold {
        let grown = interval.saturating_mul(u32::try_from(factor).unwrap_or(u32::MAX));
        let next_interval = grown.min(max_interval);
        debug!(
            "Poll interval expanded to {} ms after {} errors",
            next_interval.as_millis(),
            next_error_count
        );
        metrics::increment_poll_adjustment("expand");
        return (next_interval, 0, 0);
    }

    (interval, 0, next_error_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PollConfig {
        PollConfig {
            poll_interval_ms: 1000,
            max_poll_interval_ms: 8000,
            backoff_multiplier: 2,
            success_threshold: 3,
            error_threshold: 3,
        }
    }

    #[test]
    fn error_streak_below_threshold_keeps_interval() {
        let (interval, successes, errors) =
            exponential_backoff(&config(), false, Duration::from_millis(1000), 2, 0);
        assert_eq!(interval, Duration::from_millis(1000));
        assert_eq!((successes, errors), (0, 1));
    }

    #[test]
    fn error_threshold_expands_and_resets_counters() {
        let (interval, successes, errors) =
            exponential_backoff(&config(), false, Duration::from_millis(1000), 0, 2);
        assert_eq!(interval, Duration::from_millis(2000));
        assert_eq!((successes, errors), (0, 0));
    }

    #[test]
    fn success_threshold_shrinks_and_resets_counters() {
        let (interval, successes, errors) =
            exponential_backoff(&config(), true, Duration::from_millis(4000), 2, 0);
        assert_eq!(interval, Duration::from_millis(2000));
        assert_eq!((successes, errors), (0, 0));
    }

    #[test]
    fn shrink_is_floored_at_initial_interval() {
        let (interval, _, _) =
            exponential_backoff(&config(), true, Duration::from_millis(1000), 2, 0);
        assert_eq!(interval, Duration::from_millis(1000));
    }

    #[test]
    fn growth_is_capped_at_max_interval() {
        let (interval, _, _) =
            exponential_backoff(&config(), false, Duration::from_millis(8000), 0, 2);
        assert_eq!(interval, Duration::from_millis(8000));
    }

    #[test]
    fn opposite_outcome_resets_the_other_streak() {
        let (_, successes, errors) =
            exponential_backoff(&config(), true, Duration::from_millis(1000), 0, 2);
        assert_eq!((successes, errors), (1, 0));

        let (_, successes, errors) =
            exponential_backoff(&config(), false, Duration::from_millis(1000), 2, 0);
        assert_eq!((successes, errors), (0, 1));
    }

    #[test]
    fn interval_stays_within_bounds_across_any_sequence() {
        let cfg = config();
        let mut state = PollState::new(&cfg);
        let outcomes = [
            false, false, false, false, false, false, false, false, false, true, true, true, true,
            true, true, true, true, true, false, true, false, true,
        ];
        for outcome in outcomes {
            state.observe(&cfg, outcome);
            assert!(state.interval >= cfg.initial_interval());
            assert!(state.interval <= cfg.max_interval());
        }
    }

    #[test]
    fn multiplier_below_one_is_clamped() {
        let cfg = PollConfig {
            backoff_multiplier: 0,
            ..config()
        };
        let (interval, _, _) =
            exponential_backoff(&cfg, false, Duration::from_millis(1000), 0, 2);
        assert_eq!(interval, Duration::from_millis(1000));
    }
}
