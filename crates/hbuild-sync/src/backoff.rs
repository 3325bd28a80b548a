use std::time::Duration;

use rand::Rng;

use hbuild_client::{BackoffStrategy, ReconnectConfig};

/// Delay before reconnect attempt `attempt` (1-based), capped at `max`.
pub fn compute_backoff(
    base: Duration,
    max: Duration,
    attempt: u32,
    strategy: BackoffStrategy,
) -> Duration {
    let attempt = attempt.max(1);
    let delay = match strategy {
        BackoffStrategy::None => base,
        BackoffStrategy::Linear => base.saturating_mul(attempt),
        BackoffStrategy::Exponential => {
            base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
        }
    };
    delay.min(max)
}

/// Spread reconnects over `[delay / 2, delay]`.
pub fn jitter(delay: Duration) -> Duration {
    let half = delay / 2;
    if half.is_zero() {
        return delay;
    }
    let extra = rand::thread_rng().gen_range(0..=half.as_millis() as u64);
    half + Duration::from_millis(extra)
}

/// Backoff for a reconnect, honoring a server-sent `retry:` override of the base.
pub fn reconnect_delay(
    config: &ReconnectConfig,
    attempt: u32,
    retry_override: Option<Duration>,
) -> Duration {
    let base = retry_override.unwrap_or(Duration::from_millis(config.base_ms));
    let max = Duration::from_millis(config.max_ms.max(config.base_ms));
    jitter(compute_backoff(base, max, attempt, config.strategy))
}

#[cfg(test)]
mod tests {
    use super::*;

    const S: Duration = Duration::from_secs(1);
    const CAP: Duration = Duration::from_secs(30);

    #[test]
    fn none_is_constant() {
        assert_eq!(compute_backoff(S, CAP, 1, BackoffStrategy::None), S);
        assert_eq!(compute_backoff(S, CAP, 9, BackoffStrategy::None), S);
    }

    #[test]
    fn linear_grows() {
        assert_eq!(compute_backoff(S, CAP, 3, BackoffStrategy::Linear), 3 * S);
    }

    #[test]
    fn exponential_doubles_and_caps() {
        assert_eq!(compute_backoff(S, CAP, 1, BackoffStrategy::Exponential), S);
        assert_eq!(compute_backoff(S, CAP, 2, BackoffStrategy::Exponential), 2 * S);
        assert_eq!(compute_backoff(S, CAP, 4, BackoffStrategy::Exponential), 8 * S);
        assert_eq!(compute_backoff(S, CAP, 40, BackoffStrategy::Exponential), CAP);
    }

    #[test]
    fn attempt_zero_treated_as_first() {
        assert_eq!(compute_backoff(S, CAP, 0, BackoffStrategy::Exponential), S);
    }

    #[test]
    fn jitter_stays_in_range() {
        for _ in 0..100 {
            let d = jitter(Duration::from_millis(1000));
            assert!(d >= Duration::from_millis(500) && d <= Duration::from_millis(1000));
        }
        assert_eq!(jitter(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn retry_override_replaces_base() {
        let cfg = ReconnectConfig {
            base_ms: 10_000,
            max_ms: 60_000,
            strategy: BackoffStrategy::None,
        };
        let d = reconnect_delay(&cfg, 1, Some(Duration::from_millis(200)));
        assert!(d <= Duration::from_millis(200));
    }
}
