//! Politeness delay shared by all workers
//!
//! Request starts are serialized through one slot: a worker that wants to send a
//! request waits until `delay` has passed since the previous request started.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum interval between request starts across the whole crawl
#[derive(Debug)]
pub struct Politeness {
    delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Politeness {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits until the caller may start a request, then claims the slot
    pub async fn wait_turn(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Upper bound on a delay requested by robots.txt
pub const MAX_ROBOTS_DELAY: Duration = Duration::from_secs(120);

/// Calculates the delay actually enforced for the crawl
///
/// This takes the maximum of:
/// - The configured download delay
/// - The robots.txt crawl delay (if specified), capped at [`MAX_ROBOTS_DELAY`]
pub fn effective_delay(configured: Duration, robots_delay_secs: Option<f64>) -> Duration {
    let robots_delay = robots_delay_secs
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .map(|secs| Duration::from_secs_f64(secs.min(MAX_ROBOTS_DELAY.as_secs_f64())))
        .unwrap_or(Duration::ZERO);

    std::cmp::max(configured, robots_delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_request_is_immediate() {
        let politeness = Politeness::new(Duration::from_secs(1));
        let start = Instant::now();
        politeness.wait_turn().await;
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_spaced_by_delay() {
        let politeness = Politeness::new(Duration::from_secs(1));
        let start = Instant::now();

        politeness.wait_turn().await;
        politeness.wait_turn().await;
        politeness.wait_turn().await;

        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_never_waits() {
        let politeness = Politeness::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..5 {
            politeness.wait_turn().await;
        }
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[test]
    fn test_effective_delay_uses_config() {
        let delay = effective_delay(Duration::from_millis(1000), None);
        assert_eq!(delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_effective_delay_with_larger_robots_delay() {
        let delay = effective_delay(Duration::from_millis(1000), Some(5.0));
        assert_eq!(delay, Duration::from_secs(5));
    }

    #[test]
    fn test_effective_delay_robots_smaller_than_config() {
        let delay = effective_delay(Duration::from_millis(1000), Some(0.5));
        assert_eq!(delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_effective_delay_caps_huge_robots_delay() {
        let delay = effective_delay(Duration::from_millis(1000), Some(1e20));
        assert_eq!(delay, MAX_ROBOTS_DELAY);
        let delay = effective_delay(Duration::from_millis(1000), Some(f64::MAX));
        assert_eq!(delay, MAX_ROBOTS_DELAY);
    }

    #[test]
    fn test_effective_delay_keeps_larger_configured_delay() {
        let configured = MAX_ROBOTS_DELAY + Duration::from_secs(30);
        assert_eq!(effective_delay(configured, Some(1e20)), configured);
    }

    #[test]
    fn test_effective_delay_ignores_nonsense() {
        let delay = effective_delay(Duration::from_millis(200), Some(f64::NAN));
        assert_eq!(delay, Duration::from_millis(200));
        let delay = effective_delay(Duration::from_millis(200), Some(-3.0));
        assert_eq!(delay, Duration::from_millis(200));
    }
}
