use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Sliding-window rate limiter shared by all worker executors.
///
/// `acquire` suspends until a start slot is free in the rolling window; the
/// timestamp log is the only shared state and is mutex-guarded.
pub struct RateLimiter {
    max_per_window: usize,
    window: Duration,
    starts: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_per_window: usize, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            starts: Mutex::new(VecDeque::with_capacity(max_per_window)),
        }
    }

    /// Wait for a start slot and consume it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut starts = self.starts.lock().await;
                let now = Instant::now();
                while let Some(front) = starts.front() {
                    if now.duration_since(*front) >= self.window {
                        starts.pop_front();
                    } else {
                        break;
                    }
                }
                if starts.len() < self.max_per_window {
                    starts.push_back(now);
                    return;
                }
                // Oldest start ages out of the window first; sleep until then.
                *starts.front().expect("window is non-empty here") + self.window - now
            };
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_within_limit_is_immediate() {
        let limiter = RateLimiter::new(10, Duration::from_secs(1));
        let before = Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn eleventh_start_waits_for_the_window() {
        let limiter = RateLimiter::new(10, Duration::from_secs(1));
        let before = Instant::now();
        for _ in 0..11 {
            limiter.acquire().await;
        }
        assert!(Instant::now() - before >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_100_never_exceeds_10_per_rolling_second() {
        let limiter = RateLimiter::new(10, Duration::from_secs(1));
        let mut stamps = Vec::with_capacity(100);
        for _ in 0..100 {
            limiter.acquire().await;
            stamps.push(Instant::now());
        }
        for (i, t) in stamps.iter().enumerate() {
            let in_window = stamps[..=i]
                .iter()
                .filter(|s| t.duration_since(**s) < Duration::from_secs(1))
                .count();
            assert!(in_window <= 10, "{} starts within one second", in_window);
        }
        // 100 starts at 10/s need at least 9 full windows.
        assert!(stamps[99] - stamps[0] >= Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn slots_free_up_as_the_window_slides() {
        let limiter = RateLimiter::new(2, Duration::from_secs(1));
        limiter.acquire().await;
        limiter.acquire().await;

        tokio::time::advance(Duration::from_secs(1)).await;
        let before = Instant::now();
        limiter.acquire().await;
        assert_eq!(Instant::now(), before);
    }
}
