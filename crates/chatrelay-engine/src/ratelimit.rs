use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Per-client sliding-window request counter. `now` is injected so tests can
/// advance time without sleeping; the gateway passes `Utc::now()`.
pub struct RateLimiter {
    windows: DashMap<String, Vec<DateTime<Utc>>>,
    limit: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: usize, window_secs: u64) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window: Duration::seconds(window_secs as i64),
        }
    }

    pub fn window_secs(&self) -> u64 {
        self.window.num_seconds() as u64
    }

    /// Purge entries older than the window, then admit and record the request
    /// if the client is under the limit. Rejected requests are not recorded.
    /// The entry lock makes purge-check-record atomic per client, so racing
    /// calls never over-admit.
    pub fn admit(&self, client_id: &str, now: DateTime<Utc>) -> bool {
        let mut window = self.windows.entry(client_id.to_string()).or_default();
        window.retain(|&t| now - t < self.window);

        if window.len() >= self.limit {
            return false;
        }

        window.push(now);
        true
    }

    /// Drop clients whose newest request has left the window. Distinct client
    /// ids grow without bound otherwise; the gateway runs this periodically.
    pub fn prune_idle(&self, now: DateTime<Utc>) {
        self.windows
            .retain(|_, window| window.iter().any(|&t| now - t < self.window));
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_limit_then_rejects() {
        let limiter = RateLimiter::new(10, 60);
        let t0 = Utc::now();

        let admitted = (0..15).filter(|_| limiter.admit("client", t0)).count();
        assert_eq!(admitted, 10);

        // After the window passes, admission resumes.
        let later = t0 + Duration::seconds(61);
        assert!(limiter.admit("client", later));
    }

    #[test]
    fn rejected_requests_are_not_recorded() {
        let limiter = RateLimiter::new(2, 60);
        let t0 = Utc::now();
        assert!(limiter.admit("c", t0));
        assert!(limiter.admit("c", t0));
        // These rejections must not extend the window.
        for _ in 0..5 {
            assert!(!limiter.admit("c", t0));
        }
        assert!(limiter.admit("c", t0 + Duration::seconds(61)));
    }

    #[test]
    fn clients_do_not_share_windows() {
        let limiter = RateLimiter::new(1, 60);
        let t0 = Utc::now();
        assert!(limiter.admit("a", t0));
        assert!(limiter.admit("b", t0));
        assert!(!limiter.admit("a", t0));
    }

    #[test]
    fn prune_drops_idle_clients_only() {
        let limiter = RateLimiter::new(10, 60);
        let t0 = Utc::now();
        limiter.admit("old", t0);
        limiter.admit("fresh", t0 + Duration::seconds(59));

        limiter.prune_idle(t0 + Duration::seconds(65));
        assert_eq!(limiter.tracked_clients(), 1);

        // The surviving client keeps its recorded requests.
        let t1 = t0 + Duration::seconds(70);
        assert!(limiter.admit("fresh", t1));
    }

    #[test]
    fn concurrent_admissions_never_exceed_limit() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(10, 60));
        let t0 = Utc::now();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || (0..10).filter(|_| limiter.admit("c", t0)).count())
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 10);
    }
}
