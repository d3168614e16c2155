use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::PacingConfig;

/// Upper bound on a single wait, whatever the configured rate.
const MAX_WAIT: Duration = Duration::from_secs(3600);

/// Token bucket limiting how fast record operations are issued.
///
/// The bucket starts full, so the first `burst` acquisitions return
/// immediately.
pub struct Pacer {
    rate: f64,
    burst: f64,
    state: Mutex<Bucket>,
}

struct Bucket {
    tokens: f64,
    last: Instant,
}

impl Pacer {
    #[must_use]
    pub fn new(config: PacingConfig) -> Self {
        let burst = f64::from(config.burst.max(1));
        Self {
            rate: config.requests_per_second,
            burst,
            state: Mutex::new(Bucket {
                tokens: burst,
                last: Instant::now(),
            }),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.rate > 0.0
    }

    /// Wait until a token is available and take it.
    pub async fn acquire(&self) {
        if !self.is_enabled() {
            return;
        }

        let mut bucket = self.state.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last).as_secs_f64();
        bucket.tokens = elapsed.mul_add(self.rate, bucket.tokens).min(self.burst);
        bucket.last = now;

        if bucket.tokens < 1.0 {
            let wait = Duration::try_from_secs_f64((1.0 - bucket.tokens) / self.rate)
                .map_or(MAX_WAIT, |wait| wait.min(MAX_WAIT));
            tokio::time::sleep(wait).await;
            bucket.tokens = 0.0;
            bucket.last = Instant::now();
        } else {
            bucket.tokens -= 1.0;
        }
    }
}
