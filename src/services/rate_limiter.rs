use parking_lot::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// Spaces out calls to a price provider to stay inside its free-tier quota
/// (Alpha Vantage allows 5 requests per minute, FinMind a few hundred per hour).
///
/// Each caller reserves the next free slot under the lock and sleeps outside it,
/// so concurrent callers are serialized without holding the lock across an await.
pub struct RequestPacer {
    next_slot: Mutex<Instant>,
    min_interval: Duration,
}

impl RequestPacer {
    /// `requests_per_minute == 0` disables pacing.
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let min_interval = if requests_per_minute == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(60_000 / requests_per_minute as u64)
        };

        Self {
            next_slot: Mutex::new(Instant::now()),
            min_interval,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until this caller's slot comes up.
    pub async fn wait_turn(&self) {
        let delay = {
            let mut next = self.next_slot.lock();
            let now = Instant::now();
            let slot = (*next).max(now);
            *next = slot + self.min_interval;
            slot.saturating_duration_since(now)
        };

        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}
