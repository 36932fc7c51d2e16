use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Spaces out calls so that at most one starts per `min_interval`.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// Waits out the rest of the interval since the previous call, then
    /// records this call. The first call never waits.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        self.last = Some(Instant::now());
    }
}
