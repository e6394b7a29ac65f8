use std::time::Duration;

use rand::Rng;

/// Bounded, jittered exponential backoff for the counter's compare-and-set loop.
///
/// The first retry after a lost race only yields; later retries sleep with
/// exponential backoff capped at `max_delay_ms`.
#[derive(Debug, Clone)]
pub struct CasPolicy {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_pct: f64,
}

impl CasPolicy {
    pub fn new(max_attempts: usize, base_delay_ms: u64, max_delay_ms: u64, jitter_pct: f64) -> Self {
        let clamped_attempts = max_attempts.max(1);
        let clamped_base = base_delay_ms.max(1);
        let clamped_max_delay = max_delay_ms.max(clamped_base);
        let clamped_jitter = jitter_pct.clamp(0.0, 1.0);
        Self {
            max_attempts: clamped_attempts,
            base_delay_ms: clamped_base,
            max_delay_ms: clamped_max_delay,
            jitter_pct: clamped_jitter,
        }
    }

    /// Delay before attempt number `attempt` (0-based). `None` means retry after
    /// a bare yield.
    pub fn delay_before(&self, attempt: usize) -> Option<Duration> {
        if attempt <= 1 {
            return None;
        }
        let exp = 2_u64.saturating_pow((attempt - 2) as u32);
        let delay = self.base_delay_ms.saturating_mul(exp).min(self.max_delay_ms);
        let jittered = if self.jitter_pct > 0.0 {
            let spread = (delay as f64 * self.jitter_pct) as i64;
            let delta = rand::thread_rng().gen_range(-spread..=spread);
            delay.saturating_add_signed(delta)
        } else {
            delay
        };
        Some(Duration::from_millis(jittered))
    }

    /// Suspend before attempt number `attempt`.
    pub async fn pause(&self, attempt: usize) {
        match self.delay_before(attempt) {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
    }
}

impl Default for CasPolicy {
    fn default() -> Self {
        Self::new(64, 1, 50, 0.25)
    }
}
