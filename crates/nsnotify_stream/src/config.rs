//! Configuration for the event stream.

use std::time::Duration;

/// Configuration for an event stream.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Addresses of every authority of the nameservice, in failover order.
    pub authorities: Vec<String>,
    /// Maximum number of operations requested per fetch.
    pub batch_size: u32,
    /// First delay of a blocking poll.
    pub initial_backoff: Duration,
    /// Upper bound for a single blocking-poll delay.
    pub max_backoff: Duration,
    /// Redirects followed per request before giving up.
    pub max_redirects: u32,
}

impl StreamConfig {
    /// Creates a configuration for the given authorities.
    pub fn new<I, S>(authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            authorities: authorities.into_iter().map(Into::into).collect(),
            batch_size: 1000,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_secs(1),
            max_redirects: 3,
        }
    }

    /// Adds an authority address.
    pub fn with_authority(mut self, addr: impl Into<String>) -> Self {
        self.authorities.push(addr.into());
        self
    }

    /// Sets the fetch batch size.
    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }

    /// Sets the first blocking-poll delay.
    pub fn with_initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = delay;
        self
    }

    /// Sets the maximum blocking-poll delay.
    pub fn with_max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = delay;
        self
    }

    /// Sets the redirect limit.
    pub fn with_max_redirects(mut self, hops: u32) -> Self {
        self.max_redirects = hops;
        self
    }

    /// Delay before retry `attempt` (0-indexed): doubles from
    /// `initial_backoff` and saturates at `max_backoff`.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_config_builder() {
        let config = StreamConfig::new(["nn0:8020"])
            .with_authority("nn1:8020")
            .with_batch_size(50)
            .with_max_redirects(5)
            .with_max_backoff(Duration::from_millis(200));

        assert_eq!(config.authorities, vec!["nn0:8020", "nn1:8020"]);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.max_backoff, Duration::from_millis(200));
        assert_eq!(config.initial_backoff, Duration::from_millis(10));
    }

    #[test]
    fn default_has_no_authorities() {
        let config = StreamConfig::default();
        assert!(config.authorities.is_empty());
        assert_eq!(config.batch_size, 1000);
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        let config = StreamConfig::default().with_max_backoff(Duration::from_millis(100));
        assert_eq!(config.backoff_for_attempt(0), Duration::from_millis(10));
        assert_eq!(config.backoff_for_attempt(1), Duration::from_millis(20));
        assert_eq!(config.backoff_for_attempt(3), Duration::from_millis(80));
        assert_eq!(config.backoff_for_attempt(4), Duration::from_millis(100));
        assert_eq!(config.backoff_for_attempt(40), Duration::from_millis(100));
    }
}
