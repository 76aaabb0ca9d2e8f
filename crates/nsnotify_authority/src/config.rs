//! Authority configuration.

/// Configuration for an authority node.
#[derive(Debug, Clone)]
pub struct AuthorityConfig {
    /// Maximum number of operations returned per fetch.
    pub max_batch: u32,
}

impl AuthorityConfig {
    /// Creates a new authority configuration.
    pub fn new() -> Self {
        Self { max_batch: 1000 }
    }

    /// Sets the maximum fetch batch size.
    pub fn with_max_batch(mut self, size: u32) -> Self {
        self.max_batch = size;
        self
    }

    /// Clamps a requested limit into `1..=max_batch`.
    pub fn effective_limit(&self, requested: u32) -> usize {
        requested.clamp(1, self.max_batch.max(1)) as usize
    }
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self::new()
    }
}
