use crate::progress::{PhaseProgressProcessor, ProgressCache, ProgressConfig};

/// State shared by all request handlers
pub struct AppState {
    pub processor: PhaseProgressProcessor,
    pub progress_cache: ProgressCache,
}

impl AppState {
    /// Creates the state, sizing the cache from the configuration
    pub fn new(config: ProgressConfig) -> Self {
        let progress_cache = ProgressCache::new(config.cache_ttl(), config.cache_max_students);
        Self {
            processor: PhaseProgressProcessor::new(config),
            progress_cache,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ProgressConfig::default())
    }
}
