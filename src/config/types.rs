use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for placeharvest
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Batch sizing, pacing, and halting-heuristic configuration
///
/// These are passed by value into each orchestrator at construction; there
/// are no process-wide mutable settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Queries submitted to the executor per search batch
    #[serde(rename = "search-batch-size", default = "default_search_batch")]
    pub search_batch_size: usize,

    /// Links submitted to the executor per details batch
    #[serde(rename = "details-batch-size", default = "default_details_batch")]
    pub details_batch_size: usize,

    /// Courtesy delay between batches (milliseconds)
    #[serde(rename = "batch-delay-ms", default = "default_batch_delay")]
    pub batch_delay_ms: u64,

    /// Consecutive zero-unique-result batches before the details phase halts
    #[serde(rename = "empty-batch-halt-threshold", default = "default_empty_halt")]
    pub empty_batch_halt_threshold: u32,

    /// Per-batch failed-slot fraction that counts as a bad batch
    #[serde(rename = "error-rate-threshold", default = "default_error_rate")]
    pub error_rate_threshold: f64,

    /// Consecutive bad batches before the error-rate heuristic halts
    #[serde(rename = "error-rate-batch-limit", default = "default_error_batches")]
    pub error_rate_batch_limit: u32,

    /// Minimum rating a place must carry to be kept by the executor
    #[serde(rename = "min-rating", default = "default_min_rating")]
    pub min_rating: f64,
}

fn default_search_batch() -> usize {
    30
}

fn default_details_batch() -> usize {
    100
}

fn default_batch_delay() -> u64 {
    2000
}

fn default_empty_halt() -> u32 {
    5
}

fn default_error_rate() -> f64 {
    0.8
}

fn default_error_batches() -> u32 {
    3
}

fn default_min_rating() -> f64 {
    3.0
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search_batch_size: default_search_batch(),
            details_batch_size: default_details_batch(),
            batch_delay_ms: default_batch_delay(),
            empty_batch_halt_threshold: default_empty_halt(),
            error_rate_threshold: default_error_rate(),
            error_rate_batch_limit: default_error_batches(),
            min_rating: default_min_rating(),
        }
    }
}

impl PipelineConfig {
    /// The inter-batch delay as a [`Duration`]
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

/// Checkpoint and output directory layout
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding all checkpoint artifacts
    #[serde(rename = "checkpoint-dir", default = "default_checkpoint_dir")]
    pub checkpoint_dir: String,

    /// Directory holding the saved-entity collection
    #[serde(rename = "output-dir", default = "default_output_dir")]
    pub output_dir: String,
}

fn default_checkpoint_dir() -> String {
    "checkpoints".to_string()
}

fn default_output_dir() -> String {
    "output".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: default_checkpoint_dir(),
            output_dir: default_output_dir(),
        }
    }
}

/// Settings for the default HTTP batch executor
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Search endpoint; the query text is appended as a `q` parameter
    #[serde(rename = "search-endpoint", default = "default_search_endpoint")]
    pub search_endpoint: String,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// User agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

fn default_search_endpoint() -> String {
    "https://www.google.com/maps/search/".to_string()
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    format!("placeharvest/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            search_endpoint: default_search_endpoint(),
            request_timeout_ms: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}
