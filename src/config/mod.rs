//! Configuration loading, validation, and integrity hashing

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{Config, FetchConfig, PipelineConfig, StorageConfig};
pub use validation::validate;
