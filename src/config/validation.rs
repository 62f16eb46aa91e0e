use crate::config::types::Config;
use crate::ConfigError;

/// Validates a parsed configuration
///
/// Rejects settings that would make an orchestrator loop degenerate:
/// zero-sized batches, a zero halting threshold, or an error-rate bound
/// outside (0, 1].
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let p = &config.pipeline;

    if p.search_batch_size == 0 {
        return Err(ConfigError::Validation(
            "search-batch-size must be at least 1".to_string(),
        ));
    }

    if p.details_batch_size == 0 {
        return Err(ConfigError::Validation(
            "details-batch-size must be at least 1".to_string(),
        ));
    }

    if p.empty_batch_halt_threshold == 0 {
        return Err(ConfigError::Validation(
            "empty-batch-halt-threshold must be at least 1".to_string(),
        ));
    }

    if p.error_rate_batch_limit == 0 {
        return Err(ConfigError::Validation(
            "error-rate-batch-limit must be at least 1".to_string(),
        ));
    }

    if !(p.error_rate_threshold > 0.0 && p.error_rate_threshold <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "error-rate-threshold must be in (0, 1], got {}",
            p.error_rate_threshold
        )));
    }

    if !(0.0..=5.0).contains(&p.min_rating) {
        return Err(ConfigError::Validation(format!(
            "min-rating must be between 0 and 5, got {}",
            p.min_rating
        )));
    }

    if config.storage.checkpoint_dir.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint-dir must not be empty".to_string(),
        ));
    }

    if config.storage.output_dir.is_empty() {
        return Err(ConfigError::Validation(
            "output-dir must not be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_search_batch_rejected() {
        let mut config = Config::default();
        config.pipeline.search_batch_size = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_details_batch_rejected() {
        let mut config = Config::default();
        config.pipeline.details_batch_size = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_halt_threshold_rejected() {
        let mut config = Config::default();
        config.pipeline.empty_batch_halt_threshold = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_error_rate_bounds() {
        let mut config = Config::default();
        config.pipeline.error_rate_threshold = 0.0;
        assert!(validate(&config).is_err());

        config.pipeline.error_rate_threshold = 1.0;
        assert!(validate(&config).is_ok());

        config.pipeline.error_rate_threshold = 1.5;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_min_rating_bounds() {
        let mut config = Config::default();
        config.pipeline.min_rating = 6.0;
        assert!(validate(&config).is_err());
        config.pipeline.min_rating = 0.0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_nan_min_rating_rejected() {
        let mut config = Config::default();
        config.pipeline.min_rating = f64::NAN;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_checkpoint_dir_rejected() {
        let mut config = Config::default();
        config.storage.checkpoint_dir = String::new();
        assert!(validate(&config).is_err());
    }
}
