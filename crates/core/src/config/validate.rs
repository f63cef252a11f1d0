use super::{types::Config, ConfigError};

/// Validate configuration
///
/// Rejects values that would make the limiter, the call poller or the
/// outreach stage meaningless (zero capacities and intervals), and generative
/// providers that have no way to authenticate.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.rate_limit.capacity == 0 {
        return Err(ConfigError::ValidationError(
            "rate_limit.capacity must be at least 1".to_string(),
        ));
    }
    if config.rate_limit.window_ms == 0 {
        return Err(ConfigError::ValidationError(
            "rate_limit.window_ms cannot be 0".to_string(),
        ));
    }

    if config.calls.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "calls.poll_interval_ms cannot be 0".to_string(),
        ));
    }
    if config.calls.max_polling_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "calls.max_polling_attempts must be at least 1".to_string(),
        ));
    }

    if config.pipeline.outreach_top_n == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.outreach_top_n must be at least 1".to_string(),
        ));
    }

    if let Some(generative) = &config.generative {
        generative.validate().map_err(ConfigError::ValidationError)?;
    }

    if let Some(telephony) = &config.telephony {
        if telephony.api_base.is_empty() {
            return Err(ConfigError::ValidationError(
                "telephony.api_base cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}
