use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Import limits are usable (budget, workers, radius, identity)
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let import = &config.import;
    if import.system_user_id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "import.system_user_id cannot be empty".to_string(),
        ));
    }
    if import.time_budget_secs == 0 {
        return Err(ConfigError::ValidationError(
            "import.time_budget_secs must be at least 1".to_string(),
        ));
    }
    if import.photo_workers == 0 {
        return Err(ConfigError::ValidationError(
            "import.photo_workers must be at least 1".to_string(),
        ));
    }
    if !(import.search_radius_m.is_finite() && import.search_radius_m > 0.0) {
        return Err(ConfigError::ValidationError(
            "import.search_radius_m must be a positive number".to_string(),
        ));
    }

    Ok(())
}
