use crate::app_config::AppConfig;
use crate::ConfigError;

pub const MAX_PAGE_SIZE: u32 = 500;
pub const MAX_DETAIL_CONCURRENCY: usize = 16;
pub const MAX_RECENT_WINDOW_DAYS: u32 = 3650;

/// Load application configuration from environment variables already in the process.
///
/// Does not read `.env` files; the binary loads those with `dotenvy` first.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let log_level = or_default("REPORTGATE_LOG_LEVEL", "info");

    let request_timeout_secs = parse_u64("REPORTGATE_REQUEST_TIMEOUT_SECS", "30")?;
    if request_timeout_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "REPORTGATE_REQUEST_TIMEOUT_SECS".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    let user_agent = or_default("REPORTGATE_USER_AGENT", "reportgate/0.1 (report-pipeline)");

    let page_size = parse_u32("REPORTGATE_PAGE_SIZE", "500")?;
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(ConfigError::InvalidEnvVar {
            var: "REPORTGATE_PAGE_SIZE".to_string(),
            reason: format!("must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"),
        });
    }

    let max_pages = parse_usize("REPORTGATE_MAX_PAGES", "10")?;
    if max_pages == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "REPORTGATE_MAX_PAGES".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let detail_concurrency = parse_usize("REPORTGATE_DETAIL_CONCURRENCY", "4")?;
    if !(1..=MAX_DETAIL_CONCURRENCY).contains(&detail_concurrency) {
        return Err(ConfigError::InvalidEnvVar {
            var: "REPORTGATE_DETAIL_CONCURRENCY".to_string(),
            reason: format!(
                "must be between 1 and {MAX_DETAIL_CONCURRENCY}, got {detail_concurrency}"
            ),
        });
    }

    let recent_window_days = parse_u32("REPORTGATE_RECENT_WINDOW_DAYS", "30")?;
    if !(1..=MAX_RECENT_WINDOW_DAYS).contains(&recent_window_days) {
        return Err(ConfigError::InvalidEnvVar {
            var: "REPORTGATE_RECENT_WINDOW_DAYS".to_string(),
            reason: format!(
                "must be between 1 and {MAX_RECENT_WINDOW_DAYS}, got {recent_window_days}"
            ),
        });
    }

    let run_deadline_secs = parse_u64("REPORTGATE_RUN_DEADLINE_SECS", "600")?;
    if run_deadline_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "REPORTGATE_RUN_DEADLINE_SECS".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    let commit_marker = or_default("REPORTGATE_COMMIT_MARKER", "[skip ci]");

    Ok(AppConfig {
        log_level,
        request_timeout_secs,
        user_agent,
        page_size,
        max_pages,
        detail_concurrency,
        recent_window_days,
        run_deadline_secs,
        commit_marker,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
