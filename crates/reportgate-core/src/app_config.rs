use std::time::Duration;

/// Tuning knobs shared by every report run.
///
/// Credentials are not held here: they arrive through the CLI (flag or
/// `REPORTGATE_TOKEN`) and live only inside the source client.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Items requested per listing page. Bounded to `1..=500`.
    pub page_size: u32,
    /// Listing pages fetched before the run gives up on a source that never
    /// returns a short page.
    pub max_pages: usize,
    /// Concurrent per-item detail requests. Bounded to `1..=16`.
    pub detail_concurrency: usize,
    /// Trailing window, in days, used for the "recent" summary count.
    pub recent_window_days: u32,
    pub run_deadline_secs: u64,
    /// Token appended to commit messages so CI triggers ignore report commits.
    pub commit_marker: String,
}

impl AppConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn run_deadline(&self) -> Duration {
        Duration::from_secs(self.run_deadline_secs)
    }
}
