//! Application configuration. Remote service endpoint, session, calendar rules, paths.

use crate::domain::WeeklyOff;
use chrono::Weekday;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8088/api";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_EXPORT_DIR: &str = "./exports";

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Exam service API root. Read from EXAMGRID_API_BASE_URL.
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Session to schedule into. Read from EXAMGRID_SESSION_ID; prompted for when unset.
    #[serde(default)]
    pub session_id: Option<i64>,

    /// Comma-separated weekday names excluded every week ("sunday", "friday,saturday",
    /// "none"). Read from EXAMGRID_WEEKLY_OFF.
    #[serde(default)]
    pub weekly_off: Option<String>,

    #[serde(default)]
    pub request_timeout_ms: Option<u64>,

    /// Only offer rooms the catalog flags as available (default true).
    #[serde(default)]
    pub available_rooms_only: Option<bool>,

    /// Serve every port from a JSON fixture instead of the remote service.
    #[serde(default)]
    pub fixture_path: Option<String>,

    #[serde(default)]
    pub export_dir: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("EXAMGRID"));
        if let Ok(path) = std::env::var("EXAMGRID_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    pub fn api_base_url_or_default(&self) -> String {
        self.api_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS))
    }

    pub fn available_rooms_only_or_default(&self) -> bool {
        self.available_rooms_only.unwrap_or(true)
    }

    pub fn export_dir_or_default(&self) -> String {
        self.export_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_EXPORT_DIR.to_string())
    }

    /// Parsed weekly day-off rule. Defaults to Sunday; unknown names are skipped with a warning.
    pub fn weekly_off_or_default(&self) -> WeeklyOff {
        match self.weekly_off.as_deref() {
            None => WeeklyOff::sunday(),
            Some(raw) => parse_weekly_off(raw),
        }
    }
}

fn parse_weekly_off(raw: &str) -> WeeklyOff {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
        return WeeklyOff::none();
    }
    let days: Vec<Weekday> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|name| match name.parse::<Weekday>() {
            Ok(day) => Some(day),
            Err(_) => {
                warn!(value = name, "ignoring unknown weekday in weekly_off");
                None
            }
        })
        .collect();
    WeeklyOff::new(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.api_base_url_or_default(), DEFAULT_API_BASE_URL);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(10));
        assert!(cfg.available_rooms_only_or_default());
        assert_eq!(cfg.export_dir_or_default(), "./exports");
        assert_eq!(cfg.weekly_off_or_default(), WeeklyOff::sunday());
    }

    #[test]
    fn weekly_off_accepts_lists_and_none() {
        let two = parse_weekly_off("Friday, sat");
        assert_eq!(two.days(), &[Weekday::Fri, Weekday::Sat]);
        let sunday = chrono::NaiveDate::from_ymd_opt(2025, 1, 12).unwrap();
        assert!(!two.is_off(sunday));

        assert!(parse_weekly_off("none").days().is_empty());
        assert_eq!(parse_weekly_off("sunday,funday"), WeeklyOff::sunday());
    }
}
