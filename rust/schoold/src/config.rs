use std::env;
use std::path::PathBuf;

pub const DEFAULT_TREND_DAYS: usize = 7;
pub const MAX_TREND_DAYS: usize = 366;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub workspace: Option<PathBuf>,
    pub log_json: bool,
    pub cache_enabled: bool,
    pub trend_days: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            log_json: false,
            cache_enabled: false,
            trend_days: DEFAULT_TREND_DAYS,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

pub fn clamp_trend_days(days: usize) -> usize {
    days.clamp(1, MAX_TREND_DAYS)
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source. Unparseable values fall back to the
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let env_bool = |name: &str, default: bool| {
            lookup(name)
                .as_deref()
                .and_then(parse_bool)
                .unwrap_or(default)
        };
        Self {
            workspace: lookup("SCHOOLD_WORKSPACE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            log_json: env_bool("SCHOOLD_LOG_JSON", defaults.log_json),
            cache_enabled: env_bool("SCHOOLD_CACHE", defaults.cache_enabled),
            trend_days: lookup("SCHOOLD_TREND_DAYS")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .map(clamp_trend_days)
                .unwrap_or(defaults.trend_days),
        }
    }
}
