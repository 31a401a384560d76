/// Half-width of the window used to match an approximate occurrence timestamp.
pub const DEFAULT_TOLERANCE_SECONDS: i64 = 60;

/// Upper bound on occurrences materialized by a single expansion.
pub const DEFAULT_MAX_OCCURRENCES: usize = 1000;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Prefix for environment variable overrides, e.g. `ALMANAC__EXPANSION__TOLERANCE_SECONDS`.
pub const ENV_PREFIX: &str = "ALMANAC";

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
