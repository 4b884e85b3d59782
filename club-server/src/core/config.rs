//! Server configuration
//!
//! All settings can be overridden through environment variables:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | WORK_DIR | /var/lib/club/server | working directory (database, logs) |
//! | VENUE_TIMEZONE | America/Santiago | venue-local timezone |
//! | FRAUD_MAX_DELIVERY_ATTEMPTS | 3 | delivery count threshold per ticket |
//! | FRAUD_MAX_TICKET_AGE_HOURS | 24 | ticket age threshold |
//! | AUDIT_BUFFER_SIZE | 256 | audit channel capacity |
//! | CLOSE_WEBHOOK_URL | (unset) | shift-close notification target |
//! | SHIFT_CACHE_TTL_MS | 60000 | shift-status cache TTL |
//! | ENVIRONMENT | development | development / staging / production |

use chrono_tz::Tz;
use std::path::PathBuf;

/// Fraud heuristic thresholds
#[derive(Debug, Clone, Copy)]
pub struct FraudPolicy {
    /// A ticket with more recorded deliveries than this is flagged
    pub max_delivery_attempts: i64,
    /// A ticket older than this many hours is flagged
    pub max_ticket_age_hours: i64,
}

impl Default for FraudPolicy {
    fn default() -> Self {
        Self {
            max_delivery_attempts: 3,
            max_ticket_age_hours: 24,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory; the database lives in `<work_dir>/database/`
    pub work_dir: String,
    /// Venue-local timezone for business dates
    pub timezone: Tz,
    /// Fraud heuristic thresholds
    pub fraud: FraudPolicy,
    /// Audit channel capacity
    pub audit_buffer_size: usize,
    /// Shift-close webhook target; notifications are log-only when unset
    pub close_webhook_url: Option<String>,
    /// Shift-status cache TTL (milliseconds)
    pub shift_cache_ttl_ms: i64,
    /// Running environment: development | staging | production
    pub environment: String,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults
    pub fn from_env() -> Self {
        let timezone = std::env::var("VENUE_TIMEZONE")
            .ok()
            .and_then(|v| v.parse::<Tz>().ok())
            .unwrap_or(chrono_tz::America::Santiago);

        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/club/server".into()),
            timezone,
            fraud: FraudPolicy {
                max_delivery_attempts: env_parse("FRAUD_MAX_DELIVERY_ATTEMPTS", 3),
                max_ticket_age_hours: env_parse("FRAUD_MAX_TICKET_AGE_HOURS", 24),
            },
            audit_buffer_size: env_parse("AUDIT_BUFFER_SIZE", 256),
            close_webhook_url: std::env::var("CLOSE_WEBHOOK_URL").ok().filter(|v| !v.is_empty()),
            shift_cache_ttl_ms: env_parse("SHIFT_CACHE_TTL_MS", 60_000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// Override the work directory; used by tests
    pub fn with_work_dir(work_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config
    }

    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
