//! Daily usage quotas.
//!
//! Mirrors `GET /api/metrics/usage`. The server formats `next_reset` as a
//! naive ISO timestamp in UTC, so both offset and naive forms are accepted.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Display level of a quota bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaLevel {
    Normal,
    /// Above 75% used.
    Warning,
    /// Above 90% used.
    Critical,
}

/// Used/limit pair for one metered resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Quota {
    pub used: i64,
    pub limit: i64,
}

impl Quota {
    pub fn new(used: i64, limit: i64) -> Self {
        Self { used, limit }
    }

    /// Recompute usage from a `messages_left` update.
    pub fn with_remaining(self, remaining: i64) -> Self {
        Self {
            used: self.limit - remaining,
            limit: self.limit,
        }
    }

    /// Percentage used; zero when the limit is zero.
    pub fn percent(&self) -> f64 {
        if self.limit <= 0 {
            return 0.0;
        }
        self.used as f64 / self.limit as f64 * 100.0
    }

    pub fn level(&self) -> QuotaLevel {
        let pct = self.percent();
        if pct > 90.0 {
            QuotaLevel::Critical
        } else if pct > 75.0 {
            QuotaLevel::Warning
        } else {
            QuotaLevel::Normal
        }
    }
}

impl std::fmt::Display for Quota {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.used, self.limit)
    }
}

/// Snapshot of the user's daily usage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UsageSnapshot {
    pub messages: Quota,
    pub images: Quota,
    #[serde(deserialize_with = "deserialize_reset")]
    pub next_reset: DateTime<Utc>,
}

impl UsageSnapshot {
    /// Time remaining until limits reset, zero if already past.
    pub fn time_until_reset(&self, now: DateTime<Utc>) -> Duration {
        (self.next_reset - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// Countdown text: `"{h}h {m}m"` above one hour, else `"{m}m"`.
    pub fn reset_countdown(&self, now: DateTime<Utc>) -> String {
        format_countdown(self.time_until_reset(now))
    }
}

fn format_countdown(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    if secs > 3600 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}m", secs / 60)
    }
}

fn deserialize_reset<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}
