//! Cron expression parsing and next-occurrence computation.
//!
//! An [`Expression`] is the pure scheduling half of a job: parsing is done
//! once up front, and `next_after` deterministically maps a reference time to
//! the next matching instant. Supports standard 5-field cron, extended
//! 6-field cron with seconds, shortcuts (`@daily`, `@hourly`, ...), and fixed
//! intervals (`@every 90s`, `@every 1h30m`).

use chrono::{DateTime, Duration as TimeDelta, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Upper bound on `@every` intervals. Keeps interval arithmetic comfortably
/// inside chrono's representable range.
const MAX_INTERVAL_SECS: i64 = 100 * 365 * 24 * 3600;

/// Errors that can occur when parsing a schedule expression.
#[derive(Debug, Error)]
pub enum ExpressionError {
    /// Malformed cron expression.
    #[error("invalid cron expression: {0}")]
    Parse(String),

    /// Malformed `@every` interval.
    #[error("invalid interval expression: {0}")]
    Interval(String),

    /// Unknown timezone name.
    #[error("invalid timezone: {0}")]
    Timezone(String),
}

/// A parsed, immutable schedule expression.
///
/// Evaluation is timezone-aware: cron fields are matched in the expression's
/// timezone and results are returned in UTC.
#[derive(Debug, Clone)]
pub struct Expression {
    text: String,
    timezone: Tz,
    kind: Kind,
}

#[derive(Debug, Clone)]
enum Kind {
    /// Cron-style field matching.
    Cron(Box<CronSchedule>),
    /// Fixed step from the reference time.
    Every(TimeDelta),
}

impl Expression {
    /// Parse an expression, evaluated in UTC.
    ///
    /// # Example
    ///
    /// ```
    /// use minicron::Expression;
    ///
    /// let expr = Expression::parse("*/5 * * * *").unwrap();
    /// assert_eq!(expr.as_str(), "*/5 * * * *");
    /// assert!(Expression::parse("not a schedule").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self, ExpressionError> {
        Self::build(text, Tz::UTC)
    }

    /// Parse an expression evaluated in a named timezone.
    pub fn parse_with_timezone(text: &str, timezone: &str) -> Result<Self, ExpressionError> {
        let tz: Tz = timezone
            .parse()
            .map_err(|_| ExpressionError::Timezone(timezone.to_string()))?;
        Self::build(text, tz)
    }

    fn build(text: &str, timezone: Tz) -> Result<Self, ExpressionError> {
        let trimmed = text.trim();
        let kind = if let Some(interval) = trimmed.strip_prefix("@every ") {
            Kind::Every(parse_interval(interval)?)
        } else if trimmed.starts_with('@') {
            parse_cron(expand_shortcut(trimmed)?)?
        } else {
            parse_cron(normalize_fields(trimmed)?)?
        };

        Ok(Self {
            text: trimmed.to_string(),
            timezone,
            kind,
        })
    }

    /// The next occurrence strictly after `after`, or `None` if the schedule
    /// has no further occurrences.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match &self.kind {
            Kind::Cron(schedule) => schedule
                .after(&after.with_timezone(&self.timezone))
                .next()
                .map(|dt| dt.with_timezone(&Utc)),
            Kind::Every(step) => after.checked_add_signed(*step),
        }
    }

    /// The next `n` occurrences strictly after `after`.
    pub fn upcoming(&self, after: DateTime<Utc>, n: usize) -> Vec<DateTime<Utc>> {
        match &self.kind {
            Kind::Cron(schedule) => schedule
                .after(&after.with_timezone(&self.timezone))
                .take(n)
                .map(|dt| dt.with_timezone(&Utc))
                .collect(),
            Kind::Every(step) => {
                let mut occurrences = Vec::with_capacity(n);
                let mut current = after;
                for _ in 0..n {
                    match current.checked_add_signed(*step) {
                        Some(next) => {
                            occurrences.push(next);
                            current = next;
                        }
                        None => break,
                    }
                }
                occurrences
            }
        }
    }

    /// The original expression text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The timezone this expression is evaluated in.
    pub fn timezone(&self) -> &str {
        self.timezone.name()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Map an `@`-shortcut onto its 5-field equivalent.
fn expand_shortcut(shortcut: &str) -> Result<&'static str, ExpressionError> {
    match shortcut.to_lowercase().as_str() {
        "@yearly" | "@annually" => Ok("0 0 0 1 1 *"),
        "@monthly" => Ok("0 0 0 1 * *"),
        "@weekly" => Ok("0 0 0 * * SUN"),
        "@daily" | "@midnight" => Ok("0 0 0 * * *"),
        "@hourly" => Ok("0 0 * * * *"),
        other => Err(ExpressionError::Parse(format!(
            "unknown shortcut: {}",
            other
        ))),
    }
}

/// Accept 5-field cron (seconds implied zero) or 6-field cron with seconds.
fn normalize_fields(expression: &str) -> Result<String, ExpressionError> {
    match expression.split_whitespace().count() {
        5 => Ok(format!("0 {}", expression)),
        6 => Ok(expression.to_string()),
        n => Err(ExpressionError::Parse(format!(
            "expected 5 or 6 fields, got {}",
            n
        ))),
    }
}

fn parse_cron(expression: impl AsRef<str>) -> Result<Kind, ExpressionError> {
    CronSchedule::from_str(expression.as_ref())
        .map(|schedule| Kind::Cron(Box::new(schedule)))
        .map_err(|e| ExpressionError::Parse(e.to_string()))
}

/// Parse an interval like `30s`, `5m`, `1h30m`, `2d`.
fn parse_interval(interval: &str) -> Result<TimeDelta, ExpressionError> {
    let trimmed = interval.trim();
    let invalid = || ExpressionError::Interval(trimmed.to_string());

    let mut total_secs: i64 = 0;
    let mut digits = String::new();
    for c in trimmed.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let unit_secs: i64 = match c {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            'd' => 86400,
            _ => return Err(invalid()),
        };
        let value: i64 = digits.parse().map_err(|_| invalid())?;
        digits.clear();
        total_secs = value
            .checked_mul(unit_secs)
            .and_then(|v| total_secs.checked_add(v))
            .ok_or_else(invalid)?;
    }

    // A trailing number without a unit, an empty string, or a zero interval
    // are all rejected.
    if !digits.is_empty() || total_secs == 0 || total_secs > MAX_INTERVAL_SECS {
        return Err(invalid());
    }

    Ok(TimeDelta::seconds(total_secs))
}

#[derive(Serialize, Deserialize)]
struct ExpressionRepr {
    expression: String,
    timezone: String,
}

impl Serialize for Expression {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        ExpressionRepr {
            expression: self.text.clone(),
            timezone: self.timezone.name().to_string(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let repr = ExpressionRepr::deserialize(deserializer)?;
        Expression::parse_with_timezone(&repr.expression, &repr.timezone)
            .map_err(serde::de::Error::custom)
    }
}
