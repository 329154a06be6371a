//! Trigger schedule expressions.
//!
//! Supports standard 5-field cron, extended 6-field cron (with seconds),
//! shortcuts (@daily, @hourly, etc.), and interval expressions (@every).

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when parsing schedule expressions.
#[derive(Debug, Clone, Error)]
pub enum ScheduleError {
    /// Invalid cron expression or unknown shortcut.
    #[error("invalid schedule expression: {0}")]
    InvalidExpression(String),

    /// Invalid @every interval.
    #[error("invalid interval expression: {0}")]
    InvalidInterval(String),

    /// Invalid timezone name.
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),
}

/// A parsed trigger schedule.
#[derive(Debug, Clone)]
pub struct Schedule {
    expression: String,
    tz: Tz,
    kind: ScheduleKind,
}

#[derive(Debug, Clone)]
enum ScheduleKind {
    /// Cron-style schedule evaluated in the schedule's timezone.
    Cron(Box<CronSchedule>),
    /// Fixed interval (@every).
    Every(Duration),
}

impl Schedule {
    /// Parse an expression in UTC.
    ///
    /// Supports:
    /// - Standard 5-field cron: `minute hour day month weekday`
    /// - Extended 6-field cron: `second minute hour day month weekday`
    /// - Shortcuts: `@yearly`, `@monthly`, `@weekly`, `@daily`, `@hourly`
    /// - Intervals: `@every 5m`, `@every 1h30m`
    pub fn parse(expression: impl Into<String>) -> Result<Self, ScheduleError> {
        Self::parse_in_tz(expression, "UTC")
    }

    /// Parse an expression evaluated in a named timezone.
    pub fn parse_in_tz(
        expression: impl Into<String>,
        timezone: &str,
    ) -> Result<Self, ScheduleError> {
        let expression = expression.into();
        let tz: Tz = timezone
            .parse()
            .map_err(|_| ScheduleError::InvalidTimezone(timezone.to_string()))?;

        let trimmed = expression.trim();
        let kind = if let Some(interval) = trimmed.strip_prefix("@every ") {
            ScheduleKind::Every(parse_duration(interval.trim())?)
        } else if trimmed.starts_with('@') {
            parse_cron(shortcut_to_cron(trimmed)?)?
        } else {
            parse_cron(trimmed)?
        };

        Ok(Self {
            expression,
            tz,
            kind,
        })
    }

    /// Next occurrence strictly after `after`, or None if there are no more.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match &self.kind {
            ScheduleKind::Cron(schedule) => {
                let local = after.with_timezone(&self.tz);
                schedule
                    .after(&local)
                    .next()
                    .map(|dt| dt.with_timezone(&Utc))
            }
            ScheduleKind::Every(interval) => {
                Some(after + chrono::Duration::from_std(*interval).ok()?)
            }
        }
    }

    /// Next occurrence from now.
    pub fn next(&self) -> Option<DateTime<Utc>> {
        self.next_after(Utc::now())
    }

    /// Whether at least one occurrence falls in the window `(from, until]`.
    pub fn fires_within(&self, from: DateTime<Utc>, until: DateTime<Utc>) -> bool {
        match self.next_after(from) {
            Some(next) => next <= until,
            None => false,
        }
    }

    /// The original expression string.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The timezone the schedule is evaluated in.
    pub fn timezone(&self) -> &str {
        self.tz.name()
    }
}

fn shortcut_to_cron(shortcut: &str) -> Result<&'static str, ScheduleError> {
    match shortcut.to_lowercase().as_str() {
        "@yearly" | "@annually" => Ok("0 0 1 1 *"),
        "@monthly" => Ok("0 0 1 * *"),
        "@weekly" => Ok("0 0 * * SUN"),
        "@daily" | "@midnight" => Ok("0 0 * * *"),
        "@hourly" => Ok("0 * * * *"),
        _ => Err(ScheduleError::InvalidExpression(format!(
            "unknown shortcut: {}",
            shortcut
        ))),
    }
}

fn parse_cron(expression: &str) -> Result<ScheduleKind, ScheduleError> {
    let fields = expression.split_whitespace().count();
    let cron_expr = match fields {
        // Standard 5-field cron, prepend a seconds field.
        5 => format!("0 {}", expression),
        6 => expression.to_string(),
        _ => {
            return Err(ScheduleError::InvalidExpression(format!(
                "expected 5 or 6 fields, got {}",
                fields
            )));
        }
    };

    let schedule = CronSchedule::from_str(&cron_expr)
        .map_err(|e| ScheduleError::InvalidExpression(e.to_string()))?;
    Ok(ScheduleKind::Cron(Box::new(schedule)))
}

/// Parse a duration string like "5m", "1h", "1h30m", "30s".
fn parse_duration(s: &str) -> Result<Duration, ScheduleError> {
    let mut total_secs: u64 = 0;
    let mut current_num = String::new();

    for c in s.chars() {
        if c.is_ascii_digit() {
            current_num.push(c);
        } else {
            let num: u64 = current_num
                .parse()
                .map_err(|_| ScheduleError::InvalidInterval(s.to_string()))?;
            current_num.clear();

            match c {
                's' => total_secs += num,
                'm' => total_secs += num * 60,
                'h' => total_secs += num * 3600,
                'd' => total_secs += num * 86400,
                _ => return Err(ScheduleError::InvalidInterval(s.to_string())),
            }
        }
    }

    if total_secs == 0 || !current_num.is_empty() {
        return Err(ScheduleError::InvalidInterval(s.to_string()));
    }

    Ok(Duration::from_secs(total_secs))
}
