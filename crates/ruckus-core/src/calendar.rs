//! Work-day and work-hour inclusion windows.
//!
//! Schedules can restrict firing to certain days of the week and hours of
//! the day. The inclusion lists arrive as cron-like sub-expressions:
//! a comma-separated list of items, each a single value or a `lo-hi` range.
//! Days accept numbers 0-6 (0 = Sunday) or case-insensitive three-letter
//! mnemonics (`sun` ... `sat`); hours accept numbers 0-23 only.
//!
//! Parsing yields a bitset plus the normalized numeric sub-expression that
//! gets spliced into the derived cron string. Malformed input fails the
//! whole parse; there is no partial matching.

use chrono::{DateTime, Datelike, Timelike, Utc};

use ruckus_types::error::ScheduleDefinitionError;

const WEEKDAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Deterministic engine-name suffix: unix seconds of the scheduled time.
///
/// Naming an engine after its scheduled time gives an idempotent lock: a
/// retry for the same fire collides on the name instead of duplicating the
/// engine.
pub fn time_hash(t: DateTime<Utc>) -> i64 {
    t.timestamp()
}

// ---------------------------------------------------------------------------
// DaySet
// ---------------------------------------------------------------------------

/// Set of included weekdays (0 = Sunday ... 6 = Saturday).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySet {
    bits: u8,
    expr: String,
}

impl DaySet {
    /// Parse an `includedDays` sub-expression, e.g. `"0-3,5"` or
    /// `"Mon-Wed,Fri"`.
    pub fn parse(expr: &str) -> Result<Self, ScheduleDefinitionError> {
        let fail = |reason: String| ScheduleDefinitionError::InvalidDays {
            expr: expr.to_string(),
            reason,
        };
        let mut bits = 0u8;
        let mut normalized = Vec::new();
        for item in split_items(expr).map_err(&fail)? {
            match item {
                Item::Single(raw) => {
                    let day = day_index(raw).map_err(&fail)?;
                    bits |= 1 << day;
                    normalized.push(day.to_string());
                }
                Item::Range(lo_raw, hi_raw) => {
                    let lo = day_index(lo_raw).map_err(&fail)?;
                    let hi = day_index(hi_raw).map_err(&fail)?;
                    if lo > hi {
                        return Err(fail(format!("descending range '{lo_raw}-{hi_raw}'")));
                    }
                    for day in lo..=hi {
                        bits |= 1 << day;
                    }
                    normalized.push(format!("{lo}-{hi}"));
                }
            }
        }
        Ok(Self {
            bits,
            expr: normalized.join(","),
        })
    }

    /// The normalized numeric sub-expression (mnemonics resolved).
    pub fn expression(&self) -> &str {
        &self.expr
    }

    pub fn contains(&self, day: u8) -> bool {
        day <= 6 && self.bits & (1 << day) != 0
    }

    /// Whether `t`'s weekday is included.
    pub fn contains_time(&self, t: DateTime<Utc>) -> bool {
        self.contains(t.weekday().num_days_from_sunday() as u8)
    }
}

// ---------------------------------------------------------------------------
// HourSet
// ---------------------------------------------------------------------------

/// Set of included hours of the day (0-23).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourSet {
    bits: u32,
    expr: String,
}

impl HourSet {
    /// Parse an `includedHours` sub-expression, e.g. `"9-17"` or
    /// `"0,6,12,18"`. Numeric forms only.
    pub fn parse(expr: &str) -> Result<Self, ScheduleDefinitionError> {
        let fail = |reason: String| ScheduleDefinitionError::InvalidHours {
            expr: expr.to_string(),
            reason,
        };
        let mut bits = 0u32;
        let mut normalized = Vec::new();
        for item in split_items(expr).map_err(&fail)? {
            match item {
                Item::Single(raw) => {
                    let hour = hour_index(raw).map_err(&fail)?;
                    bits |= 1 << hour;
                    normalized.push(hour.to_string());
                }
                Item::Range(lo_raw, hi_raw) => {
                    let lo = hour_index(lo_raw).map_err(&fail)?;
                    let hi = hour_index(hi_raw).map_err(&fail)?;
                    if lo > hi {
                        return Err(fail(format!("descending range '{lo_raw}-{hi_raw}'")));
                    }
                    for hour in lo..=hi {
                        bits |= 1 << hour;
                    }
                    normalized.push(format!("{lo}-{hi}"));
                }
            }
        }
        Ok(Self {
            bits,
            expr: normalized.join(","),
        })
    }

    /// The normalized sub-expression.
    pub fn expression(&self) -> &str {
        &self.expr
    }

    pub fn contains(&self, hour: u8) -> bool {
        hour <= 23 && self.bits & (1 << hour) != 0
    }

    /// Whether `t`'s hour is included.
    pub fn contains_time(&self, t: DateTime<Utc>) -> bool {
        self.contains(t.hour() as u8)
    }
}

// ---------------------------------------------------------------------------
// Item splitting
// ---------------------------------------------------------------------------

enum Item<'a> {
    Single(&'a str),
    Range(&'a str, &'a str),
}

fn split_items(expr: &str) -> Result<Vec<Item<'_>>, String> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err("empty expression".to_string());
    }
    let mut items = Vec::new();
    for part in trimmed.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err("empty list item".to_string());
        }
        match part.split_once('-') {
            Some((lo, hi)) => {
                let (lo, hi) = (lo.trim(), hi.trim());
                if lo.is_empty() || hi.is_empty() {
                    return Err(format!("malformed range '{part}'"));
                }
                items.push(Item::Range(lo, hi));
            }
            None => items.push(Item::Single(part)),
        }
    }
    Ok(items)
}

fn day_index(token: &str) -> Result<u8, String> {
    if token.chars().all(|c| c.is_ascii_digit()) {
        let n: u8 = token
            .parse()
            .map_err(|_| format!("day '{token}' is not a number"))?;
        if n > 6 {
            return Err(format!("day {n} out of range 0-6"));
        }
        return Ok(n);
    }
    let lower = token.to_ascii_lowercase();
    WEEKDAY_NAMES
        .iter()
        .position(|name| *name == lower)
        .map(|i| i as u8)
        .ok_or_else(|| format!("unknown weekday '{token}'"))
}

fn hour_index(token: &str) -> Result<u8, String> {
    if !token.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("hour '{token}' is not a number"));
    }
    let n: u8 = token
        .parse()
        .map_err(|_| format!("hour '{token}' is not a number"))?;
    if n > 23 {
        return Err(format!("hour {n} out of range 0-23"));
    }
    Ok(n)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
