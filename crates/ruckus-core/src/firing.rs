//! Cron derivation and next-fire resolution for repeat schedules.
//!
//! A repeat schedule's semantic description (`minChaosInterval` plus
//! optional work-hour and work-day windows) is lowered to a standard
//! 5-field cron expression:
//!
//! - minutes unit: `*/N <HOURS> * * <DAYS>`, period = N minutes
//! - hours unit:   `0 <HOURS>/N * * <DAYS>`, period = N hours
//!
//! Weekday mnemonics are normalized to integers before splicing. The hours
//! form fires at minute 0 of every Nth selected hour; firing every minute
//! during the selected hours was a defect in earlier revisions of this
//! controller family.
//!
//! Resolution then answers "should an engine be created right now, and if
//! not, when": it scans the derived cron for the most recent missed
//! occurrence since the last fire, taking dormant stretches of the process
//! into account, and falls back to calendar predicates for the very first
//! fire.

use std::time::Duration;

use chrono::{DateTime, Utc};
use croner::Cron;

use ruckus_types::error::ScheduleDefinitionError;
use ruckus_types::schedule::{ChaosSchedule, ScheduleRepeat};

use crate::calendar::{DaySet, HourSet};

// ---------------------------------------------------------------------------
// Interval grammar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IntervalUnit {
    Minutes,
    Hours,
}

/// Parse `minChaosInterval`: `^[0-9]+[mh]$`, N > 0.
fn parse_interval(raw: &str) -> Result<(u32, IntervalUnit), ScheduleDefinitionError> {
    let fail = || ScheduleDefinitionError::InvalidInterval(raw.to_string());
    let (digits, unit) = match (raw.strip_suffix('m'), raw.strip_suffix('h')) {
        (Some(d), _) => (d, IntervalUnit::Minutes),
        (_, Some(d)) => (d, IntervalUnit::Hours),
        _ => return Err(fail()),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(fail());
    }
    let n: u32 = digits.parse().map_err(|_| fail())?;
    if n == 0 {
        return Err(fail());
    }
    Ok((n, unit))
}

// ---------------------------------------------------------------------------
// FirePlan
// ---------------------------------------------------------------------------

/// A derived firing plan: the cron expression, its natural period, and the
/// calendar windows it was built from.
#[derive(Debug, Clone)]
pub struct FirePlan {
    cron: Cron,
    expression: String,
    period: Duration,
    days: Option<DaySet>,
    hours: Option<HourSet>,
}

impl FirePlan {
    /// Derive the plan from a repeat schedule's properties and windows.
    pub fn derive(repeat: &ScheduleRepeat) -> Result<Self, ScheduleDefinitionError> {
        let (n, unit) = parse_interval(&repeat.properties.min_chaos_interval)?;
        let hours = repeat
            .work_hours
            .as_ref()
            .map(|w| HourSet::parse(&w.included_hours))
            .transpose()?;
        let days = repeat
            .work_days
            .as_ref()
            .map(|w| DaySet::parse(&w.included_days))
            .transpose()?;

        let hours_expr = hours.as_ref().map_or("*", |h| h.expression());
        let days_expr = days.as_ref().map_or("*", |d| d.expression());

        let (expression, period) = match unit {
            IntervalUnit::Minutes => (
                format!("*/{n} {hours_expr} * * {days_expr}"),
                Duration::from_secs(u64::from(n) * 60),
            ),
            IntervalUnit::Hours => (
                format!("0 {hours_expr}/{n} * * {days_expr}"),
                Duration::from_secs(u64::from(n) * 3_600),
            ),
        };

        let cron = expression
            .parse::<Cron>()
            .map_err(|e| ScheduleDefinitionError::UnparseableCron {
                expr: expression.clone(),
                reason: e.to_string(),
            })?;
        tracing::debug!(cron = %expression, "derived fire schedule");

        Ok(Self {
            cron,
            expression,
            period,
            days,
            hours,
        })
    }

    /// The rendered 5-field cron expression.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The natural inter-fire interval.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// The first occurrence strictly after `t`.
    pub fn next_after(
        &self,
        t: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, ScheduleDefinitionError> {
        self.cron
            .find_next_occurrence(&t, false)
            .map_err(|_| ScheduleDefinitionError::NoUpcomingFire(self.expression.clone()))
    }

    /// Whether `t` falls inside the configured calendar windows. Absent
    /// windows admit everything.
    pub fn admits(&self, t: DateTime<Utc>) -> bool {
        self.days.as_ref().is_none_or(|d| d.contains_time(t))
            && self.hours.as_ref().is_none_or(|h| h.contains_time(t))
    }
}

// ---------------------------------------------------------------------------
// FireDecision
// ---------------------------------------------------------------------------

/// Outcome of next-fire resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireDecision {
    /// A fire is due now, attributed to `scheduled_time` (which may lie in
    /// the past if the process was dormant at the scheduled instant).
    Due { scheduled_time: DateTime<Utc> },
    /// Nothing is due; the next occurrence is `next_run`, `wait` from now.
    Wait {
        next_run: DateTime<Utc>,
        wait: Duration,
    },
}

fn wait_until(next_run: DateTime<Utc>, now: DateTime<Utc>) -> FireDecision {
    FireDecision::Wait {
        next_run,
        wait: (next_run - now).to_std().unwrap_or_default(),
    }
}

/// Decide whether the schedule should fire at `now`.
///
/// For subsequent fires (a last fire is recorded) the derived cron is
/// scanned from the last fire forward, keeping the most recent occurrence
/// not after `now`. If one exists and the schedule has not already caught
/// up past it (`lastScheduleCompletionTime`), that missed occurrence is due.
///
/// For the first fire the calendar windows decide: inside the windows the
/// schedule is live and immediately due; outside them the next admitted
/// occurrence is computed from the later of the schedule's earliest time
/// and `now`.
pub fn resolve(
    plan: &FirePlan,
    schedule: &ChaosSchedule,
    repeat: &ScheduleRepeat,
    now: DateTime<Utc>,
) -> Result<FireDecision, ScheduleDefinitionError> {
    let status = &schedule.status;

    if let Some(last) = status.last_schedule_time {
        let mut upcoming = plan.next_after(last)?;
        let mut missed: Option<DateTime<Utc>> = None;
        while upcoming <= now {
            missed = Some(upcoming);
            upcoming = plan.next_after(upcoming)?;
        }
        return match missed {
            None => Ok(wait_until(upcoming, now)),
            Some(t) => {
                if status
                    .last_schedule_completion_time
                    .is_some_and(|done| done >= t)
                {
                    // Already caught up past the missed slot.
                    let next_run = plan.next_after(t)?;
                    Ok(wait_until(next_run, now))
                } else {
                    Ok(FireDecision::Due { scheduled_time: t })
                }
            }
        };
    }

    // First fire: no history yet.
    let creation = schedule.metadata.creation_timestamp;
    let earliest = match repeat.time_range.as_ref().and_then(|r| r.start_time) {
        Some(start) if creation <= start => start,
        _ => creation,
    };

    if plan.admits(now) {
        Ok(FireDecision::Due {
            scheduled_time: now,
        })
    } else {
        let next_run = plan.next_after(earliest.max(now))?;
        Ok(wait_until(next_run, now))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
