//! Reminder delay calculation.
//!
//! Event date and time carry no zone. They are combined into a naive
//! instant and compared against "now" in the same naive frame, so the
//! result is only meaningful when both share one local reference.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::ScheduleError;

/// How long until a reminder should fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delay {
    /// Strictly positive wait until the notify instant.
    Wait(Duration),
    /// The notify instant is at or before now; nothing should be scheduled.
    Late,
}

impl Delay {
    /// The wait, if any.
    pub fn wait(&self) -> Option<Duration> {
        match self {
            Self::Wait(d) => Some(*d),
            Self::Late => None,
        }
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_event_date(raw: &str) -> Result<NaiveDate, ScheduleError> {
    let raw = raw.trim();
    if raw.len() != 10 {
        return Err(ScheduleError::InvalidSchedule(format!(
            "event date '{raw}' is not YYYY-MM-DD"
        )));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
        ScheduleError::InvalidSchedule(format!("event date '{raw}' is not YYYY-MM-DD: {e}"))
    })
}

/// Parse an `HH:MM` (or `HH:MM:SS`) time of day.
pub fn parse_event_time(raw: &str) -> Result<NaiveTime, ScheduleError> {
    let raw = raw.trim();
    let format = match raw.len() {
        5 => "%H:%M",
        8 => "%H:%M:%S",
        _ => {
            return Err(ScheduleError::InvalidSchedule(format!(
                "event time '{raw}' is not HH:MM"
            )));
        }
    };
    NaiveTime::parse_from_str(raw, format).map_err(|e| {
        ScheduleError::InvalidSchedule(format!("event time '{raw}' is not HH:MM: {e}"))
    })
}

/// Compute the delay until `lead_minutes` before the event starts.
pub fn compute_delay(
    event_date: NaiveDate,
    event_time: NaiveTime,
    lead_minutes: u32,
    now: NaiveDateTime,
) -> Delay {
    let notify_at = event_date.and_time(event_time) - Duration::minutes(i64::from(lead_minutes));
    let delay = notify_at - now;

    if delay > Duration::zero() {
        Delay::Wait(delay)
    } else {
        Delay::Late
    }
}

/// Parse the raw date and time, then [`compute_delay`].
pub fn compute_delay_str(
    event_date: &str,
    event_time: &str,
    lead_minutes: u32,
    now: NaiveDateTime,
) -> Result<Delay, ScheduleError> {
    let date = parse_event_date(event_date)?;
    let time = parse_event_time(event_time)?;
    Ok(compute_delay(date, time, lead_minutes, now))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        parse_event_date(date)
            .unwrap()
            .and_time(parse_event_time(time).unwrap())
    }

    #[test]
    fn test_delay_before_notify_window() {
        let delay = compute_delay_str("2025-03-10", "09:00", 30, at("2025-03-10", "08:00")).unwrap();
        assert_eq!(delay, Delay::Wait(Duration::minutes(30)));
    }

    #[test]
    fn test_late_after_notify_window() {
        let delay = compute_delay_str("2025-03-10", "09:00", 30, at("2025-03-10", "08:45")).unwrap();
        assert_eq!(delay, Delay::Late);
    }

    #[test]
    fn test_exactly_at_notify_instant_is_late() {
        let delay = compute_delay_str("2025-03-10", "09:00", 30, at("2025-03-10", "08:30")).unwrap();
        assert_eq!(delay, Delay::Late);
    }

    #[test]
    fn test_one_second_before_notify_instant_waits() {
        let now = at("2025-03-10", "08:29:59");
        let delay = compute_delay_str("2025-03-10", "09:00", 30, now).unwrap();
        assert_eq!(delay, Delay::Wait(Duration::seconds(1)));
    }

    #[test]
    fn test_zero_lead_fires_at_event_start() {
        let delay = compute_delay_str("2025-03-11", "00:00", 0, at("2025-03-10", "23:00")).unwrap();
        assert_eq!(delay.wait(), Some(Duration::hours(1)));
    }

    #[test]
    fn test_lead_crossing_midnight() {
        let delay = compute_delay_str("2025-03-11", "00:10", 30, at("2025-03-10", "23:00")).unwrap();
        assert_eq!(delay.wait(), Some(Duration::minutes(40)));
    }

    #[test]
    fn test_result_is_positive_difference_for_many_inputs() {
        let now = at("2025-01-01", "12:00");
        for days in 0..5i64 {
            for lead in [0u32, 1, 15, 30, 90, 1440] {
                let date = now.date() + Duration::days(days);
                let time = NaiveTime::from_hms_opt(18, 30, 0).unwrap();
                let expected = date.and_time(time) - Duration::minutes(i64::from(lead)) - now;
                let delay = compute_delay(date, time, lead, now);
                if expected > Duration::zero() {
                    assert_eq!(delay, Delay::Wait(expected));
                } else {
                    assert_eq!(delay, Delay::Late);
                }
            }
        }
    }

    #[test]
    fn test_same_inputs_same_result() {
        let now = at("2025-03-10", "08:00");
        let first = compute_delay_str("2025-03-10", "09:00", 30, now).unwrap();
        let second = compute_delay_str("2025-03-10", "09:00", 30, now).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_inputs_are_rejected() {
        let now = at("2025-03-10", "08:00");
        for (date, time) in [
            ("2025/03/10", "09:00"),
            ("2025-3-10", "09:00"),
            ("2025-02-30", "09:00"),
            ("2025-03-10", "9am"),
            ("2025-03-10", "25:00"),
            ("", ""),
        ] {
            assert!(
                matches!(
                    compute_delay_str(date, time, 30, now),
                    Err(ScheduleError::InvalidSchedule(_))
                ),
                "{date} {time} should be rejected"
            );
        }
    }

    #[test]
    fn test_seconds_are_accepted_in_time() {
        assert_eq!(
            parse_event_time("09:00:30").unwrap(),
            NaiveTime::from_hms_opt(9, 0, 30).unwrap()
        );
    }
}
