//! Inbound event creation payload.

use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Request to create a new event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    /// Event name.
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: String,
    /// Venue.
    #[validate(length(max = 255, message = "venue must be at most 255 characters"))]
    pub venue: String,
    /// Duration in minutes. Accepts an integer or a numeric string.
    #[serde(deserialize_with = "lenient_int")]
    #[validate(range(min = 0, message = "duration must not be negative"))]
    pub duration: i32,
    /// Whether to send a reminder.
    pub should_notify: bool,
    /// Lead minutes; missing or zero falls back to the configured default.
    #[serde(default)]
    #[validate(range(max = 2147483647, message = "notifyBeforeMinutes is too large"))]
    pub notify_before_minutes: Option<u32>,
    /// `YYYY-MM-DD`.
    pub event_date: String,
    /// `HH:MM`.
    pub event_time: String,
}

impl CreateEventRequest {
    /// Effective lead time given the configured default.
    pub fn lead_minutes(&self, default_lead: u32) -> u32 {
        match self.notify_before_minutes {
            Some(lead) if lead > 0 => lead,
            _ if self.should_notify => default_lead,
            _ => 0,
        }
    }
}

/// Integer, float (truncated) or a string with a leading integer.
fn lenient_int<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Int(n) => n,
        Raw::Float(f) if f.is_finite() => f.trunc() as i64,
        Raw::Float(_) => return Err(serde::de::Error::custom("duration must be a number")),
        Raw::Text(s) => leading_int(&s)
            .ok_or_else(|| serde::de::Error::custom("duration must be a number"))?,
    };
    i32::try_from(value).map_err(|_| serde::de::Error::custom("duration is out of range"))
}

fn leading_int(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}
