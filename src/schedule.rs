//! Booking rules for a single ground: opening hours, minimum duration, no
//! bookings in the past, and no two bookings sharing any minute. A booking may
//! run past midnight into the next day.

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::error::ApiError;

pub const MIN_BOOKING_HOURS: f64 = 1.0;
pub const MAX_BOOKING_HOURS: f64 = 24.0;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    #[error("Invalid time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("Booking duration must be at least 1 hour")]
    DurationTooShort,

    #[error("Booking duration cannot exceed 24 hours")]
    DurationTooLong,

    #[error("Booking date is not valid logically")]
    PastDate,

    #[error("Ground is closed on this time")]
    Closed,

    #[error("Ground is already booked during this time range")]
    Conflict,
}

impl From<ScheduleError> for ApiError {
    fn from(e: ScheduleError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

/// Wall-clock time of day, stored as minutes after midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClockTime(u32);

impl ClockTime {
    pub fn parse(raw: &str) -> Result<Self, ScheduleError> {
        let invalid = || ScheduleError::InvalidTime(raw.to_string());
        let (h, m) = raw.trim().split_once(':').ok_or_else(invalid)?;
        let hours: u32 = h.parse().map_err(|_| invalid())?;
        let minutes: u32 = m.parse().map_err(|_| invalid())?;
        if minutes > 59 || hours > 24 || (hours == 24 && minutes != 0) {
            return Err(invalid());
        }
        Ok(ClockTime(hours * 60 + minutes))
    }

    pub fn hour(self) -> u32 {
        self.0 / 60
    }

    pub fn minutes(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// Half-open interval `[start, end)` in minutes after midnight. `end` may pass
/// `MINUTES_PER_DAY` when the slot runs into the next day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: u32,
    pub end: u32,
}

impl TimeSlot {
    pub fn starting_at(start: ClockTime, duration_hours: f64) -> Self {
        let length = (duration_hours.clamp(0.0, MAX_BOOKING_HOURS) * 60.0).round() as u32;
        TimeSlot {
            start: start.minutes(),
            end: start.minutes().saturating_add(length),
        }
    }

    /// Moves a slot booked `days` away from the day being checked onto that
    /// day's clock. Returns `None` when nothing of it falls on or after midnight.
    pub fn relative_to_day(self, days: i64) -> Option<TimeSlot> {
        let offset = days * i64::from(MINUTES_PER_DAY);
        let end = i64::from(self.end) + offset;
        if end <= 0 {
            return None;
        }
        let start = (i64::from(self.start) + offset).max(0);
        Some(TimeSlot {
            start: u32::try_from(start).ok()?,
            end: u32::try_from(end).ok()?,
        })
    }

    pub fn between(start: ClockTime, end: ClockTime) -> Self {
        TimeSlot {
            start: start.minutes(),
            end: end.minutes().max(start.minutes()),
        }
    }

    /// Touching slots (one ends when the other starts) do not overlap.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && self.end > other.start
    }
}

pub fn validate_duration(hours: f64) -> Result<(), ScheduleError> {
    if !hours.is_finite() || hours < MIN_BOOKING_HOURS {
        return Err(ScheduleError::DurationTooShort);
    }
    if hours > MAX_BOOKING_HOURS {
        return Err(ScheduleError::DurationTooLong);
    }
    Ok(())
}

pub fn validate_not_past(date: NaiveDate, today: NaiveDate) -> Result<(), ScheduleError> {
    if date < today {
        return Err(ScheduleError::PastDate);
    }
    Ok(())
}

/// Only the starting hour is checked against the ground's hours. A closing
/// hour at or before the opening hour means the ground stays open past midnight.
pub fn check_opening_hours(start: ClockTime, open: ClockTime, close: ClockTime) -> Result<(), ScheduleError> {
    let hour = start.hour();
    let open_now = if close.hour() > open.hour() {
        hour >= open.hour() && hour < close.hour()
    } else {
        hour >= open.hour() || hour < close.hour()
    };
    if open_now {
        Ok(())
    } else {
        Err(ScheduleError::Closed)
    }
}

pub fn find_conflict<'a, I>(candidate: &TimeSlot, existing: I) -> Option<&'a TimeSlot>
where
    I: IntoIterator<Item = &'a TimeSlot>,
{
    existing.into_iter().find(|slot| candidate.overlaps(slot))
}

/// Everything the rules need to know about a requested booking.
#[derive(Debug, Clone)]
pub struct SlotRequest<'a> {
    pub date: NaiveDate,
    pub time: &'a str,
    pub duration_hours: f64,
}

/// Opening hours of the ground being booked.
#[derive(Debug, Clone, Copy)]
pub struct OpeningHours {
    pub open: ClockTime,
    pub close: ClockTime,
}

impl OpeningHours {
    pub fn parse(open: &str, close: &str) -> Result<Self, ScheduleError> {
        Ok(OpeningHours {
            open: ClockTime::parse(open)?,
            close: ClockTime::parse(close)?,
        })
    }
}

/// Runs every rule in order and returns the slot the booking would occupy.
pub fn validate_booking(
    request: &SlotRequest<'_>,
    today: NaiveDate,
    hours: OpeningHours,
    taken: &[TimeSlot],
) -> Result<TimeSlot, ScheduleError> {
    validate_duration(request.duration_hours)?;
    validate_not_past(request.date, today)?;
    let start = ClockTime::parse(request.time)?;
    check_opening_hours(start, hours.open, hours.close)?;

    let slot = TimeSlot::starting_at(start, request.duration_hours);
    if find_conflict(&slot, taken).is_some() {
        return Err(ScheduleError::Conflict);
    }
    Ok(slot)
}
