use crate::utils::error::{BookingError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// First bookable hour of the day.
pub const OPENING_HOUR: u8 = 7;
/// First hour past the bookable window.
pub const CLOSING_HOUR: u8 = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "monday" => Ok(Weekday::Monday),
            "tuesday" => Ok(Weekday::Tuesday),
            "wednesday" => Ok(Weekday::Wednesday),
            "thursday" => Ok(Weekday::Thursday),
            "friday" => Ok(Weekday::Friday),
            "saturday" => Ok(Weekday::Saturday),
            "sunday" => Ok(Weekday::Sunday),
            other => Err(BookingError::InvalidSlot {
                reason: format!("Unknown weekday: {}", other),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated booking window: day, starting hour and contiguous span.
///
/// This is the only place day/hour encoding is validated; everything that
/// touches the grid goes through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    day: Weekday,
    hour: u8,
    span_hours: u8,
}

impl Slot {
    pub fn new(day: Weekday, hour: u8, span_hours: u8) -> Result<Self> {
        if hour < OPENING_HOUR || hour >= CLOSING_HOUR {
            return Err(BookingError::InvalidSlot {
                reason: format!(
                    "Hour {} outside operating window {}-{}",
                    hour, OPENING_HOUR, CLOSING_HOUR
                ),
            });
        }
        if span_hours == 0 {
            return Err(BookingError::InvalidSlot {
                reason: "Span must cover at least one hour".to_string(),
            });
        }
        if hour as u16 + span_hours as u16 > CLOSING_HOUR as u16 {
            return Err(BookingError::InvalidSlot {
                reason: format!(
                    "Slot {}+{}h runs past closing hour {}",
                    hour, span_hours, CLOSING_HOUR
                ),
            });
        }
        Ok(Self {
            day,
            hour,
            span_hours,
        })
    }

    pub fn single(day: Weekday, hour: u8) -> Result<Self> {
        Self::new(day, hour, 1)
    }

    pub fn day(&self) -> Weekday {
        self.day
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn span_hours(&self) -> u8 {
        self.span_hours
    }

    /// Every hour index this slot covers, in order.
    pub fn hours(&self) -> impl Iterator<Item = u8> {
        self.hour..self.hour + self.span_hours
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.span_hours == 1 {
            write!(f, "{} {:02}:00", self.day, self.hour)
        } else {
            write!(
                f,
                "{} {:02}:00-{:02}:00",
                self.day,
                self.hour,
                self.hour + self.span_hours
            )
        }
    }
}
