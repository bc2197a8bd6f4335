use std::sync::Arc;
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::schedule::ScheduleStore;

pub const MINUTES_PER_DAY: u16 = 1440;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayOfWeekParseError {
    Unknown,
}

impl DayOfWeek {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = DayOfWeekParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "monday" => Ok(Self::Monday),
            "tuesday" => Ok(Self::Tuesday),
            "wednesday" => Ok(Self::Wednesday),
            "thursday" => Ok(Self::Thursday),
            "friday" => Ok(Self::Friday),
            "saturday" => Ok(Self::Saturday),
            "sunday" => Ok(Self::Sunday),
            _ => Err(DayOfWeekParseError::Unknown),
        }
    }
}

impl From<time::Weekday> for DayOfWeek {
    fn from(weekday: time::Weekday) -> Self {
        match weekday {
            time::Weekday::Monday => Self::Monday,
            time::Weekday::Tuesday => Self::Tuesday,
            time::Weekday::Wednesday => Self::Wednesday,
            time::Weekday::Thursday => Self::Thursday,
            time::Weekday::Friday => Self::Friday,
            time::Weekday::Saturday => Self::Saturday,
            time::Weekday::Sunday => Self::Sunday,
        }
    }
}

/// One row of a professional's recurring weekly template. Minute bounds are
/// minutes since local midnight, half-open: `[start_minute, end_minute)`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleInterval {
    pub professional_id: String,
    pub day_of_week: DayOfWeek,
    pub start_minute: u16,
    pub end_minute: u16,
    pub is_available: bool,
}

impl ScheduleInterval {
    pub fn duration_minutes(&self) -> u16 {
        self.end_minute.saturating_sub(self.start_minute)
    }
}

#[derive(Clone)]
pub struct ScheduleService {
    schedules: Arc<dyn ScheduleStore>,
}

impl ScheduleService {
    pub fn new(schedules: Arc<dyn ScheduleStore>) -> Self {
        Self { schedules }
    }

    /// Replaces the professional's whole weekly template. There are no
    /// partial edits: the submitted rows become the template, previous rows
    /// are discarded.
    pub async fn replace_weekly_template(
        &self,
        professional_id: &str,
        mut intervals: Vec<ScheduleInterval>,
    ) -> DomainResult<Vec<ScheduleInterval>> {
        let professional_id = validate_professional_id(professional_id)?;
        for interval in &intervals {
            validate_interval(professional_id, interval)?;
        }
        sort_template(&mut intervals);
        self.schedules
            .replace_for_professional(professional_id, &intervals)
            .await?;
        Ok(intervals)
    }

    pub async fn weekly_template(
        &self,
        professional_id: &str,
    ) -> DomainResult<Vec<ScheduleInterval>> {
        let professional_id = validate_professional_id(professional_id)?;
        let mut intervals = self.schedules.list_by_professional(professional_id).await?;
        sort_template(&mut intervals);
        Ok(intervals)
    }
}

fn sort_template(intervals: &mut [ScheduleInterval]) {
    intervals.sort_by(|left, right| {
        left.day_of_week
            .cmp(&right.day_of_week)
            .then_with(|| left.start_minute.cmp(&right.start_minute))
    });
}

fn validate_professional_id(professional_id: &str) -> DomainResult<&str> {
    let trimmed = professional_id.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidRequest(
            "professional_id is required".into(),
        ));
    }
    Ok(trimmed)
}

fn validate_interval(professional_id: &str, interval: &ScheduleInterval) -> DomainResult<()> {
    if interval.professional_id != professional_id {
        return Err(DomainError::Mismatch(
            "interval professional does not match template owner".into(),
        ));
    }
    if interval.start_minute >= interval.end_minute {
        return Err(DomainError::InvalidRequest(
            "start_minute must be before end_minute".into(),
        ));
    }
    if interval.end_minute >= MINUTES_PER_DAY {
        return Err(DomainError::InvalidRequest(
            "end_minute must fall within the day".into(),
        ));
    }
    Ok(())
}
