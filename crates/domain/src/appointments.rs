use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Duration, PrimitiveDateTime};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Cancelled,
    Completed,
    NoShow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentStatusParseError {
    Unknown,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::NoShow => "no_show",
        }
    }

    /// Whether an appointment in this status occupies its professional's
    /// time for conflict purposes.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Scheduled)
    }

    /// Transitions only leave `Scheduled`; terminal states never move again.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (
                AppointmentStatus::Scheduled,
                AppointmentStatus::Cancelled
                    | AppointmentStatus::Completed
                    | AppointmentStatus::NoShow,
            )
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentStatusParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "scheduled" => Ok(Self::Scheduled),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            "no_show" => Ok(Self::NoShow),
            _ => Err(AppointmentStatusParseError::Unknown),
        }
    }
}

/// A booked visit segment. Price, duration and service name are snapshots
/// taken at booking time. Appointments are never deleted; cancellation is a
/// status change.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub appointment_id: String,
    /// Originating request; every appointment of a chained booking shares it.
    pub request_id: String,
    pub user_id: String,
    pub establishment_id: String,
    pub professional_id: String,
    pub service_id: String,
    pub service_name: String,
    pub scheduled_at: PrimitiveDateTime,
    pub duration_minutes: u32,
    pub price_cents: i64,
    pub status: AppointmentStatus,
    pub created_at_ms: i64,
}

impl Appointment {
    /// End of the booked span, saturating at the last representable
    /// datetime. Booking validation refuses spans that would need to
    /// saturate, so stored appointments always carry their true end.
    pub fn ends_at(&self) -> PrimitiveDateTime {
        self.scheduled_at
            .checked_add(Duration::minutes(i64::from(self.duration_minutes)))
            .unwrap_or(PrimitiveDateTime::MAX)
    }

    pub fn summary(&self) -> AppointmentSummary {
        AppointmentSummary {
            appointment_id: self.appointment_id.clone(),
            user_id: self.user_id.clone(),
            professional_id: self.professional_id.clone(),
            service_name: self.service_name.clone(),
            scheduled_at: self.scheduled_at,
            duration_minutes: self.duration_minutes,
        }
    }
}

/// What a confirmation notification carries.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AppointmentSummary {
    pub appointment_id: String,
    pub user_id: String,
    pub professional_id: String,
    pub service_name: String,
    pub scheduled_at: PrimitiveDateTime,
    pub duration_minutes: u32,
}
