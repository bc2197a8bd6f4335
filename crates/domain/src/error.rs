use thiserror::Error;

use crate::appointments::AppointmentStatus;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("mismatch: {0}")]
    Mismatch(String),
    #[error("professional has no schedule for the requested day")]
    NoAvailability,
    #[error("requested time falls outside the professional's schedule")]
    OutsideSchedule,
    #[error("slot is already taken")]
    SlotTaken,
    #[error("appointment status {0} does not allow this transition")]
    InvalidTransition(AppointmentStatus),
    #[error("credit balance does not cover the booking")]
    InsufficientCredit,
    #[error("store failure: {0}")]
    Store(String),
}

impl DomainError {
    /// Stable label used by events and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::NotFound(_) => "not_found",
            Self::Mismatch(_) => "mismatch",
            Self::NoAvailability => "no_availability",
            Self::OutsideSchedule => "outside_schedule",
            Self::SlotTaken => "slot_taken",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::InsufficientCredit => "insufficient_credit",
            Self::Store(_) => "store",
        }
    }
}

#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);
