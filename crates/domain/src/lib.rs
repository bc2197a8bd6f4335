pub mod appointments;
pub mod availability;
pub mod booking;
pub mod catalog;
pub mod clock;
pub mod conflict;
pub mod credits;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod plans;
pub mod ports;
pub mod schedule;
pub mod util;

pub type DomainResult<T> = Result<T, error::DomainError>;
