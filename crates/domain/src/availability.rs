use std::collections::HashMap;
use std::sync::Arc;

use time::{Date, Duration, PrimitiveDateTime, Time};

use crate::DomainResult;
use crate::catalog::{self, ServiceAssignment, VisitStep};
use crate::clock::Clock;
use crate::conflict;
use crate::ports::appointments::AppointmentStore;
use crate::ports::catalog::ServiceCatalog;
use crate::ports::schedule::ScheduleStore;
use crate::schedule::{DayOfWeek, ScheduleInterval};
use crate::util::format_minute_of_day;

/// Candidate starts land on a fixed quarter-hour grid, plus one final
/// squeeze-in start flush against the end of the window.
pub const SLOT_STEP_MINUTES: u16 = 15;
pub const DEFAULT_HORIZON_DAYS: u16 = 14;
pub const MAX_HORIZON_DAYS: u16 = 30;

#[derive(Clone)]
pub struct AvailabilityService {
    schedules: Arc<dyn ScheduleStore>,
    appointments: Arc<dyn AppointmentStore>,
    catalog: Arc<dyn ServiceCatalog>,
    clock: Arc<dyn Clock>,
}

impl AvailabilityService {
    pub fn new(
        schedules: Arc<dyn ScheduleStore>,
        appointments: Arc<dyn AppointmentStore>,
        catalog: Arc<dyn ServiceCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            schedules,
            appointments,
            catalog,
            clock,
        }
    }

    /// Start times (`HH:mm`, facility-local) at which the whole visit fits
    /// on the given date. Past dates yield nothing; on the current date,
    /// starts that have already passed are dropped.
    pub async fn compute_day_slots(
        &self,
        assignments: &[ServiceAssignment],
        date: Date,
    ) -> DomainResult<Vec<String>> {
        let steps = catalog::resolve_visit_steps(self.catalog.as_ref(), assignments).await?;
        let now = self.clock.now();
        if date < now.date() {
            return Ok(Vec::new());
        }
        let minutes = self.day_slot_minutes(&steps, date, now).await?;
        Ok(minutes.into_iter().map(format_minute_of_day).collect())
    }

    /// Dates from `start_date` with at least one bookable start inside the
    /// horizon; a start before today is pulled up to today. The per-day scan
    /// stops at the first hit; days without a matching weekday window are
    /// skipped before any appointment lookup.
    pub async fn compute_available_dates(
        &self,
        assignments: &[ServiceAssignment],
        start_date: Date,
        horizon_days: Option<u16>,
    ) -> DomainResult<Vec<Date>> {
        let steps = catalog::resolve_visit_steps(self.catalog.as_ref(), assignments).await?;
        let horizon = horizon_days
            .unwrap_or(DEFAULT_HORIZON_DAYS)
            .clamp(1, MAX_HORIZON_DAYS);
        let professionals = distinct_professionals(&steps);
        let templates = self.fetch_templates(&professionals).await?;
        let total_minutes = total_duration(&steps);
        let now = self.clock.now();
        let first_day = start_date.max(now.date());

        let mut dates = Vec::new();
        for day_index in 0..horizon {
            let Some(date) = first_day.checked_add(Duration::days(i64::from(day_index))) else {
                break;
            };
            let Some(window) = day_window(&templates, &professionals, date.weekday().into()) else {
                continue;
            };
            let mut candidates = grid_candidates(&window, total_minutes);
            if date == now.date() {
                retain_future_starts(&mut candidates, date, now);
            }
            if candidates.is_empty() {
                continue;
            }
            let busy = self.fetch_busy(&professionals, date).await?;
            let day_start = PrimitiveDateTime::new(date, Time::MIDNIGHT);
            if candidates
                .iter()
                .any(|&minute| candidate_fits(&steps, &busy, day_start, minute))
            {
                dates.push(date);
            }
        }
        Ok(dates)
    }

    async fn day_slot_minutes(
        &self,
        steps: &[VisitStep],
        date: Date,
        now: PrimitiveDateTime,
    ) -> DomainResult<Vec<u16>> {
        let professionals = distinct_professionals(steps);
        let templates = self.fetch_templates(&professionals).await?;
        let Some(window) = day_window(&templates, &professionals, date.weekday().into()) else {
            return Ok(Vec::new());
        };
        let mut candidates = grid_candidates(&window, total_duration(steps));
        if date == now.date() {
            retain_future_starts(&mut candidates, date, now);
        }
        if candidates.is_empty() {
            return Ok(candidates);
        }
        let busy = self.fetch_busy(&professionals, date).await?;
        let day_start = PrimitiveDateTime::new(date, Time::MIDNIGHT);
        candidates.retain(|&minute| candidate_fits(steps, &busy, day_start, minute));
        Ok(candidates)
    }

    async fn fetch_templates(
        &self,
        professionals: &[String],
    ) -> DomainResult<HashMap<String, Vec<ScheduleInterval>>> {
        let mut templates = HashMap::new();
        for professional_id in professionals {
            let intervals = self.schedules.list_by_professional(professional_id).await?;
            templates.insert(professional_id.clone(), intervals);
        }
        Ok(templates)
    }

    async fn fetch_busy(
        &self,
        professionals: &[String],
        date: Date,
    ) -> DomainResult<HashMap<String, Vec<(PrimitiveDateTime, PrimitiveDateTime)>>> {
        let day_start = PrimitiveDateTime::new(date, Time::MIDNIGHT);
        let day_end = day_start
            .checked_add(Duration::days(1))
            .unwrap_or(PrimitiveDateTime::MAX);
        let mut busy = HashMap::new();
        for professional_id in professionals {
            let appointments = self
                .appointments
                .find_scheduled_between(professional_id, day_start, day_end)
                .await?;
            busy.insert(
                professional_id.clone(),
                appointments
                    .iter()
                    .map(|appointment| (appointment.scheduled_at, appointment.ends_at()))
                    .collect(),
            );
        }
        Ok(busy)
    }
}

struct DayWindow {
    start: u16,
    end: u16,
}

/// The shared window for a visit: each professional contributes their
/// earliest available interval on the weekday, and the windows are
/// intersected (`[max(starts), min(ends)]`). Later intervals of a split day
/// are deliberately ignored, matching how bookings validate against single
/// intervals.
fn day_window(
    templates: &HashMap<String, Vec<ScheduleInterval>>,
    professionals: &[String],
    day: DayOfWeek,
) -> Option<DayWindow> {
    let mut window: Option<DayWindow> = None;
    for professional_id in professionals {
        let earliest = templates
            .get(professional_id)?
            .iter()
            .filter(|row| row.day_of_week == day && row.is_available)
            .min_by_key(|row| row.start_minute)?;
        window = Some(match window {
            None => DayWindow {
                start: earliest.start_minute,
                end: earliest.end_minute,
            },
            Some(current) => DayWindow {
                start: current.start.max(earliest.start_minute),
                end: current.end.min(earliest.end_minute),
            },
        });
    }
    window.filter(|window| window.start < window.end)
}

/// Grid starts from the window start, plus the last start that still fits
/// flush against the window end, even when it falls off the grid. Empty when
/// the visit does not fit the window at all.
fn grid_candidates(window: &DayWindow, total_minutes: u32) -> Vec<u16> {
    let Some(last_start) = u32::from(window.end)
        .checked_sub(total_minutes)
        .map(|minute| minute as u16)
        .filter(|minute| *minute >= window.start)
    else {
        return Vec::new();
    };
    let mut candidates = Vec::new();
    let mut cursor = window.start;
    while cursor < last_start {
        candidates.push(cursor);
        match cursor.checked_add(SLOT_STEP_MINUTES) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    candidates.push(last_start);
    candidates
}

fn retain_future_starts(candidates: &mut Vec<u16>, date: Date, now: PrimitiveDateTime) {
    let day_start = PrimitiveDateTime::new(date, Time::MIDNIGHT);
    candidates.retain(|&minute| day_start + Duration::minutes(i64::from(minute)) >= now);
}

fn candidate_fits(
    steps: &[VisitStep],
    busy: &HashMap<String, Vec<(PrimitiveDateTime, PrimitiveDateTime)>>,
    day_start: PrimitiveDateTime,
    start_minute: u16,
) -> bool {
    let mut offset = u32::from(start_minute);
    for step in steps {
        let segment_start = day_start + Duration::minutes(i64::from(offset));
        let segment_end =
            segment_start + Duration::minutes(i64::from(step.service.duration_minutes));
        if let Some(taken) = busy.get(&step.professional_id) {
            if taken.iter().any(|&(busy_start, busy_end)| {
                conflict::overlaps(segment_start, segment_end, busy_start, busy_end)
            }) {
                return false;
            }
        }
        offset += step.service.duration_minutes;
    }
    true
}

fn distinct_professionals(steps: &[VisitStep]) -> Vec<String> {
    let mut professionals: Vec<String> = Vec::new();
    for step in steps {
        if !professionals
            .iter()
            .any(|known| known == &step.professional_id)
        {
            professionals.push(step.professional_id.clone());
        }
    }
    professionals
}

fn total_duration(steps: &[VisitStep]) -> u32 {
    steps
        .iter()
        .map(|step| step.service.duration_minutes)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointments::{Appointment, AppointmentStatus};
    use crate::catalog::Service;
    use crate::clock::FixedClock;
    use crate::credits::CreditSpend;
    use crate::error::DomainError;
    use crate::ports::BoxFuture;
    use crate::util::uuid_v7_without_dashes;
    use time::macros::{date, datetime};
    use tokio::sync::RwLock;

    struct MockScheduleStore {
        templates: HashMap<String, Vec<ScheduleInterval>>,
    }

    impl ScheduleStore for MockScheduleStore {
        fn list_by_professional(
            &self,
            professional_id: &str,
        ) -> BoxFuture<'_, DomainResult<Vec<ScheduleInterval>>> {
            let professional_id = professional_id.to_string();
            Box::pin(async move {
                Ok(self
                    .templates
                    .get(&professional_id)
                    .cloned()
                    .unwrap_or_default())
            })
        }

        fn replace_for_professional(
            &self,
            _professional_id: &str,
            _intervals: &[ScheduleInterval],
        ) -> BoxFuture<'_, DomainResult<()>> {
            Box::pin(async move { Ok(()) })
        }
    }

    struct MockAppointmentStore {
        items: RwLock<Vec<Appointment>>,
    }

    impl AppointmentStore for MockAppointmentStore {
        fn find_by_id(
            &self,
            appointment_id: &str,
        ) -> BoxFuture<'_, DomainResult<Option<Appointment>>> {
            let appointment_id = appointment_id.to_string();
            Box::pin(async move {
                let items = self.items.read().await;
                Ok(items
                    .iter()
                    .find(|item| item.appointment_id == appointment_id)
                    .cloned())
            })
        }

        fn find_scheduled_between(
            &self,
            professional_id: &str,
            from: PrimitiveDateTime,
            to: PrimitiveDateTime,
        ) -> BoxFuture<'_, DomainResult<Vec<Appointment>>> {
            let professional_id = professional_id.to_string();
            Box::pin(async move {
                let items = self.items.read().await;
                Ok(items
                    .iter()
                    .filter(|item| {
                        item.professional_id == professional_id
                            && item.status.is_blocking()
                            && item.scheduled_at >= from
                            && item.scheduled_at < to
                    })
                    .cloned()
                    .collect())
            })
        }

        fn save(&self, appointment: &Appointment) -> BoxFuture<'_, DomainResult<Appointment>> {
            let appointment = appointment.clone();
            Box::pin(async move {
                self.items.write().await.push(appointment.clone());
                Ok(appointment)
            })
        }

        fn save_chain(
            &self,
            appointments: &[Appointment],
            _credit_spend: Option<&CreditSpend>,
        ) -> BoxFuture<'_, DomainResult<Vec<Appointment>>> {
            let appointments = appointments.to_vec();
            Box::pin(async move {
                self.items.write().await.extend(appointments.clone());
                Ok(appointments)
            })
        }

        fn update_status(
            &self,
            _appointment_id: &str,
            _from: AppointmentStatus,
            _to: AppointmentStatus,
        ) -> BoxFuture<'_, DomainResult<Appointment>> {
            Box::pin(async move { Err(DomainError::NotFound("appointment")) })
        }
    }

    struct MockCatalog {
        services: HashMap<String, Service>,
    }

    impl ServiceCatalog for MockCatalog {
        fn find_service(
            &self,
            service_id: &str,
        ) -> BoxFuture<'_, DomainResult<Option<Service>>> {
            let service_id = service_id.to_string();
            Box::pin(async move { Ok(self.services.get(&service_id).cloned()) })
        }
    }

    fn interval(
        professional_id: &str,
        day: DayOfWeek,
        start_minute: u16,
        end_minute: u16,
    ) -> ScheduleInterval {
        ScheduleInterval {
            professional_id: professional_id.to_string(),
            day_of_week: day,
            start_minute,
            end_minute,
            is_available: true,
        }
    }

    fn service(service_id: &str, professional_id: &str, duration_minutes: u32) -> Service {
        Service::new(service_id, professional_id, "est-1", service_id, 5_000, duration_minutes)
            .expect("service")
    }

    fn booked(professional_id: &str, at: PrimitiveDateTime, duration_minutes: u32) -> Appointment {
        Appointment {
            appointment_id: uuid_v7_without_dashes(),
            request_id: uuid_v7_without_dashes(),
            user_id: "user-1".to_string(),
            establishment_id: "est-1".to_string(),
            professional_id: professional_id.to_string(),
            service_id: "svc".to_string(),
            service_name: "svc".to_string(),
            scheduled_at: at,
            duration_minutes,
            price_cents: 5_000,
            status: AppointmentStatus::Scheduled,
            created_at_ms: 0,
        }
    }

    fn engine(
        templates: Vec<ScheduleInterval>,
        services: Vec<Service>,
        appointments: Vec<Appointment>,
        now: PrimitiveDateTime,
    ) -> AvailabilityService {
        let mut by_professional: HashMap<String, Vec<ScheduleInterval>> = HashMap::new();
        for row in templates {
            by_professional
                .entry(row.professional_id.clone())
                .or_default()
                .push(row);
        }
        let store = MockAppointmentStore {
            items: RwLock::new(appointments),
        };
        AvailabilityService::new(
            Arc::new(MockScheduleStore {
                templates: by_professional,
            }),
            Arc::new(store),
            Arc::new(MockCatalog {
                services: services
                    .into_iter()
                    .map(|service| (service.service_id.clone(), service))
                    .collect(),
            }),
            Arc::new(FixedClock::new(now)),
        )
    }

    fn one_service(service_id: &str) -> Vec<ServiceAssignment> {
        vec![ServiceAssignment {
            service_id: service_id.to_string(),
            professional_id: None,
        }]
    }

    // 2026-03-02 is a Monday.
    const NOW: PrimitiveDateTime = datetime!(2026-03-01 08:00);

    #[tokio::test]
    async fn slots_follow_the_grid_with_a_final_squeeze_in() {
        let engine = engine(
            vec![interval("prof-a", DayOfWeek::Monday, 540, 600)],
            vec![service("svc-20", "prof-a", 20)],
            vec![],
            NOW,
        );

        let slots = engine
            .compute_day_slots(&one_service("svc-20"), date!(2026 - 03 - 02))
            .await
            .expect("slots");
        assert_eq!(slots, vec!["09:00", "09:15", "09:30", "09:40"]);
    }

    #[tokio::test]
    async fn squeeze_in_is_not_duplicated_when_on_grid() {
        let engine = engine(
            vec![interval("prof-a", DayOfWeek::Monday, 540, 600)],
            vec![service("svc-30", "prof-a", 30)],
            vec![],
            NOW,
        );

        let slots = engine
            .compute_day_slots(&one_service("svc-30"), date!(2026 - 03 - 02))
            .await
            .expect("slots");
        assert_eq!(slots, vec!["09:00", "09:15", "09:30"]);
    }

    #[tokio::test]
    async fn exact_fit_window_yields_one_slot() {
        let engine = engine(
            vec![interval("prof-a", DayOfWeek::Monday, 540, 600)],
            vec![service("svc-60", "prof-a", 60)],
            vec![],
            NOW,
        );

        let slots = engine
            .compute_day_slots(&one_service("svc-60"), date!(2026 - 03 - 02))
            .await
            .expect("slots");
        assert_eq!(slots, vec!["09:00"]);
    }

    #[tokio::test]
    async fn oversized_visit_yields_no_slots() {
        let engine = engine(
            vec![interval("prof-a", DayOfWeek::Monday, 540, 600)],
            vec![service("svc-90", "prof-a", 90)],
            vec![],
            NOW,
        );

        let slots = engine
            .compute_day_slots(&one_service("svc-90"), date!(2026 - 03 - 02))
            .await
            .expect("slots");
        assert!(slots.is_empty());
    }

    #[tokio::test]
    async fn booked_time_removes_overlapping_starts() {
        let engine = engine(
            vec![interval("prof-a", DayOfWeek::Monday, 540, 720)],
            vec![service("svc-60", "prof-a", 60)],
            vec![booked("prof-a", datetime!(2026-03-02 10:00), 60)],
            NOW,
        );

        let slots = engine
            .compute_day_slots(&one_service("svc-60"), date!(2026 - 03 - 02))
            .await
            .expect("slots");
        // Starts from 09:15 through 10:45 collide with the 10:00 booking.
        assert_eq!(slots, vec!["09:00", "11:00"]);
    }

    #[tokio::test]
    async fn past_dates_and_elapsed_starts_are_dropped() {
        let engine = engine(
            vec![interval("prof-a", DayOfWeek::Sunday, 540, 720)],
            vec![service("svc-60", "prof-a", 60)],
            vec![],
            datetime!(2026-03-01 09:20),
        );

        let yesterday = engine
            .compute_day_slots(&one_service("svc-60"), date!(2026 - 02 - 28))
            .await
            .expect("past");
        assert!(yesterday.is_empty());

        // 2026-03-01 is a Sunday; 09:00 and 09:15 already passed.
        let today = engine
            .compute_day_slots(&one_service("svc-60"), date!(2026 - 03 - 01))
            .await
            .expect("today");
        assert_eq!(today, vec!["09:30", "09:45", "10:00", "10:15", "10:30", "10:45", "11:00"]);
    }

    #[tokio::test]
    async fn chained_visit_intersects_professional_windows() {
        let engine = engine(
            vec![
                interval("prof-a", DayOfWeek::Monday, 540, 660),
                interval("prof-b", DayOfWeek::Monday, 600, 720),
            ],
            vec![service("svc-a", "prof-a", 30), service("svc-b", "prof-b", 30)],
            vec![],
            NOW,
        );

        let slots = engine
            .compute_day_slots(
                &[
                    ServiceAssignment {
                        service_id: "svc-a".to_string(),
                        professional_id: None,
                    },
                    ServiceAssignment {
                        service_id: "svc-b".to_string(),
                        professional_id: None,
                    },
                ],
                date!(2026 - 03 - 02),
            )
            .await
            .expect("slots");
        // Shared window is 10:00-11:00 and the visit needs 60 minutes.
        assert_eq!(slots, vec!["10:00"]);
    }

    #[tokio::test]
    async fn chained_visit_respects_each_professionals_bookings() {
        let engine = engine(
            vec![
                interval("prof-a", DayOfWeek::Monday, 540, 720),
                interval("prof-b", DayOfWeek::Monday, 540, 720),
            ],
            vec![service("svc-a", "prof-a", 30), service("svc-b", "prof-b", 30)],
            vec![booked("prof-b", datetime!(2026-03-02 09:30), 30)],
            NOW,
        );

        let slots = engine
            .compute_day_slots(
                &[
                    ServiceAssignment {
                        service_id: "svc-a".to_string(),
                        professional_id: None,
                    },
                    ServiceAssignment {
                        service_id: "svc-b".to_string(),
                        professional_id: None,
                    },
                ],
                date!(2026 - 03 - 02),
            )
            .await
            .expect("slots");
        // A 09:00 or 09:15 start puts prof-b's half inside their 09:30 booking.
        assert!(!slots.contains(&"09:00".to_string()));
        assert!(!slots.contains(&"09:15".to_string()));
        assert!(slots.contains(&"09:30".to_string()));
    }

    #[tokio::test]
    async fn split_day_uses_only_the_earliest_interval() {
        let engine = engine(
            vec![
                interval("prof-a", DayOfWeek::Monday, 540, 600),
                interval("prof-a", DayOfWeek::Monday, 780, 840),
            ],
            vec![service("svc-30", "prof-a", 30)],
            vec![],
            NOW,
        );

        let slots = engine
            .compute_day_slots(&one_service("svc-30"), date!(2026 - 03 - 02))
            .await
            .expect("slots");
        assert_eq!(slots, vec!["09:00", "09:15", "09:30"]);
    }

    #[tokio::test]
    async fn unavailable_rows_are_ignored() {
        let mut blocked = interval("prof-a", DayOfWeek::Monday, 540, 720);
        blocked.is_available = false;
        let engine = engine(
            vec![blocked],
            vec![service("svc-30", "prof-a", 30)],
            vec![],
            NOW,
        );

        let slots = engine
            .compute_day_slots(&one_service("svc-30"), date!(2026 - 03 - 02))
            .await
            .expect("slots");
        assert!(slots.is_empty());
    }

    #[tokio::test]
    async fn date_scan_reports_matching_weekdays_only() {
        let engine = engine(
            vec![interval("prof-a", DayOfWeek::Wednesday, 540, 720)],
            vec![service("svc-30", "prof-a", 30)],
            vec![],
            NOW,
        );

        let dates = engine
            .compute_available_dates(&one_service("svc-30"), NOW.date(), Some(14))
            .await
            .expect("dates");
        assert_eq!(dates, vec![date!(2026 - 03 - 04), date!(2026 - 03 - 11)]);
    }

    #[tokio::test]
    async fn date_scan_can_anchor_in_the_future() {
        let engine = engine(
            vec![interval("prof-a", DayOfWeek::Wednesday, 540, 720)],
            vec![service("svc-30", "prof-a", 30)],
            vec![],
            NOW,
        );

        // Scanning a later week skips the Wednesdays before it.
        let ahead = engine
            .compute_available_dates(&one_service("svc-30"), date!(2026 - 03 - 09), Some(7))
            .await
            .expect("dates");
        assert_eq!(ahead, vec![date!(2026 - 03 - 11)]);

        // A start in the past is pulled up to today.
        let clamped = engine
            .compute_available_dates(&one_service("svc-30"), date!(2026 - 02 - 01), Some(14))
            .await
            .expect("dates");
        assert_eq!(clamped, vec![date!(2026 - 03 - 04), date!(2026 - 03 - 11)]);
    }

    #[tokio::test]
    async fn date_scan_clamps_the_horizon() {
        let every_day: Vec<ScheduleInterval> = [
            DayOfWeek::Monday,
            DayOfWeek::Tuesday,
            DayOfWeek::Wednesday,
            DayOfWeek::Thursday,
            DayOfWeek::Friday,
            DayOfWeek::Saturday,
            DayOfWeek::Sunday,
        ]
        .into_iter()
        .map(|day| interval("prof-a", day, 540, 720))
        .collect();
        let engine = engine(every_day, vec![service("svc-30", "prof-a", 30)], vec![], NOW);

        let wide = engine
            .compute_available_dates(&one_service("svc-30"), NOW.date(), Some(365))
            .await
            .expect("dates");
        assert_eq!(wide.len(), usize::from(MAX_HORIZON_DAYS));

        let narrow = engine
            .compute_available_dates(&one_service("svc-30"), NOW.date(), Some(0))
            .await
            .expect("dates");
        assert_eq!(narrow.len(), 1);

        // Anchored at the calendar ceiling the scan ends after one day.
        let edge = engine
            .compute_available_dates(&one_service("svc-30"), date!(9999 - 12 - 31), Some(14))
            .await
            .expect("dates");
        assert_eq!(edge, vec![date!(9999 - 12 - 31)]);
    }

    #[tokio::test]
    async fn fully_booked_day_is_not_reported() {
        let engine = engine(
            vec![interval("prof-a", DayOfWeek::Monday, 540, 600)],
            vec![service("svc-60", "prof-a", 60)],
            vec![booked("prof-a", datetime!(2026-03-02 09:00), 60)],
            NOW,
        );

        let dates = engine
            .compute_available_dates(&one_service("svc-60"), NOW.date(), Some(7))
            .await
            .expect("dates");
        assert!(dates.is_empty());
    }
}
