use std::sync::Arc;

use slotline_domain::availability::AvailabilityService;
use slotline_domain::booking::BookingService;
use slotline_domain::catalog::CatalogService;
use slotline_domain::clock::{Clock, SystemClock};
use slotline_domain::lifecycle::LifecycleService;
use slotline_domain::plans::PlanService;
use slotline_domain::schedule::ScheduleService;

use crate::config::AppConfig;
use crate::observability::TracingEventSink;
use crate::repositories::{
    InMemoryBookingStore, InMemoryPaymentGateway, InMemoryScheduleStore, InMemoryServiceCatalog,
    InMemorySubscriptionStore, LoggingNotificationSender,
};

/// Concrete in-memory backends, kept alongside the services so embedders
/// and tests can seed catalogs, templates, subscriptions and credits.
#[derive(Clone)]
pub struct InMemoryStores {
    pub schedules: Arc<InMemoryScheduleStore>,
    pub bookings: Arc<InMemoryBookingStore>,
    pub catalog: Arc<InMemoryServiceCatalog>,
    pub subscriptions: Arc<InMemorySubscriptionStore>,
    pub payments: Arc<InMemoryPaymentGateway>,
}

/// The wired engine: every service sharing the same stores, clock and
/// event sink.
#[derive(Clone)]
pub struct CoreServices {
    pub config: AppConfig,
    pub schedules: ScheduleService,
    pub catalog: CatalogService,
    pub availability: AvailabilityService,
    pub booking: BookingService,
    pub lifecycle: LifecycleService,
    pub plans: PlanService,
    pub stores: InMemoryStores,
}

impl CoreServices {
    /// In-memory composition on the system clock, shifted to the facility's
    /// configured UTC offset.
    pub fn in_memory(config: AppConfig) -> Self {
        let clock = Arc::new(SystemClock::from_offset_minutes(
            config.facility_utc_offset_minutes,
        ));
        Self::in_memory_with_clock(config, clock)
    }

    pub fn in_memory_with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        let stores = InMemoryStores {
            schedules: Arc::new(InMemoryScheduleStore::new()),
            bookings: Arc::new(InMemoryBookingStore::new()),
            catalog: Arc::new(InMemoryServiceCatalog::new()),
            subscriptions: Arc::new(InMemorySubscriptionStore::new()),
            payments: Arc::new(InMemoryPaymentGateway::new()),
        };
        let events = Arc::new(TracingEventSink::new());
        let notifier = Arc::new(LoggingNotificationSender::new());
        let plans = PlanService::new(stores.subscriptions.clone(), clock.clone());
        let schedules = ScheduleService::new(stores.schedules.clone());
        let catalog = CatalogService::new(stores.catalog.clone());
        let availability = AvailabilityService::new(
            stores.schedules.clone(),
            stores.bookings.clone(),
            stores.catalog.clone(),
            clock.clone(),
        );
        let booking = BookingService::new(
            stores.schedules.clone(),
            stores.bookings.clone(),
            stores.catalog.clone(),
            stores.bookings.clone(),
            stores.payments.clone(),
            notifier,
            plans.clone(),
            clock.clone(),
            events.clone(),
        );
        let lifecycle =
            LifecycleService::new(stores.bookings.clone(), plans.clone(), clock, events);
        Self {
            config,
            schedules,
            catalog,
            availability,
            booking,
            lifecycle,
            plans,
            stores,
        }
    }
}
