use serde::Deserialize;
use slotline_domain::availability::{DEFAULT_HORIZON_DAYS, MAX_HORIZON_DAYS};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_env: String,
    pub log_level: String,
    pub data_backend: String,
    /// Offset applied to UTC when the engine asks for facility-local time.
    pub facility_utc_offset_minutes: i16,
    pub availability_horizon_days: u16,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let cfg = config::Config::builder()
            .set_default("app_env", "development")?
            .set_default("log_level", "info")?
            .set_default("data_backend", "memory")?
            .set_default("facility_utc_offset_minutes", 0)?
            .set_default(
                "availability_horizon_days",
                i64::from(DEFAULT_HORIZON_DAYS),
            )?
            .add_source(config::Environment::default().separator("__"))
            .build()?;
        cfg.try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    /// Horizon for date scans, kept inside the engine's supported range.
    pub fn horizon_days(&self) -> u16 {
        self.availability_horizon_days.clamp(1, MAX_HORIZON_DAYS)
    }
}
