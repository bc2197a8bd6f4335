pub mod config;
pub mod logging;
pub mod observability;
pub mod repositories;
pub mod state;
