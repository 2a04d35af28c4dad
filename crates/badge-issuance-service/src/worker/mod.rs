//! 后台 Worker

pub mod expiration_monitor;
pub mod scheduler;

pub use expiration_monitor::{
    ALERT_THRESHOLDS, ExpirationCheck, ExpirationMonitor, alert_severity, days_remaining,
};
pub use scheduler::ExpirationScheduler;
