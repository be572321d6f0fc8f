//! `rollcall` - Volunteer check-in and check-out for church ministries
//!
//! This library tracks which volunteer is serving, which materials (badges,
//! radios, keys, equipment) they borrowed, and in what condition each item
//! came back. Check-in and check-out are atomic over the volunteer, the
//! materials, and the activity history.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod activities;
pub mod app;
pub mod checkin;
pub mod checkout;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod materials;
pub mod model;
pub mod store;
pub mod text;
pub mod validation;
pub mod volunteers;

pub use app::Rollcall;
pub use config::Config;
pub use dashboard::DashboardMetrics;
pub use error::{Error, ErrorKind, Result};
pub use logging::init_logging;
pub use store::{Store, StoreStats};
