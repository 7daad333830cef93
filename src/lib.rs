//! RCD CRM - back office for construction-insurance brokers
//!
//! This library provides:
//! - Premium calculation for RCD / dommages-ouvrage quotes
//! - Bordereau reports (legacy single sheet and v2 policies/receipts ZIP)
//! - Payment schedules and installment tracking
//! - An HTTP surface with role-gated routes, served from AWS Lambda

pub mod auth;
pub mod bordereau;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod money;
pub mod payments;
pub mod store;
pub mod tariff;

// Re-export commonly used types
pub use auth::{Access, Role, Session, SessionProvider, TokenSessions};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AppConfig;
pub use error::{CrmError, Result};
pub use http::App;
pub use store::{CrmData, CrmStore, MemoryStore};
pub use tariff::{calculate_premium, TariffInput, TariffResult};
