//! CRM records as persisted by the data store

mod bordereau;
mod payment;
mod quote;

pub use bordereau::{Bordereau, BordereauSnapshot, BordereauSummary};
pub use payment::{
    InstallmentStatus, PaymentInstallment, PaymentMethod, PaymentSchedule, ScheduleStatus,
};
pub use quote::{Broker, Contract, ContractStatus, ProductType, Quote, QuoteStatus};
