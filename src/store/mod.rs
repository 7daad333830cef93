//! Data-store seam
//!
//! Handlers talk to records exclusively through [`CrmStore`]. Every method is
//! one query or one committed update; there is no cross-call transaction.

mod memory;
#[cfg(test)]
pub(crate) mod fixtures;

pub use memory::{CrmData, MemoryStore};

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::model::{
    Bordereau, Broker, Contract, ContractStatus, InstallmentStatus, PaymentInstallment,
    PaymentSchedule, ProductType, Quote, QuoteStatus, ScheduleStatus,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    Missing(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Contract selection; `None` means "no constraint"
#[derive(Debug, Clone, Default)]
pub struct ContractFilter {
    /// Inclusive bounds on the contract start date
    pub start_from: Option<NaiveDate>,
    pub start_to: Option<NaiveDate>,
    pub broker_ids: Option<Vec<String>>,
    pub statuses: Option<Vec<ContractStatus>>,
    pub product_type: Option<ProductType>,
}

impl ContractFilter {
    pub fn matches(&self, contract: &Contract) -> bool {
        self.start_from.map_or(true, |from| contract.start_date >= from)
            && self.start_to.map_or(true, |to| contract.start_date <= to)
            && self
                .broker_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&contract.broker_id))
            && self
                .statuses
                .as_ref()
                .map_or(true, |statuses| statuses.contains(&contract.status))
            && self.product_type.map_or(true, |p| contract.product_type == p)
    }
}

#[derive(Debug, Clone, Default)]
pub struct QuoteFilter {
    /// Inclusive bounds on the creation date
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
    pub broker_ids: Option<Vec<String>>,
    pub statuses: Option<Vec<QuoteStatus>>,
    pub product_type: Option<ProductType>,
}

impl QuoteFilter {
    pub fn matches(&self, quote: &Quote) -> bool {
        let created = quote.created_at.date_naive();
        self.created_from.map_or(true, |from| created >= from)
            && self.created_to.map_or(true, |to| created <= to)
            && self
                .broker_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&quote.broker_id))
            && self
                .statuses
                .as_ref()
                .map_or(true, |statuses| statuses.contains(&quote.status))
            && self.product_type.map_or(true, |p| quote.product_type == p)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstallmentFilter {
    pub schedule_ids: Option<Vec<String>>,
    /// Inclusive bounds on the due date
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
    pub statuses: Option<Vec<InstallmentStatus>>,
}

impl InstallmentFilter {
    pub fn matches(&self, installment: &PaymentInstallment) -> bool {
        self.schedule_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(&installment.schedule_id))
            && self.due_from.map_or(true, |from| installment.due_date >= from)
            && self.due_to.map_or(true, |to| installment.due_date <= to)
            && self
                .statuses
                .as_ref()
                .map_or(true, |statuses| statuses.contains(&installment.status))
    }
}

/// Typed record access with relational lookups
pub trait CrmStore: Send + Sync {
    fn broker(&self, id: &str) -> StoreResult<Option<Broker>>;
    fn brokers(&self) -> StoreResult<Vec<Broker>>;

    fn quote(&self, id: &str) -> StoreResult<Option<Quote>>;
    fn quotes(&self, filter: &QuoteFilter) -> StoreResult<Vec<Quote>>;
    fn update_quote(&self, quote: &Quote) -> StoreResult<()>;

    fn contracts(&self, filter: &ContractFilter) -> StoreResult<Vec<Contract>>;
    fn contract_for_quote(&self, quote_id: &str) -> StoreResult<Option<Contract>>;

    fn schedule(&self, id: &str) -> StoreResult<Option<PaymentSchedule>>;
    fn schedules(&self) -> StoreResult<Vec<PaymentSchedule>>;
    fn schedule_for_quote(&self, quote_id: &str) -> StoreResult<Option<PaymentSchedule>>;
    /// Insert a schedule together with its installments
    fn insert_schedule(
        &self,
        schedule: &PaymentSchedule,
        installments: &[PaymentInstallment],
    ) -> StoreResult<()>;
    fn update_schedule_status(
        &self,
        id: &str,
        status: ScheduleStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    fn installment(&self, id: &str) -> StoreResult<Option<PaymentInstallment>>;
    /// Ordered by schedule, then installment number
    fn installments(&self, filter: &InstallmentFilter) -> StoreResult<Vec<PaymentInstallment>>;
    fn update_installment(&self, installment: &PaymentInstallment) -> StoreResult<()>;
    /// Write one installment and set its schedule's status in a single commit
    fn update_installment_with_schedule(
        &self,
        installment: &PaymentInstallment,
        status: ScheduleStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()>;
    /// Write only the two amount fields of one installment
    fn update_installment_amounts(&self, id: &str, amount_ht: f64, amount_ttc: f64) -> StoreResult<()>;

    fn insert_bordereau(&self, bordereau: &Bordereau) -> StoreResult<()>;
    fn bordereau(&self, id: &str) -> StoreResult<Option<Bordereau>>;
    /// Newest generation first; `skip` and `take` must be non-negative
    fn bordereaux(&self, skip: i64, take: i64) -> StoreResult<Vec<Bordereau>>;
    fn count_bordereaux(&self) -> StoreResult<usize>;
}
