//! Payment schedules and their installments

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Status of a single installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallmentStatus {
    Pending,
    Overdue,
    Paid,
}

impl InstallmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallmentStatus::Pending => "PENDING",
            InstallmentStatus::Overdue => "OVERDUE",
            InstallmentStatus::Paid => "PAID",
        }
    }

    /// Unpaid status for a due date seen from `today`
    pub fn unpaid_for(due_date: NaiveDate, today: NaiveDate) -> Self {
        if due_date < today {
            InstallmentStatus::Overdue
        } else {
            InstallmentStatus::Pending
        }
    }
}

/// Aggregate status of a schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    Pending,
    Overdue,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Transfer,
    DirectDebit,
    Cheque,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Transfer => "TRANSFER",
            PaymentMethod::DirectDebit => "DIRECT_DEBIT",
            PaymentMethod::Cheque => "CHEQUE",
            PaymentMethod::Card => "CARD",
        }
    }
}

/// Ordered group of installments belonging to one quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSchedule {
    pub id: String,

    pub quote_id: String,

    pub status: ScheduleStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// One scheduled payment within a schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstallment {
    pub id: String,

    pub schedule_id: String,

    /// 1-based position within the schedule
    pub number: u32,

    pub due_date: NaiveDate,

    /// Coverage period paid for by this installment
    pub period_start: NaiveDate,

    pub period_end: NaiveDate,

    /// Amount excluding tax
    #[serde(rename = "amountHT")]
    pub amount_ht: f64,

    pub tax_amount: f64,

    /// Amount including tax
    #[serde(rename = "amountTTC")]
    pub amount_ttc: f64,

    pub status: InstallmentStatus,

    // Payment confirmation fields, all cleared when unmarked paid
    #[serde(default)]
    pub paid_amount: Option<f64>,

    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,

    #[serde(default)]
    pub payment_reference: Option<String>,

    /// User who confirmed the payment
    #[serde(default)]
    pub validated_by: Option<String>,
}

impl PaymentInstallment {
    pub fn is_paid(&self) -> bool {
        self.status == InstallmentStatus::Paid
    }

    /// Whether any payment-confirmation field is still set
    pub fn has_payment_confirmation(&self) -> bool {
        self.paid_amount.is_some()
            || self.paid_at.is_some()
            || self.payment_method.is_some()
            || self.payment_reference.is_some()
            || self.validated_by.is_some()
    }

    pub fn clear_payment_confirmation(&mut self) {
        self.paid_amount = None;
        self.paid_at = None;
        self.payment_method = None;
        self.payment_reference = None;
        self.validated_by = None;
    }

    /// amountTTC < amountHT is a data-integrity violation
    pub fn has_swapped_amounts(&self) -> bool {
        self.amount_ttc < self.amount_ht
    }
}
