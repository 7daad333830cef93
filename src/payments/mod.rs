//! Payment schedules and installment status tracking

mod installments;
mod schedule;
pub mod service;

pub use installments::{
    derive_schedule_status, mark_paid, mark_unpaid, select_overdue, swap_amounts_if_inverted,
    OverdueInstallment, PaymentConfirmation,
};
pub use schedule::{plan_installments, PaymentFrequency};
pub use service::{RectifyReport, ScheduleRequest};
