//! Status transitions on single installments
//!
//! Pure functions over records; persistence is the caller's job.

use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CrmError, Result};
use crate::model::{InstallmentStatus, PaymentInstallment, PaymentMethod, ScheduleStatus};

/// Payment details supplied when confirming an installment
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    /// Defaults to the installment's amountTTC
    #[serde(default)]
    pub paid_amount: Option<f64>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_reference: Option<String>,
}

pub fn mark_paid(
    installment: &mut PaymentInstallment,
    confirmation: &PaymentConfirmation,
    validated_by: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    if installment.is_paid() {
        return Err(CrmError::conflict("Cette échéance est déjà marquée comme payée"));
    }
    if let Some(amount) = confirmation.paid_amount {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(CrmError::validation("le montant payé doit être positif"));
        }
    }

    installment.status = InstallmentStatus::Paid;
    installment.paid_amount = Some(confirmation.paid_amount.unwrap_or(installment.amount_ttc));
    installment.paid_at = Some(now);
    installment.payment_method = Some(confirmation.payment_method);
    installment.payment_reference = confirmation.payment_reference.clone();
    installment.validated_by = Some(validated_by.to_string());
    Ok(())
}

/// Revert a paid installment to PENDING or OVERDUE and clear its confirmation
///
/// The due date is compared with `today` (local calendar day).
pub fn mark_unpaid(installment: &mut PaymentInstallment, today: chrono::NaiveDate) -> Result<()> {
    if !installment.is_paid() {
        return Err(CrmError::conflict("Cette échéance n'est pas marquée comme payée"));
    }
    installment.status = InstallmentStatus::unpaid_for(installment.due_date, today);
    installment.clear_payment_confirmation();
    Ok(())
}

/// Aggregate status: all paid -> Paid, any overdue -> Overdue, else Pending
pub fn derive_schedule_status(installments: &[PaymentInstallment]) -> ScheduleStatus {
    if !installments.is_empty() && installments.iter().all(|i| i.is_paid()) {
        ScheduleStatus::Paid
    } else if installments
        .iter()
        .any(|i| i.status == InstallmentStatus::Overdue)
    {
        ScheduleStatus::Overdue
    } else {
        ScheduleStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueInstallment {
    #[serde(flatten)]
    pub installment: PaymentInstallment,
    pub days_overdue: i64,
}

fn due_instant(installment: &PaymentInstallment) -> NaiveDateTime {
    installment.due_date.and_time(NaiveTime::MIN)
}

/// Unpaid installments due strictly before `now`, oldest due date first
///
/// `days_overdue` counts whole days elapsed since the due date's midnight.
pub fn select_overdue(
    installments: impl IntoIterator<Item = PaymentInstallment>,
    now: NaiveDateTime,
) -> Vec<OverdueInstallment> {
    let mut overdue: Vec<OverdueInstallment> = installments
        .into_iter()
        .filter(|i| !i.is_paid() && due_instant(i) < now)
        .map(|installment| {
            let days_overdue = (now - due_instant(&installment)).num_days();
            OverdueInstallment {
                installment,
                days_overdue,
            }
        })
        .collect();
    overdue.sort_by_key(|o| o.installment.due_date);
    overdue
}

/// Swap amountHT and amountTTC when TTC < HT; returns whether a swap happened
pub fn swap_amounts_if_inverted(installment: &mut PaymentInstallment) -> bool {
    if !installment.has_swapped_amounts() {
        return false;
    }
    std::mem::swap(&mut installment.amount_ht, &mut installment.amount_ttc);
    true
}
