//! Installment planning from a calculated premium

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CrmError, Result};
use crate::model::{InstallmentStatus, PaymentInstallment};
use crate::money::{round_cents, split_cents};
use crate::tariff::TariffResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentFrequency {
    Annual,
    SemiAnnual,
    Quarterly,
    Monthly,
}

impl PaymentFrequency {
    pub fn installments_per_year(&self) -> u32 {
        match self {
            PaymentFrequency::Annual => 1,
            PaymentFrequency::SemiAnnual => 2,
            PaymentFrequency::Quarterly => 4,
            PaymentFrequency::Monthly => 12,
        }
    }

    pub fn months_between(&self) -> u32 {
        12 / self.installments_per_year()
    }
}

fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| CrmError::validation(format!("date hors limites: {} + {} mois", date, months)))
}

/// Build the ordered installments covering one year from `first_due_date`
///
/// HT and tax are split to the cent with leftovers on the first installment,
/// so the installments always sum to the premium. Installments already due
/// before `today` start OVERDUE.
pub fn plan_installments(
    schedule_id: &str,
    premium: &TariffResult,
    frequency: PaymentFrequency,
    first_due_date: NaiveDate,
    today: NaiveDate,
) -> Result<Vec<PaymentInstallment>> {
    let count = frequency.installments_per_year();
    let step = frequency.months_between();
    let ht_shares = split_cents(premium.premium_ht, count);
    let tax_shares = split_cents(premium.tax_amount, count);

    let mut installments = Vec::with_capacity(count as usize);
    for (index, (amount_ht, tax_amount)) in ht_shares.into_iter().zip(tax_shares).enumerate() {
        let offset = index as u32 * step;
        let due_date = add_months(first_due_date, offset)?;
        let next_due = add_months(first_due_date, offset + step)?;
        let period_end = next_due.pred_opt().unwrap_or(next_due);

        installments.push(PaymentInstallment {
            id: uuid::Uuid::new_v4().to_string(),
            schedule_id: schedule_id.to_string(),
            number: index as u32 + 1,
            due_date,
            period_start: due_date,
            period_end,
            amount_ht,
            tax_amount,
            amount_ttc: round_cents(amount_ht + tax_amount),
            status: InstallmentStatus::unpaid_for(due_date, today),
            paid_amount: None,
            paid_at: None,
            payment_method: None,
            payment_reference: None,
            validated_by: None,
        });
    }
    Ok(installments)
}
