//! Installment operations against the data store
//!
//! Each function loads what it needs, applies the pure transition and commits
//! record by record. A failure part-way leaves earlier commits in place.

use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::installments::{
    derive_schedule_status, mark_paid, mark_unpaid, select_overdue, swap_amounts_if_inverted,
    OverdueInstallment, PaymentConfirmation,
};
use super::schedule::{plan_installments, PaymentFrequency};
use crate::clock::Clock;
use crate::error::{CrmError, Result};
use crate::model::{InstallmentStatus, PaymentInstallment, PaymentSchedule, ScheduleStatus};
use crate::store::{CrmStore, InstallmentFilter};

fn load_installment(store: &dyn CrmStore, id: &str) -> Result<PaymentInstallment> {
    store
        .installment(id)?
        .ok_or_else(|| CrmError::not_found("Échéance introuvable"))
}

fn schedule_installments(store: &dyn CrmStore, schedule_id: &str) -> Result<Vec<PaymentInstallment>> {
    Ok(store.installments(&InstallmentFilter {
        schedule_ids: Some(vec![schedule_id.to_string()]),
        ..InstallmentFilter::default()
    })?)
}

/// Installments of one quote, or of every quote visible to the caller
///
/// `broker_scope` restricts the result to quotes of that broker; asking for
/// another broker's quote is forbidden.
pub fn list_installments(
    store: &dyn CrmStore,
    quote_id: Option<&str>,
    broker_scope: Option<&str>,
) -> Result<Vec<PaymentInstallment>> {
    let schedule_ids = match quote_id {
        Some(quote_id) => {
            let quote = store
                .quote(quote_id)?
                .ok_or_else(|| CrmError::not_found("Devis introuvable"))?;
            if broker_scope.is_some_and(|broker| broker != quote.broker_id) {
                return Err(CrmError::forbidden("Ce devis n'appartient pas à votre cabinet"));
            }
            match store.schedule_for_quote(quote_id)? {
                Some(schedule) => vec![schedule.id],
                None => return Ok(Vec::new()),
            }
        }
        None => {
            let mut ids = Vec::new();
            for schedule in store.schedules()? {
                let visible = match broker_scope {
                    None => true,
                    Some(broker) => store
                        .quote(&schedule.quote_id)?
                        .is_some_and(|q| q.broker_id == broker),
                };
                if visible {
                    ids.push(schedule.id);
                }
            }
            ids
        }
    };

    Ok(store.installments(&InstallmentFilter {
        schedule_ids: Some(schedule_ids),
        ..InstallmentFilter::default()
    })?)
}

/// Confirm a payment and re-derive the schedule status from its installments
pub fn mark_installment_paid(
    store: &dyn CrmStore,
    clock: &dyn Clock,
    id: &str,
    confirmation: &PaymentConfirmation,
    validated_by: &str,
) -> Result<PaymentInstallment> {
    let mut installment = load_installment(store, id)?;
    let now = clock.now();
    mark_paid(&mut installment, confirmation, validated_by, now)?;

    let mut siblings = schedule_installments(store, &installment.schedule_id)?;
    for sibling in siblings.iter_mut().filter(|s| s.id == installment.id) {
        *sibling = installment.clone();
    }
    let status = derive_schedule_status(&siblings);
    store.update_installment_with_schedule(&installment, status, now)?;

    info!(
        "installment {} marked paid by {} (schedule {} -> {:?})",
        id, validated_by, installment.schedule_id, status
    );
    Ok(installment)
}

/// Revert a paid installment; the owning schedule goes back to PENDING
pub fn mark_installment_unpaid(
    store: &dyn CrmStore,
    clock: &dyn Clock,
    id: &str,
) -> Result<PaymentInstallment> {
    let mut installment = load_installment(store, id)?;
    mark_unpaid(&mut installment, clock.today())?;
    store.update_installment_with_schedule(&installment, ScheduleStatus::Pending, clock.now())?;

    info!(
        "installment {} marked unpaid, now {}",
        id,
        installment.status.as_str()
    );
    Ok(installment)
}

pub fn list_overdue(store: &dyn CrmStore, clock: &dyn Clock) -> Result<Vec<OverdueInstallment>> {
    let unpaid = store.installments(&InstallmentFilter {
        statuses: Some(vec![InstallmentStatus::Pending, InstallmentStatus::Overdue]),
        ..InstallmentFilter::default()
    })?;
    Ok(select_overdue(unpaid, clock.local_now()))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RectifyReport {
    /// Rows where amountTTC < amountHT
    pub found: usize,
    /// Rows actually corrected
    pub swapped: usize,
}

/// Swap amountHT/amountTTC on every row where TTC < HT
///
/// Rows are committed one at a time; a failed row is logged and skipped.
/// Re-running is a no-op on already corrected rows.
pub fn rectify_amounts(store: &dyn CrmStore) -> Result<RectifyReport> {
    let mut report = RectifyReport::default();
    for mut installment in store.installments(&InstallmentFilter::default())? {
        if !swap_amounts_if_inverted(&mut installment) {
            continue;
        }
        report.found += 1;
        match store.update_installment_amounts(
            &installment.id,
            installment.amount_ht,
            installment.amount_ttc,
        ) {
            Ok(()) => report.swapped += 1,
            Err(e) => warn!("could not rectify installment {}: {}", installment.id, e),
        }
    }
    info!(
        "amount rectification: {} swapped of {} inverted rows",
        report.swapped, report.found
    );
    Ok(report)
}

/// Flip PENDING installments past their due date to OVERDUE
///
/// Returns the number of installments updated. Schedules touched get their
/// status re-derived.
pub fn refresh_overdue(store: &dyn CrmStore, clock: &dyn Clock) -> Result<usize> {
    let today = clock.today();
    let now = clock.now();
    let pending = store.installments(&InstallmentFilter {
        statuses: Some(vec![InstallmentStatus::Pending]),
        ..InstallmentFilter::default()
    })?;

    let mut touched_schedules: Vec<String> = Vec::new();
    let mut updated = 0;
    for mut installment in pending {
        if InstallmentStatus::unpaid_for(installment.due_date, today) != InstallmentStatus::Overdue {
            continue;
        }
        installment.status = InstallmentStatus::Overdue;
        store.update_installment(&installment)?;
        updated += 1;
        if !touched_schedules.contains(&installment.schedule_id) {
            touched_schedules.push(installment.schedule_id);
        }
    }

    for schedule_id in &touched_schedules {
        let status = derive_schedule_status(&schedule_installments(store, schedule_id)?);
        store.update_schedule_status(schedule_id, status, now)?;
    }
    if updated > 0 {
        info!(
            "{} installments now overdue across {} schedules",
            updated,
            touched_schedules.len()
        );
    }
    Ok(updated)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub quote_id: String,
    pub frequency: PaymentFrequency,
    pub first_due_date: NaiveDate,
}

/// Create the payment schedule of a quote from its calculated premium
pub fn create_schedule(
    store: &dyn CrmStore,
    clock: &dyn Clock,
    request: &ScheduleRequest,
) -> Result<(PaymentSchedule, Vec<PaymentInstallment>)> {
    let quote = store
        .quote(&request.quote_id)?
        .ok_or_else(|| CrmError::not_found("Devis introuvable"))?;
    let premium = quote
        .calculated_premium
        .as_ref()
        .ok_or_else(|| CrmError::validation("Aucune prime calculée pour ce devis"))?;
    if store.schedule_for_quote(&quote.id)?.is_some() {
        return Err(CrmError::conflict("Un échéancier existe déjà pour ce devis"));
    }

    let now = clock.now();
    let schedule_id = uuid::Uuid::new_v4().to_string();
    let installments = plan_installments(
        &schedule_id,
        premium,
        request.frequency,
        request.first_due_date,
        clock.today(),
    )?;
    let schedule = PaymentSchedule {
        id: schedule_id,
        quote_id: quote.id.clone(),
        status: derive_schedule_status(&installments),
        created_at: now,
        updated_at: now,
    };
    store.insert_schedule(&schedule, &installments)?;

    info!(
        "schedule {} created for quote {} ({} installments)",
        schedule.id,
        quote.reference,
        installments.len()
    );
    Ok((schedule, installments))
}
