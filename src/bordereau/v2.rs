//! v2 bordereau: separate policies and receipts files

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::rows::{InclusionOptions, PoliceRow, QuittanceRow};
use super::DateRange;
use crate::error::Result;
use crate::model::{Broker, Contract, InstallmentStatus, PaymentInstallment, Quote};
use crate::store::{ContractFilter, CrmStore, InstallmentFilter};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V2Request {
    pub date_range: DateRange,
    #[serde(default)]
    pub inclusion_options: InclusionOptions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct V2Metadata {
    pub total_polices: usize,
    pub total_quittances: usize,
    pub date_range: DateRange,
    pub inclusion_options: InclusionOptions,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct V2Bordereau {
    pub polices: Vec<PoliceRow>,
    pub quittances: Vec<QuittanceRow>,
    pub metadata: V2Metadata,
}

/// Records reachable from the rows being built
#[derive(Default)]
struct Related {
    brokers: HashMap<String, Broker>,
    quotes: HashMap<String, Quote>,
    /// Contract by quote id
    contracts: HashMap<String, Contract>,
    /// Quote id by schedule id
    schedule_quotes: HashMap<String, String>,
}

impl Related {
    fn broker_columns(&self, broker_id: &str, options: &InclusionOptions) -> (Option<String>, Option<String>) {
        if !options.include_broker_details {
            return (None, None);
        }
        match self.brokers.get(broker_id) {
            Some(b) => (Some(b.code.clone()), Some(b.name.clone())),
            None => (None, None),
        }
    }
}

fn police_row(contract: &Contract, related: &Related, options: &InclusionOptions) -> PoliceRow {
    let quote = related.quotes.get(&contract.quote_id);
    let (broker_code, broker_name) = related.broker_columns(&contract.broker_id, options);

    PoliceRow {
        policy_number: contract.policy_number.clone(),
        product: contract.product_type.as_str().to_string(),
        status: contract.status.as_str().to_string(),
        company_name: quote.map(|q| q.company_name.clone()).unwrap_or_default(),
        siren: quote.and_then(|q| q.siren.clone()).unwrap_or_default(),
        postal_code: quote.and_then(|q| q.postal_code.clone()).unwrap_or_default(),
        city: quote.and_then(|q| q.city.clone()).unwrap_or_default(),
        activities: quote.map(|q| q.activity_codes()).unwrap_or_default(),
        start_date: contract.start_date,
        end_date: contract.end_date,
        premium_ht: contract.premium_ht,
        tax_amount: contract.tax_amount,
        premium_ttc: contract.premium_ttc,
        broker_code,
        broker_name,
    }
}

fn quittance_row(
    installment: &PaymentInstallment,
    related: &Related,
    options: &InclusionOptions,
) -> QuittanceRow {
    let quote_id = related.schedule_quotes.get(&installment.schedule_id);
    let quote = quote_id.and_then(|id| related.quotes.get(id));
    let contract = quote_id.and_then(|id| related.contracts.get(id));

    // Receipts of a quote not yet contracted carry the quote reference
    let policy_number = contract
        .map(|c| c.policy_number.clone())
        .or_else(|| quote.map(|q| q.reference.clone()))
        .unwrap_or_default();
    let broker_id = quote.map(|q| q.broker_id.as_str()).unwrap_or_default();
    let (broker_code, broker_name) = related.broker_columns(broker_id, options);

    QuittanceRow {
        receipt_number: format!("{}-Q{:02}", policy_number, installment.number),
        policy_number,
        installment_number: installment.number,
        due_date: installment.due_date,
        period_start: installment.period_start,
        period_end: installment.period_end,
        amount_ht: installment.amount_ht,
        tax_amount: installment.tax_amount,
        amount_ttc: installment.amount_ttc,
        status: installment.status.as_str().to_string(),
        paid_at: installment.paid_at.map(|t| t.date_naive()),
        payment_method: installment.payment_method.map(|m| m.as_str().to_string()),
        broker_code,
        broker_name,
    }
}

/// Query the store and build both row families for the period
///
/// Policies: contracts starting in the range, in force unless
/// `include_terminated`. Receipts: installments due in the range, paid only
/// unless `include_unpaid_receipts`. No broker filter applies.
pub fn build_v2(
    store: &dyn CrmStore,
    request: &V2Request,
    generated_at: DateTime<Utc>,
) -> Result<V2Bordereau> {
    let range = &request.date_range;
    let options = &request.inclusion_options;
    range.validate()?;

    let mut contracts: Vec<Contract> = store
        .contracts(&ContractFilter {
            start_from: Some(range.start_date),
            start_to: Some(range.end_date),
            ..ContractFilter::default()
        })?
        .into_iter()
        .filter(|c| options.include_terminated || c.status.is_in_force())
        .collect();
    contracts.sort_by(|a, b| {
        a.start_date
            .cmp(&b.start_date)
            .then_with(|| a.policy_number.cmp(&b.policy_number))
    });

    let statuses = if options.include_unpaid_receipts {
        None
    } else {
        Some(vec![InstallmentStatus::Paid])
    };
    let installments = store.installments(&InstallmentFilter {
        due_from: Some(range.start_date),
        due_to: Some(range.end_date),
        statuses,
        ..InstallmentFilter::default()
    })?;

    let mut related = Related {
        brokers: store.brokers()?.into_iter().map(|b| (b.id.clone(), b)).collect(),
        ..Related::default()
    };
    let mut quote_ids: Vec<String> = contracts.iter().map(|c| c.quote_id.clone()).collect();
    for installment in &installments {
        if related.schedule_quotes.contains_key(&installment.schedule_id) {
            continue;
        }
        if let Some(schedule) = store.schedule(&installment.schedule_id)? {
            quote_ids.push(schedule.quote_id.clone());
            related
                .schedule_quotes
                .insert(installment.schedule_id.clone(), schedule.quote_id);
        }
    }
    for quote_id in quote_ids {
        if related.quotes.contains_key(&quote_id) {
            continue;
        }
        if let Some(contract) = store.contract_for_quote(&quote_id)? {
            related.contracts.insert(quote_id.clone(), contract);
        }
        if let Some(quote) = store.quote(&quote_id)? {
            related.quotes.insert(quote_id, quote);
        }
    }

    let polices: Vec<PoliceRow> = contracts
        .par_iter()
        .map(|c| police_row(c, &related, options))
        .collect();
    let mut quittances: Vec<QuittanceRow> = installments
        .par_iter()
        .map(|i| quittance_row(i, &related, options))
        .collect();
    quittances.sort_by(|a, b| {
        a.due_date
            .cmp(&b.due_date)
            .then_with(|| a.receipt_number.cmp(&b.receipt_number))
    });

    Ok(V2Bordereau {
        metadata: V2Metadata {
            total_polices: polices.len(),
            total_quittances: quittances.len(),
            date_range: *range,
            inclusion_options: *options,
            generated_at,
        },
        polices,
        quittances,
    })
}
