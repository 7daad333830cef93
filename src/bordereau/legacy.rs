//! Legacy single-sheet bordereau: contracts and, optionally, open quotes

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::rows::{LegacyRow, LegacyRowType};
use super::DateRange;
use crate::error::Result;
use crate::model::{Broker, Contract, ContractStatus, ProductType, Quote, QuoteStatus};
use crate::store::{ContractFilter, CrmStore, QuoteFilter};

/// Filters of a legacy preview request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyFilters {
    pub date_range: DateRange,
    #[serde(default)]
    pub broker_ids: Option<Vec<String>>,
    #[serde(default)]
    pub contract_status: Option<Vec<ContractStatus>>,
    #[serde(default)]
    pub product_type: Option<ProductType>,
    #[serde(default)]
    pub include_quotes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Contract,
    Quote,
}

/// Record a row was built from, kept for auditing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRef {
    pub kind: SourceKind,
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyMetadata {
    pub total_contracts: usize,
    pub total_quotes: usize,
    pub total_rows: usize,
    pub date_range: DateRange,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LegacyBordereau {
    pub rows: Vec<LegacyRow>,
    /// `source_data_per_row[i]` is the source of `rows[i]`
    pub source_data_per_row: Vec<SourceRef>,
    pub metadata: LegacyMetadata,
}

struct Lookup<'a> {
    brokers: &'a HashMap<String, Broker>,
    quotes: &'a HashMap<String, Quote>,
}

impl Lookup<'_> {
    fn broker(&self, id: &str) -> (String, String) {
        self.brokers
            .get(id)
            .map(|b| (b.code.clone(), b.name.clone()))
            .unwrap_or_default()
    }
}

fn contract_row(contract: &Contract, lookup: &Lookup) -> LegacyRow {
    let (broker_code, broker_name) = lookup.broker(&contract.broker_id);
    let quote = lookup.quotes.get(&contract.quote_id);

    LegacyRow {
        row_type: LegacyRowType::Contrat,
        reference: contract.policy_number.clone(),
        broker_code,
        broker_name,
        product: contract.product_type.as_str().to_string(),
        status: contract.status.as_str().to_string(),
        company_name: quote.map(|q| q.company_name.clone()).unwrap_or_default(),
        siren: quote.and_then(|q| q.siren.clone()).unwrap_or_default(),
        postal_code: quote.and_then(|q| q.postal_code.clone()).unwrap_or_default(),
        city: quote.and_then(|q| q.city.clone()).unwrap_or_default(),
        activities: quote.map(|q| q.activity_codes()).unwrap_or_default(),
        declared_revenue: quote.and_then(|q| q.declared_revenue()),
        start_date: Some(contract.start_date),
        end_date: Some(contract.end_date),
        premium_ht: contract.premium_ht,
        tax_amount: contract.tax_amount,
        premium_ttc: contract.premium_ttc,
        created_at: contract.created_at.date_naive(),
    }
}

fn quote_row(quote: &Quote, lookup: &Lookup) -> LegacyRow {
    let (broker_code, broker_name) = lookup.broker(&quote.broker_id);
    let premium = quote.calculated_premium.as_ref();

    LegacyRow {
        row_type: LegacyRowType::Devis,
        reference: quote.reference.clone(),
        broker_code,
        broker_name,
        product: quote.product_type.as_str().to_string(),
        status: quote.status.as_str().to_string(),
        company_name: quote.company_name.clone(),
        siren: quote.siren.clone().unwrap_or_default(),
        postal_code: quote.postal_code.clone().unwrap_or_default(),
        city: quote.city.clone().unwrap_or_default(),
        activities: quote.activity_codes(),
        declared_revenue: quote.declared_revenue(),
        start_date: quote.effective_date,
        end_date: None,
        premium_ht: premium.map_or(0.0, |p| p.premium_ht),
        tax_amount: premium.map_or(0.0, |p| p.tax_amount),
        premium_ttc: premium.map_or(0.0, |p| p.premium_ttc),
        created_at: quote.created_at.date_naive(),
    }
}

/// Query the store and build the legacy rows for `filters`
///
/// Contracts come first (start date, then policy number), followed by
/// offered/accepted quotes without a contract (creation date, then reference).
pub fn build_legacy(
    store: &dyn CrmStore,
    filters: &LegacyFilters,
    generated_at: DateTime<Utc>,
) -> Result<LegacyBordereau> {
    filters.date_range.validate()?;

    let mut contracts = store.contracts(&ContractFilter {
        start_from: Some(filters.date_range.start_date),
        start_to: Some(filters.date_range.end_date),
        broker_ids: filters.broker_ids.clone(),
        statuses: filters.contract_status.clone(),
        product_type: filters.product_type,
    })?;
    contracts.sort_by(|a, b| {
        a.start_date
            .cmp(&b.start_date)
            .then_with(|| a.policy_number.cmp(&b.policy_number))
    });

    let mut quotes_by_id = HashMap::new();
    for contract in &contracts {
        if let Some(quote) = store.quote(&contract.quote_id)? {
            quotes_by_id.insert(quote.id.clone(), quote);
        }
    }

    let mut open_quotes = Vec::new();
    if filters.include_quotes {
        let candidates = store.quotes(&QuoteFilter {
            created_from: Some(filters.date_range.start_date),
            created_to: Some(filters.date_range.end_date),
            broker_ids: filters.broker_ids.clone(),
            statuses: Some(vec![QuoteStatus::Offered, QuoteStatus::Accepted]),
            product_type: filters.product_type,
        })?;
        for quote in candidates {
            if store.contract_for_quote(&quote.id)?.is_none() {
                open_quotes.push(quote);
            }
        }
        open_quotes.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.reference.cmp(&b.reference))
        });
    }

    let brokers: HashMap<String, Broker> = store
        .brokers()?
        .into_iter()
        .map(|b| (b.id.clone(), b))
        .collect();
    let lookup = Lookup {
        brokers: &brokers,
        quotes: &quotes_by_id,
    };

    let mut rows: Vec<LegacyRow> = contracts
        .par_iter()
        .map(|c| contract_row(c, &lookup))
        .collect();
    rows.par_extend(open_quotes.par_iter().map(|q| quote_row(q, &lookup)));

    let source_data_per_row = contracts
        .iter()
        .map(|c| SourceRef { kind: SourceKind::Contract, id: c.id.clone() })
        .chain(
            open_quotes
                .iter()
                .map(|q| SourceRef { kind: SourceKind::Quote, id: q.id.clone() }),
        )
        .collect();

    Ok(LegacyBordereau {
        metadata: LegacyMetadata {
            total_contracts: contracts.len(),
            total_quotes: open_quotes.len(),
            total_rows: rows.len(),
            date_range: filters.date_range,
            generated_at,
        },
        rows,
        source_data_per_row,
    })
}
