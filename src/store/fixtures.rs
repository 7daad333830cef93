//! Sample CRM tables shared by unit tests

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use super::{CrmData, MemoryStore};
use crate::model::*;
use crate::tariff::{calculate_premium, ActivityShare, TariffInput};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
}

fn broker(id: &str, code: &str, name: &str) -> Broker {
    Broker {
        id: id.into(),
        code: code.into(),
        name: name.into(),
        email: format!("{}@example.fr", code.to_lowercase()),
        active: true,
    }
}

fn quote(id: &str, broker_id: &str, status: QuoteStatus, created: DateTime<Utc>) -> Quote {
    let input = TariffInput {
        annual_revenue: 300_000.0,
        staff_count: 3.0,
        activities: vec![
            ActivityShare { code: "MACONNERIE".into(), share: 0.7 },
            ActivityShare { code: "CARRELAGE".into(), share: 0.3 },
        ],
        incorporation_date: Some(date(2015, 1, 1)),
        experience_years: Some(12),
        prior_insurer_default: false,
        continuous_coverage_years: Some(6),
        qualified: true,
        termination_reason: None,
        uninsured_activity: false,
        reference_date: Some(created.date_naive()),
    };
    Quote {
        id: id.into(),
        reference: format!("DEV-{}", id.to_uppercase()),
        broker_id: broker_id.into(),
        product_type: ProductType::Rcd,
        status,
        company_name: format!("Entreprise {}", id.to_uppercase()),
        siren: Some("552100554".into()),
        postal_code: Some("69003".into()),
        city: Some("Lyon".into()),
        calculated_premium: Some(calculate_premium(&input)),
        tariff_input: Some(input),
        effective_date: None,
        created_at: created,
        updated_at: created,
    }
}

#[allow(clippy::too_many_arguments)]
fn contract(
    id: &str,
    policy_number: &str,
    quote_id: &str,
    broker_id: &str,
    product_type: ProductType,
    status: ContractStatus,
    start: NaiveDate,
    premium_ht: f64,
) -> Contract {
    let tax = (premium_ht * 0.09 * 100.0).round() / 100.0;
    Contract {
        id: id.into(),
        policy_number: policy_number.into(),
        quote_id: quote_id.into(),
        broker_id: broker_id.into(),
        product_type,
        status,
        start_date: start,
        end_date: start + chrono::Duration::days(364),
        premium_ht,
        tax_amount: tax,
        premium_ttc: premium_ht + tax,
        created_at: Utc.from_utc_datetime(&start.and_hms_opt(8, 0, 0).unwrap()),
    }
}

pub fn installment(
    id: &str,
    schedule_id: &str,
    number: u32,
    due: NaiveDate,
    amount_ht: f64,
    amount_ttc: f64,
    status: InstallmentStatus,
) -> PaymentInstallment {
    PaymentInstallment {
        id: id.into(),
        schedule_id: schedule_id.into(),
        number,
        due_date: due,
        period_start: due,
        period_end: due + chrono::Duration::days(89),
        amount_ht,
        tax_amount: ((amount_ttc - amount_ht) * 100.0).round() / 100.0,
        amount_ttc,
        status,
        paid_amount: None,
        paid_at: None,
        payment_method: None,
        payment_reference: None,
        validated_by: None,
    }
}

fn paid(mut installment: PaymentInstallment, when: DateTime<Utc>) -> PaymentInstallment {
    installment.status = InstallmentStatus::Paid;
    installment.paid_amount = Some(installment.amount_ttc);
    installment.paid_at = Some(when);
    installment.payment_method = Some(PaymentMethod::Transfer);
    installment.payment_reference = Some("VIR-0001".into());
    installment.validated_by = Some("user-admin".into());
    installment
}

pub fn data() -> CrmData {
    let schedule = |id: &str, quote_id: &str, status| PaymentSchedule {
        id: id.into(),
        quote_id: quote_id.into(),
        status,
        created_at: at(2024, 2, 20),
        updated_at: at(2024, 2, 20),
    };

    CrmData {
        brokers: vec![
            broker("brk-1", "BRK01", "Courtage Sud"),
            broker("brk-2", "BRK02", "Assur Nord"),
        ],
        quotes: vec![
            quote("q-1", "brk-1", QuoteStatus::Accepted, at(2024, 2, 10)),
            quote("q-2", "brk-2", QuoteStatus::Accepted, at(2024, 2, 15)),
            quote("q-3", "brk-1", QuoteStatus::Offered, at(2024, 3, 5)),
            quote("q-4", "brk-2", QuoteStatus::Draft, at(2024, 3, 10)),
            quote("q-5", "brk-2", QuoteStatus::Accepted, at(2023, 12, 1)),
        ],
        contracts: vec![
            contract("c-1", "RCD-2024-0001", "q-1", "brk-1", ProductType::Rcd, ContractStatus::Active, date(2024, 3, 1), 2000.0),
            contract("c-2", "RCD-2024-0002", "q-2", "brk-2", ProductType::Rcd, ContractStatus::Terminated, date(2024, 3, 15), 1500.0),
            contract("c-3", "DO-2024-0001", "q-5", "brk-2", ProductType::DommagesOuvrage, ContractStatus::Active, date(2024, 1, 1), 3000.0),
        ],
        payment_schedules: vec![
            schedule("s-1", "q-1", ScheduleStatus::Pending),
            schedule("s-2", "q-2", ScheduleStatus::Overdue),
        ],
        payment_installments: vec![
            paid(
                installment("inst-1a", "s-1", 1, date(2024, 3, 1), 500.0, 545.0, InstallmentStatus::Pending),
                at(2024, 3, 2),
            ),
            installment("inst-1b", "s-1", 2, date(2024, 6, 1), 500.0, 545.0, InstallmentStatus::Pending),
            installment("inst-1c", "s-1", 3, date(2024, 9, 1), 500.0, 545.0, InstallmentStatus::Pending),
            installment("inst-1d", "s-1", 4, date(2024, 12, 1), 500.0, 545.0, InstallmentStatus::Pending),
            installment("inst-2a", "s-2", 1, date(2024, 3, 15), 750.0, 817.5, InstallmentStatus::Overdue),
            installment("inst-swapped", "s-2", 2, date(2024, 4, 15), 100.0, 80.0, InstallmentStatus::Pending),
        ],
        bordereaux: vec![],
    }
}

pub fn store() -> MemoryStore {
    MemoryStore::new(data())
}
