//! Premium calculation handlers

use log::info;

use super::{Ctx, Reply};
use crate::error::{CrmError, Result};
use crate::tariff::{calculate_premium, TariffInput};

/// Body of a pricing request; company age is measured today when no
/// `referenceDate` is sent
fn tariff_input(ctx: &Ctx) -> Result<TariffInput> {
    let mut input: TariffInput = ctx.body()?;
    input.reference_date.get_or_insert_with(|| ctx.clock().today());
    input.validate()?;
    Ok(input)
}

/// `POST /tariff/calculate`: price an input without storing anything
pub fn calculate(ctx: &Ctx) -> Result<Reply> {
    let input = tariff_input(ctx)?;
    Reply::data(&calculate_premium(&input))
}

/// `POST /quotes/{id}/calculate`: price and store the result on the quote
pub fn calculate_quote(ctx: &Ctx) -> Result<Reply> {
    let mut quote = ctx
        .store()
        .quote(ctx.param(0)?)?
        .ok_or_else(|| CrmError::not_found("Devis introuvable"))?;
    ctx.session.ensure_owns(&quote.broker_id)?;

    let input = tariff_input(ctx)?;
    let result = calculate_premium(&input);

    quote.tariff_input = Some(input);
    quote.calculated_premium = Some(result.clone());
    quote.updated_at = ctx.clock().now();
    ctx.store().update_quote(&quote)?;

    info!(
        "quote {} priced at {:.2} TTC",
        quote.reference, result.premium_ttc
    );
    Reply::data(&result)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::http::testing::*;
    use crate::store::fixtures::date;
    use crate::store::CrmStore;

    fn input() -> serde_json::Value {
        json!({
            "annualRevenue": 400000,
            "staffCount": 4,
            "activities": [{"code": "MACONNERIE", "share": 1.0}],
            "qualified": true
        })
    }

    #[tokio::test]
    async fn test_calculate() {
        let (app, _) = app();
        let req = request("POST", "/tariff/calculate", Some("brk-1-token"), Some(input()));
        let response = app.handle(req).await;
        assert_eq!(response.status().as_u16(), 200);
        let body = json(&response);
        let ht = body["data"]["premiumHT"].as_f64().unwrap();
        let ttc = body["data"]["premiumTTC"].as_f64().unwrap();
        assert!(ttc > ht);
        assert_eq!(body["data"]["factors"][0]["code"], "ACTIVITY_BASE");
    }

    fn company_age(body: &serde_json::Value) -> f64 {
        body["data"]["factors"]
            .as_array()
            .unwrap()
            .iter()
            .find(|f| f["code"] == "COMPANY_AGE")
            .unwrap()["value"]
            .as_f64()
            .unwrap()
    }

    #[tokio::test]
    async fn test_company_age_measured_today_by_default() {
        let (app, store) = app();
        let old_company = json!({"annualRevenue": 400000, "incorporationDate": "1990-01-01"});

        let req = request("POST", "/tariff/calculate", Some("brk-1-token"), Some(old_company.clone()));
        assert_eq!(company_age(&json(&app.handle(req).await)), 1.00);

        let req = request("POST", "/quotes/q-3/calculate", Some("brk-1-token"), Some(old_company));
        assert_eq!(company_age(&json(&app.handle(req).await)), 1.00);
        let stored = store.quote("q-3").unwrap().unwrap().tariff_input.unwrap();
        assert_eq!(stored.reference_date, Some(date(2024, 6, 1)));

        // an explicit date is kept
        let dated = json!({
            "annualRevenue": 400000,
            "incorporationDate": "1990-01-01",
            "referenceDate": "1991-06-01"
        });
        let req = request("POST", "/tariff/calculate", Some("brk-1-token"), Some(dated));
        assert_eq!(company_age(&json(&app.handle(req).await)), 1.15);
    }

    #[tokio::test]
    async fn test_negative_revenue_is_rejected() {
        let (app, _) = app();
        let body = json!({"annualRevenue": -1});
        let req = request("POST", "/tariff/calculate", Some("admin-token"), Some(body));
        assert_eq!(app.handle(req).await.status().as_u16(), 400);
    }

    #[tokio::test]
    async fn test_quote_calculation_checks_ownership() {
        let (app, store) = app();
        let req = request("POST", "/quotes/q-2/calculate", Some("brk-1-token"), Some(input()));
        assert_eq!(app.handle(req).await.status().as_u16(), 403);

        let req = request("POST", "/quotes/q-3/calculate", Some("brk-1-token"), Some(input()));
        let body = json(&app.handle(req).await);
        let quote = store.quote("q-3").unwrap().unwrap();
        let stored = quote.calculated_premium.unwrap();
        assert_eq!(body["data"]["premiumTTC"].as_f64().unwrap(), stored.premium_ttc);
        assert_eq!(quote.tariff_input.unwrap().annual_revenue, 400000.0);

        let req = request("POST", "/quotes/ghost/calculate", Some("admin-token"), Some(input()));
        assert_eq!(app.handle(req).await.status().as_u16(), 404);
    }
}
