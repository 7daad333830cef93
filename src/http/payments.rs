//! Payment installment handlers

use serde_json::json;

use super::{Ctx, Reply};
use crate::error::Result;
use crate::payments::service;
use crate::payments::{PaymentConfirmation, ScheduleRequest};

/// `GET /payment-installments?quoteId=`
pub fn list(ctx: &Ctx) -> Result<Reply> {
    let quote_id = ctx.query("quoteId");
    let rows = service::list_installments(
        ctx.store(),
        quote_id.as_deref(),
        ctx.session.broker_scope(),
    )?;
    Reply::data(&rows)
}

/// `PATCH /payment-installments/{id}/mark-paid`
pub fn mark_paid(ctx: &Ctx) -> Result<Reply> {
    let confirmation: PaymentConfirmation = ctx.body()?;
    let row = service::mark_installment_paid(
        ctx.store(),
        ctx.clock(),
        ctx.param(0)?,
        &confirmation,
        &ctx.session.user.id,
    )?;
    Reply::data(&row)
}

/// `PATCH /payment-installments/{id}/mark-unpaid`
pub fn mark_unpaid(ctx: &Ctx) -> Result<Reply> {
    let row = service::mark_installment_unpaid(ctx.store(), ctx.clock(), ctx.param(0)?)?;
    Reply::data(&row)
}

/// `GET /payment-installments/overdue`, oldest due date first
pub fn overdue(ctx: &Ctx) -> Result<Reply> {
    let rows = service::list_overdue(ctx.store(), ctx.clock())?;
    Ok(Reply::fields([
        ("count", json!(rows.len())),
        ("data", serde_json::to_value(&rows)?),
    ]))
}

/// `POST /rectifier-montants`
pub fn rectify(ctx: &Ctx) -> Result<Reply> {
    let report = service::rectify_amounts(ctx.store())?;
    Ok(Reply::fields([
        (
            "message",
            json!(format!(
                "{} échéance(s) corrigée(s) sur {} détectée(s)",
                report.swapped, report.found
            )),
        ),
        ("data", serde_json::to_value(report)?),
    ]))
}

/// `POST /payment-schedules`
pub fn create_schedule(ctx: &Ctx) -> Result<Reply> {
    let request: ScheduleRequest = ctx.body()?;
    let (schedule, installments) = service::create_schedule(ctx.store(), ctx.clock(), &request)?;
    Ok(Reply::fields([(
        "data",
        json!({
            "schedule": serde_json::to_value(&schedule)?,
            "installments": serde_json::to_value(&installments)?,
        }),
    )])
    .with_status(201))
}
