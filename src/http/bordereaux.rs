//! Bordereau preview, export, download and history handlers

use log::info;
use serde::{Deserialize, Serialize};

use super::{Ctx, Reply};
use crate::bordereau::{
    build_legacy, build_v2, generate_legacy_csv, legacy_record, render_download, v2_record,
    DateRange, Download, LegacyFilters, LegacyRow, V2Request, CSV_CONTENT_TYPE,
};
use crate::error::{CrmError, Result};
use crate::model::BordereauSummary;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// `POST /bordereaux/preview`; brokers only ever see their own rows
pub fn preview(ctx: &Ctx) -> Result<Reply> {
    let mut filters: LegacyFilters = ctx.body()?;
    if let Some(own) = ctx.session.broker_scope() {
        if let Some(ids) = &filters.broker_ids {
            if ids.iter().any(|id| id != own) {
                return Err(CrmError::forbidden("Filtre courtier non autorisé"));
            }
        }
        filters.broker_ids = Some(vec![own.to_string()]);
    }

    let result = build_legacy(ctx.store(), &filters, ctx.clock().now())?;
    Ok(Reply::fields([
        ("data", serde_json::to_value(&result.rows)?),
        ("sourceDataPerRow", serde_json::to_value(&result.source_data_per_row)?),
        ("metadata", serde_json::to_value(&result.metadata)?),
    ]))
}

/// `POST /bordereaux/preview-v2`
pub fn preview_v2(ctx: &Ctx) -> Result<Reply> {
    let request: V2Request = ctx.body()?;
    let result = build_v2(ctx.store(), &request, ctx.clock().now())?;
    Ok(Reply::fields([
        ("polices", serde_json::to_value(&result.polices)?),
        ("quittances", serde_json::to_value(&result.quittances)?),
        ("metadata", serde_json::to_value(&result.metadata)?),
    ]))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportRequest {
    rows: Vec<LegacyRow>,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    date_range: Option<DateRange>,
}

/// `POST /bordereaux/export`: render the rows as CSV and record the export
pub fn export(ctx: &Ctx) -> Result<Reply> {
    let request: ExportRequest = ctx.body()?;
    let csv = generate_legacy_csv(&request.rows, ctx.app.csv_delimiter)?;

    let period = match request.date_range {
        Some(range) => {
            range.validate()?;
            range
        }
        None => DateRange::covering(&request.rows)
            .ok_or_else(|| CrmError::validation("Aucune donnée à exporter"))?,
    };
    let record = legacy_record(
        request.rows,
        period,
        request.file_name,
        &ctx.session.user.id,
        ctx.clock().now(),
    );
    ctx.store().insert_bordereau(&record)?;
    info!(
        "legacy bordereau {} exported by {} ({})",
        record.id, record.generated_by, record.file_name_polices
    );

    Ok(Reply::File(Download {
        file_name: record.file_name_polices,
        content_type: CSV_CONTENT_TYPE,
        bytes: csv.into_bytes(),
    }))
}

/// `POST /bordereaux/export-v2`: build, record and return the ZIP
pub fn export_v2(ctx: &Ctx) -> Result<Reply> {
    let request: V2Request = ctx.body()?;
    let result = build_v2(ctx.store(), &request, ctx.clock().now())?;
    let record = v2_record(result, &ctx.session.user.id);

    // render before storing so a failed archive leaves no record behind
    let download = render_download(&record, ctx.app.csv_delimiter)?;
    ctx.store().insert_bordereau(&record)?;
    info!(
        "v2 bordereau {} exported by {} for {}..{}",
        record.id, record.generated_by, record.period_start, record.period_end
    );
    Ok(Reply::File(download))
}

/// `GET /bordereaux/{id}/download`: regenerate from the stored snapshot
pub fn download(ctx: &Ctx) -> Result<Reply> {
    let id = ctx.param(0)?;
    let record = ctx
        .store()
        .bordereau(id)?
        .ok_or_else(|| CrmError::not_found("Bordereau introuvable"))?;
    Ok(Reply::File(render_download(&record, ctx.app.csv_delimiter)?))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: usize,
    pub total_pages: i64,
}

/// Page size from the query: default 20, clamped to [1, 100]
pub fn page_size(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE)
}

/// Page number from the query: default 1, not clamped
pub fn page_number(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok()).unwrap_or(1)
}

/// `GET /bordereaux/history?page&limit`, newest first
///
/// A page below 1 gives a negative offset, which the store rejects.
pub fn history(ctx: &Ctx) -> Result<Reply> {
    let limit = page_size(ctx.query("limit").as_deref());
    let page = page_number(ctx.query("page").as_deref());
    let skip = page.saturating_sub(1).saturating_mul(limit);

    let records = ctx.store().bordereaux(skip, limit)?;
    let total = ctx.store().count_bordereaux()?;
    let summaries: Vec<BordereauSummary> = records.iter().map(BordereauSummary::from).collect();

    let pagination = Pagination {
        page,
        limit,
        total,
        total_pages: (total as i64 + limit - 1) / limit,
    };
    Ok(Reply::fields([
        ("data", serde_json::to_value(&summaries)?),
        ("pagination", serde_json::to_value(pagination)?),
    ]))
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use serde_json::json;

    use super::*;
    use crate::http::testing::*;
    use crate::store::CrmStore;

    fn march() -> serde_json::Value {
        json!({"startDate": "2024-03-01", "endDate": "2024-03-31"})
    }

    #[test]
    fn test_page_size_clamp() {
        assert_eq!(page_size(None), 20);
        assert_eq!(page_size(Some("500")), 100);
        assert_eq!(page_size(Some("0")), 1);
        assert_eq!(page_size(Some("abc")), 20);
        assert_eq!(page_number(Some("0")), 0);
        assert_eq!(page_number(None), 1);
    }

    #[tokio::test]
    async fn test_preview_envelope() {
        let (app, store) = app();
        let before = store.snapshot().unwrap();
        let body = json!({"dateRange": march(), "includeQuotes": true});
        let response = app
            .handle(request("POST", "/bordereaux/preview", Some("admin-token"), Some(body)))
            .await;
        assert_eq!(response.status().as_u16(), 200);

        let body = json(&response);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
        assert_eq!(body["sourceDataPerRow"][2]["kind"], "quote");
        assert_eq!(body["metadata"]["totalContracts"], 2);
        assert_eq!(body["metadata"]["dateRange"]["startDate"], "2024-03-01");
        // previews never persist
        assert_eq!(store.snapshot().unwrap(), before);
    }

    #[tokio::test]
    async fn test_preview_is_scoped_for_brokers() {
        let (app, _) = app();
        let body = json!({"dateRange": march()});
        let response = app
            .handle(request("POST", "/bordereaux/preview", Some("brk-2-token"), Some(body)))
            .await;
        let body = json(&response);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["brokerCode"], "BRK02");

        let body = json!({"dateRange": march(), "brokerIds": ["brk-1"]});
        let response = app
            .handle(request("POST", "/bordereaux/preview", Some("brk-2-token"), Some(body)))
            .await;
        assert_eq!(response.status().as_u16(), 403);
    }

    #[tokio::test]
    async fn test_preview_requires_date_range() {
        let (app, _) = app();
        let response = app
            .handle(request("POST", "/bordereaux/preview", Some("admin-token"), Some(json!({}))))
            .await;
        assert_eq!(response.status().as_u16(), 400);

        let body = json!({"dateRange": {"startDate": "2024-04-01", "endDate": "2024-03-01"}});
        let response = app
            .handle(request("POST", "/bordereaux/preview", Some("admin-token"), Some(body)))
            .await;
        assert_eq!(response.status().as_u16(), 400);
    }

    #[tokio::test]
    async fn test_preview_v2_requires_admin() {
        let (app, _) = app();
        let body = json!({"dateRange": march()});
        let response = app
            .handle(request("POST", "/bordereaux/preview-v2", Some("brk-1-token"), Some(body.clone())))
            .await;
        assert_eq!(response.status().as_u16(), 403);

        let response = app
            .handle(request("POST", "/bordereaux/preview-v2", Some("admin-token"), Some(body)))
            .await;
        let body = json(&response);
        assert_eq!(body["polices"].as_array().unwrap().len(), 1);
        assert_eq!(body["quittances"].as_array().unwrap().len(), 2);
        assert_eq!(body["metadata"]["inclusionOptions"]["includeUnpaidReceipts"], true);
    }

    #[tokio::test]
    async fn test_export_is_byte_stable_and_recorded() {
        let (app, store) = app();
        let preview = app
            .handle(request(
                "POST",
                "/bordereaux/preview",
                Some("admin-token"),
                Some(json!({"dateRange": march()})),
            ))
            .await;
        let rows = json(&preview)["data"].clone();

        let export = || request("POST", "/bordereaux/export", Some("admin-token"), Some(json!({"rows": rows})));
        let first = app.handle(export()).await;
        let second = app.handle(export()).await;
        assert_eq!(first.status().as_u16(), 200);
        assert_eq!(
            first.headers()["content-disposition"],
            "attachment; filename=\"bordereau_2024_03.csv\""
        );
        assert_eq!(bytes(&first), bytes(&second));
        // no deduplication: two records
        assert_eq!(store.count_bordereaux().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_export_without_rows_is_rejected() {
        let (app, store) = app();
        let response = app
            .handle(request("POST", "/bordereaux/export", Some("admin-token"), Some(json!({"rows": []}))))
            .await;
        assert_eq!(response.status().as_u16(), 400);
        assert_eq!(json(&response)["error"], "Aucune donnée à exporter");
        assert_eq!(store.count_bordereaux().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_export_v2_then_download() {
        let (app, store) = app();
        let response = app
            .handle(request(
                "POST",
                "/bordereaux/export-v2",
                Some("admin-token"),
                Some(json!({"dateRange": march()})),
            ))
            .await;
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(response.headers()["content-type"], "application/zip");
        let exported = bytes(&response);

        let id = store.bordereaux(0, 1).unwrap()[0].id.clone();

        // later changes to live data do not affect the re-download
        let mut installment = store.installment("inst-2a").unwrap().unwrap();
        installment.amount_ttc = 1.0;
        store.update_installment(&installment).unwrap();

        let response = app
            .handle(request("GET", &format!("/bordereaux/{}/download", id), Some("admin-token"), None))
            .await;
        assert_eq!(
            response.headers()["content-disposition"],
            "attachment; filename=\"bordereau_2024_03.zip\""
        );
        let downloaded = bytes(&response);
        assert_eq!(downloaded, exported);

        let mut archive = zip::ZipArchive::new(Cursor::new(downloaded)).unwrap();
        let mut quittances = String::new();
        archive
            .by_name("quittances_2024_03.csv")
            .unwrap()
            .read_to_string(&mut quittances)
            .unwrap();
        assert!(quittances.contains("817,50"));
    }

    #[tokio::test]
    async fn test_download_unknown_is_json_404() {
        let (app, _) = app();
        let response = app
            .handle(request("GET", "/bordereaux/missing/download", Some("admin-token"), None))
            .await;
        assert_eq!(response.status().as_u16(), 404);
        assert_eq!(json(&response)["success"], false);
    }

    #[tokio::test]
    async fn test_history_pagination() {
        let (app, store) = app();
        for _ in 0..3 {
            let body = json!({"dateRange": march()});
            app.handle(request("POST", "/bordereaux/export-v2", Some("admin-token"), Some(body)))
                .await;
        }

        let req = with_query(
            request("GET", "/bordereaux/history", Some("admin-token"), None),
            &[("page", "2"), ("limit", "2")],
        );
        let body = json(&app.handle(req).await);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["pagination"], json!({"page": 2, "limit": 2, "total": 3, "totalPages": 2}));
        assert_eq!(body["data"][0]["schema"], "v2");

        let req = with_query(
            request("GET", "/bordereaux/history", Some("admin-token"), None),
            &[("limit", "500")],
        );
        let body = json(&app.handle(req).await);
        assert_eq!(body["pagination"]["limit"], 100);
        assert_eq!(body["data"].as_array().unwrap().len(), 3);

        let template = store.bordereaux(0, 1).unwrap().remove(0);
        for n in 0..102 {
            let mut record = template.clone();
            record.id = format!("hist-{}", n);
            store.insert_bordereau(&record).unwrap();
        }
        let req = with_query(
            request("GET", "/bordereaux/history", Some("admin-token"), None),
            &[("limit", "500")],
        );
        let body = json(&app.handle(req).await);
        assert_eq!(body["data"].as_array().unwrap().len(), 100);
        assert_eq!(body["pagination"], json!({"page": 1, "limit": 100, "total": 105, "totalPages": 2}));
    }

    #[tokio::test]
    async fn test_history_page_zero_is_not_clamped() {
        let (app, _) = app();
        let req = with_query(
            request("GET", "/bordereaux/history", Some("admin-token"), None),
            &[("page", "0")],
        );
        let response = app.handle(req).await;
        assert_eq!(response.status().as_u16(), 500);
    }
}
