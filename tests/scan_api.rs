use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use lottery_dayclose::backend::CloseDayApi;
use lottery_dayclose::models::{Bin, CloseDayRequest, Pack, ReconciliationSummary};
use lottery_dayclose::service::parser::encode_serial;
use lottery_dayclose::service::TracingNotifier;
use lottery_dayclose::{api, CommitError, ReconciliationCommitter, ScanStation};
use serde_json::{json, Value};
use tower::ServiceExt;

struct AcceptAll;

#[async_trait]
impl CloseDayApi for AcceptAll {
    async fn close_day(
        &self,
        _store_id: &str,
        request: &CloseDayRequest,
    ) -> Result<ReconciliationSummary, CommitError> {
        Ok(ReconciliationSummary {
            closings_created: request.closings.len() as i64,
            business_day: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            day_closed: true,
            bins_closed: vec![],
            lottery_total: BigDecimal::from(0),
        })
    }
}

fn bins() -> Vec<Bin> {
    ["1", "2"]
        .iter()
        .map(|n| Bin {
            bin_id: format!("b{n}"),
            bin_number: n.parse().unwrap(),
            is_active: true,
            pack: Some(Pack {
                pack_id: format!("pack-{n}"),
                pack_number: format!("000000{n}"),
                game_code: format!("000{n}"),
                game_name: "Lucky 7".into(),
                game_price: BigDecimal::from(2),
                starting_serial: "005".into(),
                ending_serial: None,
                serial_end: "050".into(),
            }),
        })
        .collect()
}

fn app() -> Router {
    let committer = Arc::new(ReconciliationCommitter::new(Arc::new(AcceptAll), "store-1", None));
    let station = ScanStation::new(&bins(), committer, Arc::new(TracingNotifier), Duration::from_millis(400)).spawn();
    api::router(station)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_check() {
    let app = app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn scan_undo_and_commit_flow() {
    let app = app();

    let (status, ack) = call(&app, "POST", "/api/scan/input", Some(json!({ "text": encode_serial("0001", "0000001", "025") }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcomes"][0]["result"], "accepted");
    assert_eq!(ack["outcomes"][0]["closing"]["closing_serial"], "025");

    // 只扫了一个票箱, 不能提交
    let (status, _) = call(&app, "POST", "/api/scan/commit", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, snapshot) = call(&app, "GET", "/api/scan/session", None).await;
    assert_eq!(snapshot["progress"], 50);
    assert_eq!(snapshot["can_commit"], false);
    assert_eq!(snapshot["rows"][0]["status"], "scanned");

    let (status, removed) = call(&app, "DELETE", "/api/scan/bins/b1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["pack_id"], "pack-1");
    let (_, snapshot) = call(&app, "GET", "/api/scan/session", None).await;
    assert_eq!(snapshot["rows"][0]["status"], "unscanned");

    for (game, pack) in [("0001", "0000001"), ("0002", "0000002")] {
        let code = encode_serial(game, pack, "030");
        let (_, outcome) = call(&app, "POST", "/api/scan/code", Some(json!({ "code": code }))).await;
        assert_eq!(outcome["result"], "accepted");
    }

    let (status, summary) = call(&app, "POST", "/api/scan/commit", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["closings_created"], 2);

    let (_, snapshot) = call(&app, "GET", "/api/scan/session", None).await;
    assert_eq!(snapshot["state"], "committed");
}

#[tokio::test]
async fn out_of_range_scan_is_rejected() {
    let app = app();
    let code = encode_serial("0001", "0000001", "004");
    let (status, outcome) = call(&app, "POST", "/api/scan/code", Some(json!({ "code": code }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["result"], "rejected");
    assert_eq!(outcome["kind"], "range_violation");
}

#[tokio::test]
async fn undo_unknown_bin_is_noop() {
    let app = app();
    let (status, removed) = call(&app, "DELETE", "/api/scan/bins/zzz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed, Value::Null);
}

#[tokio::test]
async fn cancel_discards_session() {
    let app = app();
    call(&app, "POST", "/api/scan/input", Some(json!({ "text": encode_serial("0001", "0000001", "025") }))).await;

    let (status, _) = call(&app, "POST", "/api/scan/cancel", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, snapshot) = call(&app, "GET", "/api/scan/session", None).await;
    assert_eq!(snapshot["state"], "cancelled");
    assert_eq!(snapshot["scanned"], 0);

    let (status, _) = call(&app, "POST", "/api/scan/commit", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}
