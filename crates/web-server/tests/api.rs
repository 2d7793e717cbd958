use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use database::MemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use web_server::create_router;

fn app() -> Router {
    create_router(Arc::new(MemoryStore::sample()))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

#[tokio::test]
async fn connectivity_check_reports_plain_text() {
    let (status, body) = get(&app(), "/check-db-connection").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("connected"));
}

#[tokio::test]
async fn closed_store_reports_unable_to_connect() {
    let store = Arc::new(MemoryStore::sample());
    database::DonationStore::close(store.as_ref()).await;
    let app = create_router(store);

    let (status, body) = get(&app, "/check-db-connection").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("unable to connect"));

    let (status, body) = get(&app, "/demotable").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn charity_lifecycle() {
    let app = app();

    let (status, body) = post(
        &app,
        "/insert-demotable",
        json!({"id": "6", "name": "Shelter Now", "address": "1 Pender St"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (_, body) = get(&app, "/count-demotable").await;
    assert_eq!(body, json!({"success": true, "count": 6}));

    let (status, _) = post(&app, "/update-charity", json!({"id": 6, "address": "2 Pender St"})).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get(&app, "/demotable").await;
    let last = body["data"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(
        last,
        json!({"CharityID": 6, "Name": "Shelter Now", "Address": "2 Pender St"})
    );

    let (status, _) = post(&app, "/delete-charity", json!({"id": 6})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = post(&app, "/delete-charity", json!({"id": 6})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn duplicate_charity_is_a_server_error_with_message() {
    let (status, body) = post(
        &app(),
        "/insert-demotable",
        json!({"id": 1, "name": "Again", "address": "Anywhere"}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"].as_str().unwrap().contains("duplicate key"));
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let app = app();
    let (status, body) = post(&app, "/insert-demotable", json!({"name": "No id"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));

    let (status, _) = get(&app, "/recipients/not-a-number").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn recipient_round_trip_and_partial_update() {
    let app = app();
    let (status, _) = post(
        &app,
        "/insert-recipient",
        json!({"SinNum": "300000001", "EventID": "4", "Age": "52", "ContactNum": "604-555-0199", "Gender": "M"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(&app, "/update-recipients", json!({"SinNum": 300000001, "Age": 53})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&app, "/recipients/300000001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"SinNum": 300000001, "EventID": 4, "Age": 53, "ContactNum": "604-555-0199", "Gender": "M"})
    );

    let (status, _) = get(&app, "/recipients/123").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn recipient_update_validation() {
    let app = app();
    let (status, body) = post(&app, "/update-recipients", json!({"Age": 20})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("SinNum is required for updating a recipient"));

    let (status, body) = post(&app, "/update-recipients", json!({"SinNum": 100000001})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("No fields to update"));

    let (status, _) = post(
        &app,
        "/update-recipients",
        json!({"SinNum": 100000001, "EventID": 99}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn search_with_mixed_connectors() {
    let app = app();
    let (status, body) = post(
        &app,
        "/search-charities",
        json!({
            "conditions": [
                {"attribute": "Name", "operator": "=", "value": "RedCross"},
                {"attribute": "CharityID", "operator": ">", "value": 4},
                {"attribute": "Address", "operator": "=", "value": "12 Broadway"}
            ],
            "logicalOperators": ["AND", "OR"]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["CharityID"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![4, 5]);
}

#[tokio::test]
async fn search_without_conditions_returns_everything() {
    let (status, body) = post(
        &app(),
        "/search-charities",
        json!({"conditions": [], "logicalOperators": []}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn search_rejects_bad_input_before_querying() {
    let app = app();
    let (status, body) = post(
        &app,
        "/search-charities",
        json!({"conditions": [{"attribute": "Name", "operator": "<=", "value": "A"}]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("<="));

    let (status, _) = post(
        &app,
        "/search-charities",
        json!({"conditions": [{"attribute": "Name; DROP TABLE Charities", "operator": "=", "value": "A"}]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &app,
        "/search-charities",
        json!({
            "conditions": [
                {"attribute": "Name", "operator": "=", "value": "A"},
                {"attribute": "Name", "operator": "=", "value": "B"}
            ],
            "logicalOperators": []
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn projection_keeps_requested_order() {
    let app = app();
    let (status, body) = post(&app, "/projection", json!({"attributes": ["Address", "CharityID"]})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"][0], json!(["123 Main St", 1]));

    let (status, body) = post(&app, "/projection", json!({"attributes": []})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("No attributes selected"));
}

#[tokio::test]
async fn analytical_queries() {
    let app = app();

    let (_, body) = get(&app, "/event-recipient-aggregation").await;
    assert_eq!(body[0], json!({"EVENTID": 1, "AVG_AGE": 41.0, "RECIPIENT_COUNT": 3}));

    let (_, body) = get(&app, "/recipient-age-count").await;
    assert_eq!(body[0], json!({"AGE": 19, "AGE_COUNT": 1}));

    let (_, body) = get(&app, "/lowest-age-event-query").await;
    assert_eq!(
        body,
        json!([{"EVENTID": 3, "EVENTNAME": "Summer Harvest", "AVG_EVENT_AGE": 27.0}])
    );

    let (_, body) = get(&app, "/recipients-for-food/12").await;
    assert_eq!(
        body,
        json!([
            {"SinNum": 100000003, "ContactNum": "604-555-0101"},
            {"SinNum": 100000007, "ContactNum": "778-555-0104"}
        ])
    );

    let (status, body) = get(&app, "/division-query").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"data": [{"CONTACTNUM": "604-555-0101"}]}));
}

#[tokio::test]
async fn donor_delete_and_reinitialize() {
    let app = app();
    let (status, _) = post(&app, "/delete-donor", json!({"donorId": "1"})).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get(&app, "/fooddonor").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (status, body) = post(&app, "/initiate-demotable", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (_, body) = get(&app, "/fooddonor").await;
    assert_eq!(body["data"][0]["Type"], json!("Grocery"));

    let (_, body) = get(&app, "/donation-events").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 4);
}
