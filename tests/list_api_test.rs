/// The list endpoints through full HTTP requests
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::{Extension, Router};
use listcrate::{Caller, list_router};
use serde_json::Value;
use tower::ServiceExt;

mod common;
use common::{card_service, setup_test_app, setup_test_db};

async fn get_json(app: Router, uri: &str) -> (StatusCode, Option<String>, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_range = response
        .headers()
        .get("Content-Range")
        .map(|value| value.to_str().unwrap().to_string());
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, content_range, json)
}

fn item_ids(body: &Value) -> Vec<i64> {
    body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_default_list_response() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let (status, content_range, body) = get_json(app, "/api/v1/cards").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_range.as_deref(), Some("cards 0-5/8"));
    assert_eq!(item_ids(&body), [8, 7, 6, 5, 4, 3]);

    let meta = &body["meta"];
    assert_eq!(meta["total_results"], 8);
    assert_eq!(meta["total_pages"], 2);
    assert_eq!(meta["page"], 1);
    assert_eq!(meta["is_last_page"], false);
    assert_eq!(meta["ordering"], serde_json::json!(["-id"]));
    assert_eq!(meta["is_default_ordering"], true);
    assert_eq!(meta["active_filters"], 0);
    assert_eq!(meta["search_help_text"], "Name, Attribute");
    // Anonymous callers only see the public preset
    assert_eq!(meta["presets"].as_array().unwrap().len(), 1);
    assert_eq!(meta["presets"][0]["slug"], "super-rare");
    assert_eq!(meta["presets"][0]["label"], "Super rare");
}

#[tokio::test]
async fn test_second_page_content_range() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let (status, content_range, body) = get_json(app, "/api/v1/cards?page=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_range.as_deref(), Some("cards 6-7/8"));
    assert_eq!(item_ids(&body), [2, 1]);
    assert_eq!(body["meta"]["is_last_page"], true);
}

#[tokio::test]
async fn test_empty_result() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let (status, content_range, body) = get_json(app, "/api/v1/cards?rarity=9").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_range.as_deref(), Some("cards */0"));
    assert!(item_ids(&body).is_empty());
    assert_eq!(body["meta"]["total_pages"], 0);
    assert_eq!(body["meta"]["is_last_page"], true);
}

#[tokio::test]
async fn test_preset_path() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let (status, _, body) = get_json(app, "/api/v1/cards/super-rare").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item_ids(&body), [7, 3, 1]);
    assert_eq!(body["meta"]["preset"], "super-rare");
    assert_eq!(body["meta"]["canonical_preset"], "super-rare");
}

#[tokio::test]
async fn test_query_matching_preset_is_canonicalized() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let (_, _, body) = get_json(app.clone(), "/api/v1/cards?rarity=3&view=icons").await;
    assert_eq!(body["meta"]["preset"], Value::Null);
    assert_eq!(body["meta"]["canonical_preset"], "super-rare");

    let (_, _, body) = get_json(app, "/api/v1/cards?rarity=3&attribute=smile").await;
    assert_eq!(body["meta"]["canonical_preset"], Value::Null);
}

#[tokio::test]
async fn test_unknown_preset_lists_without_it() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let (status, _, body) = get_json(app, "/api/v1/cards/does-not-exist").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total_results"], 8);
    assert_eq!(body["meta"]["preset"], Value::Null);
}

#[tokio::test]
async fn test_restricted_preset_for_capable_caller() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let staff = Caller::new("12").with_capability("staff");
    let app = Router::new()
        .nest("/api/v1/cards", list_router(card_service(db)))
        .layer(Extension(staff));

    let (status, _, body) = get_json(app, "/api/v1/cards/staff-picks").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item_ids(&body), [7, 5]);
    assert_eq!(body["meta"]["preset"], "staff-picks");
    assert_eq!(body["meta"]["presets"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_non_default_ordering_reports_relevant_fields() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let (_, _, body) = get_json(app, "/api/v1/cards?ordering=score&reverse_order=on").await;
    assert_eq!(body["meta"]["ordering"], serde_json::json!(["-score"]));
    assert_eq!(body["meta"]["reverse_order"], true);
    assert_eq!(body["meta"]["is_default_ordering"], false);
    assert_eq!(body["meta"]["relevant_fields"], serde_json::json!(["score"]));
}

#[tokio::test]
async fn test_localized_search_help_text() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let uri = format!(
        "/api/v1/cards?language=ja&search={}",
        url_escape::encode_component("凛")
    );
    let (status, _, body) = get_json(app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item_ids(&body), [1]);
    assert_eq!(body["meta"]["search_help_text"], "名前, Attribute");
}

#[tokio::test]
async fn test_malformed_input_is_not_an_error() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let (status, _, body) = get_json(
        app,
        "/api/v1/cards?page=abc&page_size=-3&rarity=x&ordering=name;DROP&ids=1,a",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total_results"], 8);
    assert_eq!(body["meta"]["is_default_ordering"], true);
}

#[tokio::test]
async fn test_store_failure_is_sanitized_500() {
    // No migrations: the cards table does not exist
    let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
    let app = setup_test_app(db);

    let (status, _, body) = get_json(app, "/api/v1/cards").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "A database error occurred");
    assert!(!body.to_string().contains("cards"));
}

#[tokio::test]
async fn test_unknown_entity_is_404() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let (status, _, _) = get_json(app, "/api/v1/decks").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
