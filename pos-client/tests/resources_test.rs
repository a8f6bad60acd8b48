mod common;

use common::{TestSession, fresh_token};
use pos_client::AppState;
use pos_client::error::{ApiError, SessionError};
use serde::Deserialize;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq)]
struct Product {
    id: i64,
    name: String,
    stock: i64,
}

async fn app_with_token() -> (TestSession, AppState, String) {
    let access = fresh_token(1);
    let session = TestSession::with_tokens(Some(&access), Some("r1")).await;
    let state = AppState::new(session.manager.clone());
    (session, state, access)
}

#[tokio::test]
async fn products_are_listed_with_bearer_credential() {
    let (session, state, access) = app_with_token().await;

    Mock::given(method("GET"))
        .and(path("/api/inventory/products/"))
        .and(header("Authorization", format!("Bearer {}", access).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Arroz", "stock": 40},
            {"id": 2, "name": "Frijol", "stock": 0}
        ])))
        .expect(1)
        .mount(&session.server)
        .await;

    let products: Vec<Product> = state.api.products().list().await.unwrap();

    assert_eq!(products.len(), 2);
    assert_eq!(products[1].name, "Frijol");
}

#[tokio::test]
async fn sale_is_created_and_supplier_updated() {
    let (session, state, _) = app_with_token().await;

    Mock::given(method("POST"))
        .and(path("/api/sales/sales/"))
        .and(body_json(json!({"items": [{"product": 1, "quantity": 2}]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 77, "total": "30.00"})))
        .expect(1)
        .mount(&session.server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/inventory/suppliers/3/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3, "name": "Nuevo"})))
        .expect(1)
        .mount(&session.server)
        .await;

    let sale: Value = state
        .api
        .sales()
        .create(&json!({"items": [{"product": 1, "quantity": 2}]}))
        .await
        .unwrap();
    assert_eq!(sale["id"], 77);

    let supplier: Value = state
        .api
        .suppliers()
        .partial_update(3, &json!({"name": "Nuevo"}))
        .await
        .unwrap();
    assert_eq!(supplier["name"], "Nuevo");
}

#[tokio::test]
async fn delete_accepts_empty_body() {
    let (session, state, _) = app_with_token().await;

    Mock::given(method("DELETE"))
        .and(path("/api/users/5/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&session.server)
        .await;

    state.api.users().delete(5).await.unwrap();
}

#[tokio::test]
async fn report_passes_query_parameters() {
    let (session, state, _) = app_with_token().await;

    Mock::given(method("GET"))
        .and(path("/api/reports/sales/"))
        .and(query_param("from", "2024-01-01"))
        .and(query_param("to", "2024-01-31"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": "1500.00"})))
        .expect(1)
        .mount(&session.server)
        .await;

    let params = vec![
        ("from".to_string(), "2024-01-01".to_string()),
        ("to".to_string(), "2024-01-31".to_string()),
    ];
    let report: Value = state.api.report("sales", &params).await.unwrap();

    assert_eq!(report["total"], "1500.00");
}

#[tokio::test]
async fn settings_round_trip() {
    let (session, state, _) = app_with_token().await;

    Mock::given(method("GET"))
        .and(path("/api/settings/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"currency": "MXN"})))
        .mount(&session.server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/settings/"))
        .and(body_json(json!({"currency": "USD"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"currency": "USD"})))
        .expect(1)
        .mount(&session.server)
        .await;

    let current: Value = state.api.settings().await.unwrap();
    assert_eq!(current["currency"], "MXN");

    let updated: Value = state
        .api
        .update_settings(&json!({"currency": "USD"}))
        .await
        .unwrap();
    assert_eq!(updated["currency"], "USD");
}

#[tokio::test]
async fn rejection_is_returned_to_the_view() {
    let (session, state, _) = app_with_token().await;

    Mock::given(path("/api/inventory/products/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"price": ["must be positive"]})))
        .mount(&session.server)
        .await;

    let result: Result<Value, ApiError> = state
        .api
        .products()
        .create(&json!({"name": "Sal", "price": -1}))
        .await;

    match result {
        Err(ApiError::Rejected { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("must be positive"));
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn unrecoverable_401_surfaces_as_session_error() {
    let (session, state, _) = app_with_token().await;

    Mock::given(path("/api/inventory/products/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&session.server)
        .await;

    Mock::given(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&session.server)
        .await;

    let result: Result<Value, ApiError> = state.api.products().list().await;

    assert!(matches!(
        result,
        Err(ApiError::Session(SessionError::Unauthorized { .. }))
    ));
    assert_eq!(session.navigator.routes().len(), 1);
}

#[tokio::test]
async fn invalid_json_is_reported() {
    let (session, state, _) = app_with_token().await;

    Mock::given(path("/api/inventory/products/1/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&session.server)
        .await;

    let result: Result<Product, ApiError> = state.api.products().get(1).await;

    assert!(matches!(result, Err(ApiError::InvalidBody(_))));
}
