use axum::{body::Body, http::Request};
use serde_json::{json, Value};
use tower::ServiceExt;

use configd::core::Backend;

mod common;

async fn create_test_app() -> axum::Router {
    let mut config = common::config();
    config.configuration.set_backend(Some(Backend::Memory));

    let initializer = configd::config::Initializer::from_config(config);
    let service = initializer.start_service().await.unwrap();

    configd::server::http::router(service)
}

async fn call(app: &axum::Router, operation: &str, body: Value) -> (u16, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(format!("/configuration/{}", operation))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status().as_u16();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn fx_scenario() {
    let app = create_test_app().await;
    let owner = common::issue("acme", "Owner");
    let member = common::issue("acme", "Member");

    let (status, body) = call(
        &app,
        "createRepository",
        json!({"token": owner, "repository": "FX"}),
    )
    .await;
    assert_eq!((status, body), (200, json!({})));

    let (status, body) = call(
        &app,
        "save",
        json!({"token": owner, "repository": "FX", "key": "Gold", "value": {"instrument": "XAU"}}),
    )
    .await;
    assert_eq!((status, body), (200, json!({})));

    let (status, body) = call(
        &app,
        "fetch",
        json!({"token": member, "repository": "FX", "key": "Gold"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"key": "Gold", "value": {"instrument": "XAU"}}));

    let (status, body) = call(&app, "entries", json!({"token": member, "repository": "FX"})).await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({"entries": [{"key": "Gold", "value": {"instrument": "XAU"}}]})
    );

    let (status, body) = call(
        &app,
        "delete",
        json!({"token": member, "repository": "FX", "key": "Gold"}),
    )
    .await;
    assert_eq!(status, 500);
    assert_eq!(
        body,
        json!({
            "errorCode": 500,
            "errorMessage": "Role 'Member' has insufficient permissions for the requested operation: delete"
        })
    );
}

#[tokio::test]
async fn bad_requests() {
    let app = create_test_app().await;
    let owner = common::issue("acme", "Owner");

    let (status, body) = call(&app, "fetch", json!({"repository": "FX", "key": "Gold"})).await;
    assert_eq!(status, 400);
    assert_eq!(
        body,
        json!({"errorCode": 400, "errorMessage": "Please specify 'token'"})
    );

    let (status, body) = call(&app, "fetch", json!({"token": owner, "repository": "FX"})).await;
    assert_eq!(status, 400);
    assert_eq!(body["errorMessage"], "Please specify 'key'");

    let (status, body) = call(&app, "truncate", json!({"token": owner})).await;
    assert_eq!(status, 400);
    assert_eq!(body["errorMessage"], "Unknown operation 'truncate'");

    let (status, body) = call(
        &app,
        "fetch",
        json!({"token": owner, "repository": "FX", "key": "Gold", "version": 0}),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["errorMessage"], "Version must be a positive number");
}

#[tokio::test]
async fn entry_history() {
    let app = create_test_app().await;
    let owner = common::issue("acme", "Owner");
    let member = common::issue("acme", "Member");

    call(&app, "createRepository", json!({"token": owner, "repository": "FX"})).await;

    let (status, body) = call(
        &app,
        "createEntry",
        json!({"token": owner, "repository": "FX", "key": "Gold", "value": null}),
    )
    .await;
    assert_eq!((status, body), (200, json!({"version": 1})));

    let (status, body) = call(
        &app,
        "updateEntry",
        json!({"token": owner, "repository": "FX", "key": "Gold", "value": "XAU"}),
    )
    .await;
    assert_eq!((status, body), (200, json!({"version": 2})));

    let (status, body) = call(
        &app,
        "fetch",
        json!({"token": member, "repository": "FX", "key": "Gold", "version": "1"}),
    )
    .await;
    assert_eq!((status, body), (200, json!({"key": "Gold", "value": null})));

    let (status, body) = call(
        &app,
        "history",
        json!({"token": member, "repository": "FX", "key": "Gold"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({"history": [{"version": 1, "value": null}, {"version": 2, "value": "XAU"}]})
    );
}

#[tokio::test]
async fn ws_requires_upgrade() {
    let app = create_test_app().await;

    let request = Request::builder()
        .method("GET")
        .uri("/ws")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}
