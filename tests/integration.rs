use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use order_dispatch::api::rest::router;
use order_dispatch::engine::EngineConfig;
use order_dispatch::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

fn setup() -> axum::Router {
    let state = AppState::new(1024, EngineConfig::default());
    router(Arc::new(state))
}

struct Identity {
    id: String,
    role: &'static str,
}

fn manager() -> Identity {
    Identity {
        id: Uuid::new_v4().to_string(),
        role: "manager",
    }
}

fn partner(id: &str) -> Identity {
    Identity {
        id: id.to_string(),
        role: "partner",
    }
}

fn json_request(method: &str, uri: &str, who: &Identity, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-actor-id", &who.id)
        .header("x-actor-role", who.role)
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn order_body() -> Value {
    json!({
        "items": [
            { "name": "Ramen", "quantity": 2, "unit_price": 14.0 },
            { "name": "Gyoza", "quantity": 1, "unit_price": 7.5 }
        ],
        "customer": {
            "name": "Jo Park",
            "phone": "555-0177",
            "address": "9 Mill Lane"
        },
        "prep_minutes": 20,
        "eta_minutes": 30,
        "priority": "high"
    })
}

async fn create_partner(app: &axum::Router, who: &Identity, name: &str) -> String {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/partners",
            who,
            json!({ "name": name, "phone": "555-0100" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["id"].as_str().unwrap().to_string()
}

async fn create_order(app: &axum::Router, who: &Identity) -> String {
    let res = app
        .clone()
        .oneshot(json_request("POST", "/orders", who, order_body()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["orders"], 0);
    assert_eq!(body["partners"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("orders_created_total"));
}

#[tokio::test]
async fn create_order_returns_prep_with_dispatch_time() {
    let app = setup();
    let response = app
        .oneshot(json_request("POST", "/orders", &manager(), order_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "PREP");
    assert_eq!(body["priority"], "high");
    assert_eq!(body["total"], 35.5);
    assert!(body["assigned_partner"].is_null());
    assert_eq!(body["history"].as_array().unwrap().len(), 1);
    assert!(body["code"].as_str().unwrap().starts_with("ORD-"));
}

#[tokio::test]
async fn missing_identity_returns_401() {
    let app = setup();
    let request = Request::builder()
        .method("POST")
        .uri("/orders")
        .header("content-type", "application/json")
        .body(Body::from(order_body().to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn partner_cannot_create_order() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/orders",
            &partner(&Uuid::new_v4().to_string()),
            order_body(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["kind"], "forbidden");
}

#[tokio::test]
async fn create_order_out_of_range_prep_returns_400() {
    let app = setup();
    let mut body = order_body();
    body["prep_minutes"] = json!(200);

    let response = app
        .oneshot(json_request("POST", "/orders", &manager(), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_partner_empty_name_returns_400() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/partners",
            &manager(),
            json!({ "name": "  ", "phone": "555-0100" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_status_in_body_returns_400_validation() {
    let app = setup();
    let who = manager();
    let order_id = create_order(&app, &who).await;

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/status"),
            &who,
            json!({ "status": "SHIPPED" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["kind"], "validation");
    assert!(body["error"].as_str().unwrap().contains("SHIPPED"));
}

#[tokio::test]
async fn negative_quantity_returns_400_validation() {
    let app = setup();
    let mut body = order_body();
    body["items"][0]["quantity"] = json!(-1);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/orders", &manager(), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["kind"], "validation");

    let health = body_json(app.oneshot(get_request("/health")).await.unwrap()).await;
    assert_eq!(health["orders"], 0);
}

#[tokio::test]
async fn get_nonexistent_order_returns_404() {
    let app = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";
    let response = app
        .oneshot(get_request(&format!("/orders/{fake_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn full_delivery_flow() {
    let app = setup();
    let boss = manager();

    let partner_id = create_partner(&app, &boss, "Dispatch Dan").await;
    let order_id = create_order(&app, &boss).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/assign"),
            &boss,
            json!({ "partner_id": partner_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let assigned = body_json(res).await;
    assert_eq!(assigned["assigned_partner"], partner_id);
    assert_eq!(assigned["status"], "PREP");

    let res = app
        .clone()
        .oneshot(get_request(&format!("/partners/{partner_id}")))
        .await
        .unwrap();
    let busy = body_json(res).await;
    assert_eq!(busy["available"], false);
    assert_eq!(busy["current_order"], order_id);

    let rider = partner(&partner_id);
    for status in ["PICKED", "ON_ROUTE", "DELIVERED"] {
        let res = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/orders/{order_id}/status"),
                &rider,
                json!({ "status": status }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["status"], status);
    }

    let res = app
        .clone()
        .oneshot(get_request(&format!("/partners/{partner_id}")))
        .await
        .unwrap();
    let freed = body_json(res).await;
    assert_eq!(freed["available"], true);
    assert!(freed["current_order"].is_null());
    assert_eq!(freed["stats"]["total_deliveries"], 1);

    let res = app
        .oneshot(get_request("/orders?status=DELIVERED"))
        .await
        .unwrap();
    let delivered = body_json(res).await;
    assert_eq!(delivered.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn second_assignment_returns_409() {
    let app = setup();
    let boss = manager();

    let partner_id = create_partner(&app, &boss, "Alice").await;
    let first = create_order(&app, &boss).await;
    let second = create_order(&app, &boss).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{first}/assign"),
            &boss,
            json!({ "partner_id": partner_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{second}/assign"),
            &boss,
            json!({ "partner_id": partner_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(res).await["kind"], "partner_unavailable");
}

#[tokio::test]
async fn partner_accepts_then_skip_is_rejected() {
    let app = setup();
    let boss = manager();

    let partner_id = create_partner(&app, &boss, "Alice").await;
    let order_id = create_order(&app, &boss).await;
    let rider = partner(&partner_id);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/accept"),
            &rider,
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/status"),
            &rider,
            json!({ "status": "ON_ROUTE" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = body_json(res).await;
    assert_eq!(body["kind"], "invalid_transition");
    assert_eq!(body["error"], "invalid transition from PREP to ON_ROUTE");
}

#[tokio::test]
async fn cancel_releases_partner_and_second_cancel_conflicts() {
    let app = setup();
    let boss = manager();

    let partner_id = create_partner(&app, &boss, "Alice").await;
    let order_id = create_order(&app, &boss).await;

    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/assign"),
            &boss,
            json!({ "partner_id": partner_id }),
        ))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/cancel"),
            &boss,
            json!({ "reason": "kitchen closed" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cancelled = body_json(res).await;
    assert_eq!(cancelled["status"], "CANCELLED");
    assert_eq!(cancelled["history"][1]["note"], "kitchen closed");

    let res = app
        .clone()
        .oneshot(get_request(&format!("/partners/{partner_id}")))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["available"], true);

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/cancel"),
            &boss,
            json!({ "reason": "again" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(res).await["kind"], "already_terminal");
}

#[tokio::test]
async fn update_estimates_moves_dispatch_time() {
    let app = setup();
    let boss = manager();
    let order_id = create_order(&app, &boss).await;

    let res = app
        .oneshot(json_request(
            "PATCH",
            &format!("/orders/{order_id}/estimates"),
            &boss,
            json!({ "eta_minutes": 45 }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["eta_minutes"], 45);
    assert_eq!(body["prep_minutes"], 20);
}

#[tokio::test]
async fn deactivate_partner_hides_from_assignment() {
    let app = setup();
    let boss = manager();

    let partner_id = create_partner(&app, &boss, "Alice").await;
    let order_id = create_order(&app, &boss).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "DELETE",
            &format!("/partners/{partner_id}"),
            &boss,
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["active"], false);

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/assign"),
            &boss,
            json!({ "partner_id": partner_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
