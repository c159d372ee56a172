//! Integration tests for vmt-web pages and JSON endpoints

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::util::ServiceExt;
use vmt_common::config::TomlConfig;
use vmt_common::db::init_memory_database;
use vmt_common::notify::LogMailer;
use vmt_web::{build_router, AppState};

/// Test helper: app over a fresh in-memory database
async fn create_test_app() -> (Router, SqlitePool) {
    let pool = init_memory_database()
        .await
        .expect("Failed to create in-memory database");
    let state = AppState::new(pool.clone(), TomlConfig::default(), Arc::new(LogMailer));
    (build_router(state), pool)
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn extract_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn location(response: &axum::response::Response) -> String {
    response.headers()[header::LOCATION]
        .to_str()
        .unwrap()
        .to_string()
}

/// Create a vehicle through the HTML form and return its id
async fn add_vehicle(app: &Router, name: &str) -> i64 {
    let response = app
        .clone()
        .oneshot(form_post(
            "/vehicles",
            &format!("name={name}&year=2015&make=Toyota&model=Tacoma&vin="),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let names = extract_json(app.clone().oneshot(get("/api/vehicles/names")).await.unwrap()).await;
    names
        .as_array()
        .unwrap()
        .iter()
        .find(|v| v["name"] == name)
        .and_then(|v| v["id"].as_i64())
        .expect("vehicle listed")
}

fn multipart_upload(
    vehicle_id: Option<i64>,
    file_name: &str,
    csv: impl AsRef<[u8]>,
    policy: &str,
) -> Request<Body> {
    let boundary = "vmt-test-boundary";
    let mut body = String::new();
    if let Some(id) = vehicle_id {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"vehicle_id\"\r\n\r\n{id}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"handle_duplicates\"\r\n\r\n{policy}\r\n"
    ));
    body.push_str(&format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: text/csv\r\n\r\n"
    ));
    let mut bytes = body.into_bytes();
    bytes.extend_from_slice(csv.as_ref());
    bytes.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/import")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(bytes))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _pool) = create_test_app().await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "vmt-web");
}

#[tokio::test]
async fn test_pages_render() {
    let (app, _pool) = create_test_app().await;
    add_vehicle(&app, "Pickup").await;

    for uri in [
        "/",
        "/vehicles",
        "/vehicles/new",
        "/maintenance",
        "/oil-changes",
        "/fuel",
        "/future-maintenance",
        "/import",
        "/notifications",
    ] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        let html = body_text(response).await;
        assert!(html.contains("<!DOCTYPE html>"), "{uri}");
    }

    let css = app.clone().oneshot(get("/static/vmt.css")).await.unwrap();
    assert_eq!(css.status(), StatusCode::OK);
    assert!(css.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/css"));
}

#[tokio::test]
async fn test_vehicle_form_redirects_and_rejects_duplicate_name() {
    let (app, _pool) = create_test_app().await;

    let response = app
        .clone()
        .oneshot(form_post("/vehicles", "name=Blue&year=2012&make=Ford&model=Ranger"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/vehicles?notice=vehicle_created");

    let response = app
        .clone()
        .oneshot(form_post("/vehicles", "name=Blue&year=2019&make=Mazda&model=3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let html = body_text(response).await;
    assert!(html.contains("already exists"));
    // Entered values are kept in the re-rendered form
    assert!(html.contains("Mazda"));

    let response = app
        .clone()
        .oneshot(form_post("/vehicles", "name=&year=abc&make=Ford&model=F150"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_blank_vehicle_name_uses_year_make_model() {
    let (app, _pool) = create_test_app().await;
    app.clone()
        .oneshot(form_post("/vehicles", "name=&year=2020&make=Subaru&model=Outback"))
        .await
        .unwrap();

    let vehicles = extract_json(app.oneshot(get("/api/vehicles")).await.unwrap()).await;
    assert_eq!(vehicles[0]["name"], "2020 Subaru Outback");
    assert!(vehicles[0]["current_mileage"].is_null());
}

#[tokio::test]
async fn test_mileage_update_flags_lower_reading() {
    let (app, _pool) = create_test_app().await;
    let id = add_vehicle(&app, "Commuter").await;

    let response = app
        .clone()
        .oneshot(form_post(
            &format!("/vehicles/{id}/update-mileage"),
            "new_mileage=52,000&date_str=2024-03-01",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = extract_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["new_mileage"], 52000);
    assert_eq!(json["is_lower"], false);

    let response = app
        .clone()
        .oneshot(form_post(
            &format!("/vehicles/{id}/update-mileage"),
            "new_mileage=51000",
        ))
        .await
        .unwrap();
    let json = extract_json(response).await;
    assert_eq!(json["is_lower"], true);
    assert_eq!(json["previous_mileage"], 52000);

    let response = app
        .clone()
        .oneshot(form_post(&format!("/vehicles/{id}/update-mileage"), "new_mileage="))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = extract_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_maintenance_form_and_json_listing() {
    let (app, _pool) = create_test_app().await;
    let id = add_vehicle(&app, "Wagon").await;

    let response = app
        .clone()
        .oneshot(form_post(
            "/maintenance",
            &format!(
                "vehicle_id={id}&date=03/15/2024&mileage=30,500&description=Oil+change&cost=%2449.99\
                 &is_oil_change=on&oil_change_interval=5000&oil_type=0W-20"
            ),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        format!("/maintenance?vehicle_id={id}&notice=record_created")
    );

    let records = extract_json(
        app.clone()
            .oneshot(get(&format!("/api/maintenance?vehicle_id={id}")))
            .await
            .unwrap(),
    )
    .await;
    let record = &records[0];
    assert_eq!(record["date"], "2024-03-15");
    assert_eq!(record["mileage"], 30500);
    assert_eq!(record["cost"], 49.99);
    assert_eq!(record["is_oil_change"], true);

    let status = extract_json(
        app.clone()
            .oneshot(get(&format!("/api/oil-status/{id}")))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status["status"]["interval"], 5000);
    assert_eq!(status["next_due_mileage"], 35500);

    let response = app
        .clone()
        .oneshot(form_post("/maintenance", &format!("vehicle_id={id}&mileage=1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("Description is required"));
}

#[tokio::test]
async fn test_fuel_entries_and_mpg_summary() {
    let (app, _pool) = create_test_app().await;
    let id = add_vehicle(&app, "Sedan").await;

    for (date, mileage, gallons) in [
        ("01/02/2024", 10_000, 12.0),
        ("01/12/2024", 10_300, 10.0),
        ("01/22/2024", 10_600, 10.0),
    ] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/fuel/entry",
                json!({
                    "vehicle_id": id,
                    "date": date,
                    "mileage": mileage,
                    "fuel_amount": gallons,
                    "fuel_cost": gallons * 3.5,
                    "fuel_type": "Regular",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let entries = extract_json(
        app.clone()
            .oneshot(get(&format!("/api/fuel/entries?vehicle_id={id}")))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(entries["entries"].as_array().unwrap().len(), 3);
    assert_eq!(entries["entries"][0]["vehicle_name"], "Sedan");
    assert_eq!(entries["entries"][0]["price_per_gallon"], 3.5);

    let summary = extract_json(
        app.clone()
            .oneshot(get(&format!("/api/fuel/mpg-summary?vehicle_id={id}")))
            .await
            .unwrap(),
    )
    .await;
    let sedan = &summary["summary"][0];
    assert_eq!(sedan["mpg"], 30.0);
    assert_eq!(sedan["current"]["mpg"], 30.0);
    assert_eq!(sedan["gaps_detected"], false);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/fuel/entry",
            json!({
                "vehicle_id": id,
                "date": "not a date",
                "mileage": 10_900,
                "fuel_amount": 10.0,
                "fuel_cost": 35.0,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_future_completion_reschedules_recurring_item() {
    let (app, _pool) = create_test_app().await;
    let id = add_vehicle(&app, "Hatch").await;

    let response = app
        .clone()
        .oneshot(form_post(
            "/future-maintenance",
            &format!(
                "vehicle_id={id}&maintenance_type=Tire+rotation&target_mileage=40000\
                 &is_recurring=on&recurrence_interval_miles=7500"
            ),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let items = extract_json(
        app.clone()
            .oneshot(get(&format!("/api/future-maintenance/vehicle/{id}")))
            .await
            .unwrap(),
    )
    .await;
    let item_id = items[0]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(form_post(&format!("/future-maintenance/{item_id}/complete"), ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).ends_with("notice=future_rescheduled"));

    let items = extract_json(
        app.clone()
            .oneshot(get(&format!("/api/future-maintenance/vehicle/{id}")))
            .await
            .unwrap(),
    )
    .await;
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["target_mileage"], 47500);
    assert_eq!(items[0]["maintenance_type"], "Tire rotation");
}

#[tokio::test]
async fn test_subscriptions_and_dispatch() {
    let (app, _pool) = create_test_app().await;
    let id = add_vehicle(&app, "Van").await;

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/future-maintenance",
            json!({
                "vehicle_id": id,
                "maintenance_type": "Coolant flush",
                "target_date": "2099-01-01",
            }),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(form_post(
            "/notifications/subscriptions",
            &format!("vehicle_id={id}&email_address=fleet%40example.com&reminder_frequency_days=3"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/notifications?notice=subscription_created");

    let response = app
        .clone()
        .oneshot(form_post(
            "/notifications/subscriptions",
            &format!("vehicle_id={id}&email_address=not-an-address"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let subs = extract_json(app.clone().oneshot(get("/api/email-subscriptions")).await.unwrap()).await;
    assert_eq!(subs.as_array().unwrap().len(), 1);
    assert_eq!(subs[0]["reminder_frequency_days"], 3);

    let report = extract_json(
        app.clone()
            .oneshot(form_post("/api/notifications/dispatch", ""))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(report["checked"], 1);
    assert_eq!(report["sent"], 1);

    let report = extract_json(
        app.clone()
            .oneshot(form_post("/api/notifications/dispatch", ""))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(report["sent"], 0);
    assert_eq!(report["skipped_recent"], 1);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/notifications/test",
            json!({ "email": "nobody" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_csv_import_skips_duplicates_on_second_upload() {
    let (app, _pool) = create_test_app().await;
    let id = add_vehicle(&app, "Importer").await;
    let csv = "Date,Mileage,Description,Cost\n01/15/2023,12000,Oil change,45.00\n06/20/2023,17.5k,Tire rotation,$25\n";

    let response = app
        .clone()
        .oneshot(multipart_upload(Some(id), "history.csv", csv, "skip"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = extract_json(response).await;
    assert_eq!(report["total_rows"], 2);
    assert_eq!(report["imported_rows"], 2);

    let report = extract_json(
        app.clone()
            .oneshot(multipart_upload(Some(id), "history.csv", csv, "skip"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(report["imported_rows"], 0);
    assert_eq!(report["duplicate_rows"], 2);
    assert_eq!(report["duplicate_details"][0]["action"], "skipped");

    let report = extract_json(
        app.clone()
            .oneshot(multipart_upload(Some(id), "history.csv", csv, "replace"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(report["replaced_rows"], 2);

    let records = extract_json(
        app.clone()
            .oneshot(get(&format!("/api/maintenance?vehicle_id={id}")))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(records.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_csv_import_rejects_bad_uploads() {
    let (app, _pool) = create_test_app().await;
    let id = add_vehicle(&app, "Rejects").await;

    let response = app
        .clone()
        .oneshot(multipart_upload(None, "history.csv", "date,description\n", "skip"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = extract_json(response).await;
    assert_eq!(json["error"]["message"], "Please select a vehicle");

    let response = app
        .clone()
        .oneshot(multipart_upload(Some(id), "history.txt", "date,description\n", "skip"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(multipart_upload(Some(id), "history.csv", "a,b\n1,2\n", "merge"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(multipart_upload(
            Some(id),
            "history.csv",
            b"Date,Description\n01/02/2023,Vidange \xe9t\xe9\n",
            "skip",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = extract_json(response).await;
    assert_eq!(json["error"]["message"], "The file is not valid UTF-8 text");
}

#[tokio::test]
async fn test_csv_export_headers() {
    let (app, _pool) = create_test_app().await;
    let id = add_vehicle(&app, "Exported").await;

    let response = app
        .clone()
        .oneshot(get(&format!("/api/export/maintenance?vehicle_id={id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"maintenance_"));
    assert!(disposition.ends_with(".csv\""));
    assert!(body_text(response).await.starts_with("id,vehicle_name,date,mileage"));

    let vehicles = body_text(app.oneshot(get("/api/export/vehicles")).await.unwrap()).await;
    let mut lines = vehicles.lines();
    assert_eq!(lines.next(), Some("id,name,year,make,model,vin"));
    assert!(lines.next().unwrap().contains("Exported"));
}

#[tokio::test]
async fn test_summary_counts() {
    let (app, _pool) = create_test_app().await;
    let id = add_vehicle(&app, "Counted").await;
    app.clone()
        .oneshot(form_post(
            "/maintenance",
            &format!("vehicle_id={id}&date=2024-02-01&mileage=1000&description=Wipers&cost=20"),
        ))
        .await
        .unwrap();

    let json = extract_json(app.oneshot(get("/api/summary")).await.unwrap()).await;
    assert_eq!(json["total_vehicles"], 1);
    assert_eq!(json["total_records"], 1);
    assert_eq!(json["total_cost"], 20.0);
}

#[tokio::test]
async fn test_missing_vehicle_is_not_found() {
    let (app, _pool) = create_test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/vehicles/999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/vehicles/999/edit")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Vehicle 999 not found"));
}

struct UnreachableRelay;

#[async_trait::async_trait]
impl vmt_common::notify::Mailer for UnreachableRelay {
    async fn send(&self, _email: &vmt_common::notify::OutgoingEmail) -> vmt_common::Result<()> {
        Err(vmt_common::Error::Internal("relay unreachable".to_string()))
    }

    fn name(&self) -> &'static str {
        "unreachable"
    }
}

#[tokio::test]
async fn test_email_goes_to_outbox() {
    let outbox = tempfile::tempdir().unwrap();
    let pool = init_memory_database().await.unwrap();
    let mailer = Arc::new(vmt_common::notify::OutboxMailer::new(outbox.path().to_path_buf()));
    let app = build_router(AppState::new(pool, TomlConfig::default(), mailer));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/notifications/test",
            json!({ "email": "me@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let written = std::fs::read_dir(outbox.path()).unwrap().count();
    assert_eq!(written, 1);
}

#[tokio::test]
async fn test_email_transport_failure_is_server_error() {
    let pool = init_memory_database().await.unwrap();
    let app = build_router(AppState::new(
        pool,
        TomlConfig::default(),
        Arc::new(UnreachableRelay),
    ));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/notifications/test",
            json!({ "email": "me@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = extract_json(response).await;
    assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
}
