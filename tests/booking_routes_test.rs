mod common;

use actix_web::{test, web, App, HttpResponse};
use serde_json::json;
use serial_test::serial;

use zenith_travels_api::errors::ApiError;
use zenith_travels_api::models::booking::BookingRequest;
use zenith_travels_api::services::booking_service::{self, ListQuery};

use common::TestApp;

#[actix_rt::test]
#[serial]
async fn test_health_check() {
    let app = test::init_service(TestApp::create_app()).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}

#[actix_rt::test]
#[serial]
async fn test_create_booking_returns_reference_and_pending_status() {
    let app = test::init_service(TestApp::create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/bookings")
        .set_json(&json!({
            "package_id": "65f0a1b2c3d4e5f6a7b8c9d0",
            "customer_info": {
                "first_name": "Ada",
                "last_name": "Obi",
                "email": "ada@example.com",
                "phone": "+2348012345678",
            },
            "booking_details": { "number_of_travelers": { "adults": 2, "children": 1 } },
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["booking_reference"].as_str().unwrap().starts_with("BK"));
    assert_eq!(body["booking_status"], "pending");
}

#[actix_rt::test]
#[serial]
async fn test_unknown_reference_is_not_found() {
    let app = test::init_service(TestApp::create_app()).await;

    let req = test::TestRequest::get()
        .uri("/api/bookings/reference/BKDOESNOTEXIST")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Booking not found");
}

#[actix_rt::test]
#[serial]
async fn test_customer_listing_uses_the_page_envelope() {
    let app = test::init_service(TestApp::create_app()).await;

    let req = test::TestRequest::get()
        .uri("/api/bookings/customer/ada@example.com")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["data"].is_array());
    assert_eq!(body["pagination"]["page"], 1);
}

#[actix_rt::test]
#[serial]
async fn test_double_cancel_conflicts() {
    let app = test::init_service(TestApp::create_app()).await;

    let req = test::TestRequest::patch()
        .uri("/api/bookings/65f0a1b2c3d4e5f6a7b8c9d0/cancel")
        .set_json(&json!({ "reason": "customer request" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
}

#[actix_rt::test]
#[serial]
async fn test_admin_listing_requires_auth() {
    let app = test::init_service(TestApp::create_app()).await;

    let req = test::TestRequest::get().uri("/api/admin/bookings").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

// The handlers below run the real validation and query-building code so the
// HTTP-facing contracts are exercised without a live database.

async fn validate_only(input: web::Json<BookingRequest>) -> Result<HttpResponse, ApiError> {
    booking_service::validate_booking_request(&input)?;
    Ok(HttpResponse::Ok().json(json!({ "valid": true })))
}

async fn update_preview(input: web::Json<serde_json::Value>) -> Result<HttpResponse, ApiError> {
    let update = booking_service::build_update_document(input.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({ "set": update })))
}

async fn delete_result(path: web::Path<u64>) -> Result<HttpResponse, ApiError> {
    booking_service::ensure_deleted(path.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({ "deleted": true })))
}

async fn echo_filter(query: web::Query<ListQuery>) -> HttpResponse {
    let filter = booking_service::build_list_filter(&query, mongodb::bson::DateTime::now());
    HttpResponse::Ok().json(json!({
        "filter": filter,
        "skip": query.skip(),
        "limit": query.limit(),
    }))
}

#[actix_rt::test]
#[serial]
async fn test_validation_failure_reports_field_detail() {
    let app = test::init_service(
        App::new().route("/bookings", web::post().to(validate_only)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/bookings")
        .set_json(&json!({
            "package_id": "65f0a1b2c3d4e5f6a7b8c9d0",
            "customer_info": {
                "first_name": "Ada",
                "last_name": "Obi",
                "email": "not-an-email",
                "phone": "+2348012345678",
            },
            "booking_details": { "number_of_travelers": { "adults": 0 } },
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Validation failed");
    let fields = body["fields"].as_array().unwrap();
    assert!(fields.contains(&json!("customer_info.email")));
    assert!(fields.contains(&json!("booking_details.number_of_travelers.adults")));
}

#[actix_rt::test]
#[serial]
async fn test_update_with_bad_status_is_rejected_before_any_write() {
    let app = test::init_service(
        App::new().route("/bookings/{id}", web::put().to(update_preview)),
    )
    .await;

    // A status value the document model cannot read back must never persist;
    // it would break every later read of that record.
    let req = test::TestRequest::put()
        .uri("/bookings/65f0a1b2c3d4e5f6a7b8c9d0")
        .set_json(&json!({ "booking_status": "foo" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    // Same for immutable fields smuggled into the body.
    let req = test::TestRequest::put()
        .uri("/bookings/65f0a1b2c3d4e5f6a7b8c9d0")
        .set_json(&json!({ "estimated_total": "abc" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let req = test::TestRequest::put()
        .uri("/bookings/65f0a1b2c3d4e5f6a7b8c9d0")
        .set_json(&json!({ "booking_status": "confirmed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["set"]["booking_status"], "confirmed");
}

#[actix_rt::test]
#[serial]
async fn test_delete_contract() {
    let app = test::init_service(
        App::new().route("/deleted/{count}", web::delete().to(delete_result)),
    )
    .await;

    let req = test::TestRequest::delete().uri("/deleted/0").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Booking not found");

    let req = test::TestRequest::delete().uri("/deleted/1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["deleted"], true);
}

#[actix_rt::test]
#[serial]
async fn test_list_query_builds_follow_up_filter() {
    let app = test::init_service(
        App::new().route("/bookings", web::get().to(echo_filter)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/bookings?needs_follow_up=true&search=ada&page=3&limit=20")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: serde_json::Value = test::read_body_json(resp).await;
    // needs_follow_up replaces the search clause: two arms, pending first.
    let or = body["filter"]["$or"].as_array().unwrap();
    assert_eq!(or.len(), 2);
    assert_eq!(or[0]["booking_status"], "pending");
    assert_eq!(body["skip"], 40);
    assert_eq!(body["limit"], 20);
}

#[actix_rt::test]
#[serial]
async fn test_list_query_defaults() {
    let app = test::init_service(
        App::new().route("/bookings", web::get().to(echo_filter)),
    )
    .await;

    let req = test::TestRequest::get().uri("/bookings").to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = test::read_body_json(resp).await;

    assert_eq!(body["skip"], 0);
    assert_eq!(body["limit"], 10);
    assert_eq!(body["filter"], json!({}));
}
