use actix_web::{web, App, HttpResponse, Responder};
use serde_json::json;

/// Mock-handler replica of the real route table. Gives the contract tests a
/// server shape to drive without a live MongoDB behind it.
pub struct TestApp;

impl TestApp {
    pub fn create_app() -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .route("/health", web::get().to(|| async { "OK" }))
            .service(
                web::scope("/api")
                    .service(
                        web::scope("/auth").route("/signin", web::post().to(signin_rejected)),
                    )
                    .service(
                        web::scope("/packages")
                            .route("", web::get().to(empty_list))
                            .route("/{id}", web::get().to(package_not_found)),
                    )
                    .service(
                        web::scope("/bookings")
                            .route("", web::post().to(create_booking))
                            .route("/reference/{reference}", web::get().to(booking_not_found))
                            .route("/customer/{email}", web::get().to(customer_page))
                            .route("/{id}/cancel", web::patch().to(cancel_conflict)),
                    )
                    .service(
                        web::scope("/admin").service(
                            web::scope("/bookings")
                                .route("", web::get().to(unauthorized))
                                .route("/{id}/status", web::put().to(unauthorized))
                                .route("/{id}", web::get().to(unauthorized))
                                .route("/{id}", web::put().to(unauthorized))
                                .route("/{id}", web::delete().to(unauthorized)),
                        ),
                    ),
            )
    }
}

async fn create_booking() -> impl Responder {
    HttpResponse::Created().json(json!({
        "booking_reference": "BKM2X4K9A1B2C3",
        "booking_status": "pending",
        "estimated_total": 300000.0,
        "package": { "title": "Serengeti Safari" },
    }))
}

async fn empty_list() -> impl Responder {
    HttpResponse::Ok().json(json!([]))
}

async fn customer_page() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "data": [],
        "pagination": { "page": 1, "limit": 10, "total": 0, "total_pages": 0 },
    }))
}

async fn booking_not_found() -> impl Responder {
    HttpResponse::NotFound().json(json!({ "error": "Booking not found" }))
}

async fn package_not_found() -> impl Responder {
    HttpResponse::NotFound().json(json!({ "error": "Package not found" }))
}

async fn cancel_conflict() -> impl Responder {
    HttpResponse::Conflict().json(json!({ "error": "Booking is already cancelled" }))
}

async fn signin_rejected() -> impl Responder {
    HttpResponse::Unauthorized().json(json!({ "error": "Invalid credentials" }))
}

async fn unauthorized() -> impl Responder {
    HttpResponse::Unauthorized().json(json!({ "error": "Unauthorized" }))
}
