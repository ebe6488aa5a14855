use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use zenith_travels_api::middleware::{auth::AuthMiddleware, role_auth::RequireRole};
use zenith_travels_api::{db, routes};

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    println!("Application starting...");

    env_logger::init_from_env(Env::default().default_filter_or("info"));

    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    }

    let host = std::env::var("HOST").unwrap_or_else(|_| HOST.to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| PORT.to_string())
        .parse()
        .unwrap_or(PORT);
    println!("Attempting to bind to {}:{}", host, port);

    let mongo_uri = std::env::var("MONGODB_URI").expect("MONGODB_URI must be set");
    let client = db::mongo::create_mongo_client(&mongo_uri).await;

    if let Err(err) = db::mongo::ensure_indexes(&client).await {
        eprintln!("WARNING: Failed to create indexes: {}", err);
    }

    println!("Starting HTTP server...");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .route("/health", web::get().to(|| async { "OK" }))
            .app_data(web::Data::new(client.clone()))
            .service(
                web::scope("/api")
                    .service(
                        web::scope("/auth")
                            .route("/signin", web::post().to(routes::auth::signin)),
                    )
                    .service(
                        web::scope("/packages")
                            .route("", web::get().to(routes::package::get_packages))
                            .route("/{id}", web::get().to(routes::package::get_package_by_id)),
                    )
                    // Public booking routes
                    .service(
                        web::scope("/bookings")
                            .route("", web::post().to(routes::booking::create_booking))
                            .route(
                                "/reference/{reference}",
                                web::get().to(routes::booking::get_booking_by_reference),
                            )
                            .route(
                                "/customer/{email}",
                                web::get().to(routes::booking::list_bookings_by_customer),
                            )
                            .route(
                                "/{id}/cancel",
                                web::patch().to(routes::booking::cancel_booking),
                            ),
                    )
                    // Back-office booking routes
                    .service(
                        web::scope("/admin")
                            .wrap(RequireRole::admin())
                            .wrap(AuthMiddleware)
                            .service(
                                web::scope("/bookings")
                                    .route("", web::get().to(routes::booking::list_bookings))
                                    .route(
                                        "/{id}/status",
                                        web::put().to(routes::booking::update_booking_status),
                                    )
                                    .route("/{id}", web::get().to(routes::booking::get_booking))
                                    .route("/{id}", web::put().to(routes::booking::update_booking))
                                    .route(
                                        "/{id}",
                                        web::delete().to(routes::booking::delete_booking),
                                    ),
                            ),
                    ),
            )
    })
    .bind((host, port))?
    .run()
    .await
}
