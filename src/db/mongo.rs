use mongodb::{
    bson::doc,
    options::{ClientOptions, IndexOptions, ServerApi, ServerApiVersion},
    Client, IndexModel,
};
use std::sync::Arc;
use std::time::Duration;

use crate::models::booking::Booking;

pub const DB_NAME: &str = "Agency";

pub async fn create_mongo_client(uri: &String) -> Arc<Client> {
    println!("Connecting to MongoDB: {}", uri);

    let mut client_options = ClientOptions::parse(uri)
        .await
        .expect("MongoDB URI may be incorrect! Failed to parse.");

    // Set a reasonable timeout for operations
    client_options.connect_timeout = Some(Duration::from_secs(10));
    client_options.server_selection_timeout = Some(Duration::from_secs(10));
    client_options.max_pool_size = Some(10);
    client_options.min_pool_size = Some(1);

    // Set the server API if using MongoDB 5.0+
    let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
    client_options.server_api = Some(server_api);

    let client =
        Client::with_options(client_options).expect("Failed to create MongoDB client with options");

    match client
        .database(DB_NAME)
        .run_command(doc! { "ping": 1 })
        .await
    {
        Ok(_) => println!("Successfully connected to MongoDB and verified with ping command"),
        Err(e) => {
            eprintln!("WARNING: Connected to MongoDB but ping test failed: {}", e);
            eprintln!("The API may still work, but some functionality might be impaired");
        }
    }

    Arc::new(client)
}

/// Index bootstrap for the booking collection. The unique reference index is
/// the backstop for reference generation; the rest back the admin filters.
pub async fn ensure_indexes(client: &Client) -> Result<(), mongodb::error::Error> {
    let bookings: mongodb::Collection<Booking> = client.database(DB_NAME).collection("Bookings");

    let unique_reference = IndexModel::builder()
        .keys(doc! { "booking_reference": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();

    let models = vec![
        unique_reference,
        IndexModel::builder()
            .keys(doc! { "customer_info.email": 1 })
            .build(),
        IndexModel::builder().keys(doc! { "package_id": 1 }).build(),
        IndexModel::builder()
            .keys(doc! { "booking_status": 1 })
            .build(),
        IndexModel::builder().keys(doc! { "created_at": -1 }).build(),
        IndexModel::builder()
            .keys(doc! { "follow_up_date": 1 })
            .build(),
    ];

    for model in models {
        bookings.create_index(model).await?;
    }

    Ok(())
}
