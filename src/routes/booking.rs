use std::collections::HashSet;
use std::sync::Arc;

use actix_web::{web, HttpResponse};
use bson::{doc, oid::ObjectId, Document};
use futures::TryStreamExt;
use mongodb::bson::DateTime;
use mongodb::options::ReturnDocument;
use mongodb::{Client, Collection};
use serde_json::json;

use crate::db::mongo::DB_NAME;
use crate::errors::ApiError;
use crate::middleware::auth::Claims;
use crate::models::booking::{
    Booking, BookingRequest, CancelRequest, PopulatedBooking, StatusUpdateRequest,
};
use crate::services::booking_service::{
    self, ListQuery, PageQuery, StatusBreakdown,
};
use crate::services::package_service;

pub fn bookings(client: &Client) -> Collection<Booking> {
    client.database(DB_NAME).collection("Bookings")
}

fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw)
        .map_err(|_| ApiError::validation(format!("Invalid {} id", what), vec!["id".to_string()]))
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        &*err.kind,
        mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(write_err))
            if write_err.code == 11000
    )
}

async fn populate_one(
    client: &Client,
    booking: Booking,
) -> Result<PopulatedBooking, mongodb::error::Error> {
    let summary = package_service::find_summary(client, booking.package_id).await?;
    Ok(booking.populated(summary))
}

/// Decorate a page of bookings with their package summaries in one query.
async fn populate_page(
    client: &Client,
    page: Vec<Booking>,
) -> Result<Vec<PopulatedBooking>, mongodb::error::Error> {
    let ids: Vec<ObjectId> = page
        .iter()
        .map(|b| b.package_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let summaries = package_service::summaries_for(client, &ids).await?;

    Ok(page
        .into_iter()
        .map(|booking| {
            let summary = summaries.get(&booking.package_id).cloned();
            booking.populated(summary)
        })
        .collect())
}

/*
    POST /api/bookings (public)
*/
pub async fn create_booking(
    data: web::Data<Arc<Client>>,
    input: web::Json<BookingRequest>,
) -> Result<HttpResponse, ApiError> {
    let client = data.into_inner();
    let input = input.into_inner();

    booking_service::validate_booking_request(&input)?;

    // Resolve the package before any write; no package, no booking.
    let package_id = parse_object_id(&input.package_id, "package")?;
    let package = package_service::find_package(&client, package_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Package"))?;
    package.price.validate()?;

    let collection = bookings(&client);
    let details = input.booking_details.into_details();

    let mut attempts = 0;
    loop {
        let reference = booking_service::generate_booking_reference();
        let mut booking = Booking::from_request(
            &package,
            package_id,
            input.customer_info.clone(),
            details.clone(),
            input.emergency_contact.clone(),
            reference,
            DateTime::now(),
        );

        match collection.insert_one(&booking).await {
            Ok(result) => {
                booking.id = result.inserted_id.as_object_id();
                return Ok(HttpResponse::Created().json(booking.populated(Some(package.summary()))));
            }
            // Duplicate reference: regenerate and retry.
            Err(err) if is_duplicate_key(&err) && attempts < 3 => {
                attempts += 1;
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/*
    GET /api/bookings?page&limit&status&search&needs_follow_up&sort_by&sort_order (admin)
*/
pub async fn list_bookings(
    data: web::Data<Arc<Client>>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let client = data.into_inner();
    let query = query.into_inner();
    let collection = bookings(&client);

    let filter = booking_service::build_list_filter(&query, DateTime::now());
    let sort = booking_service::build_sort(&query);

    let total = collection.count_documents(filter.clone()).await?;
    let cursor = collection
        .find(filter)
        .sort(sort)
        .skip(query.skip())
        .limit(query.limit())
        .await?;
    let page: Vec<Booking> = cursor.try_collect().await?;
    let data_page = populate_page(&client, page).await?;

    // Status breakdown over the whole collection, not the filtered page.
    let stats_docs: Vec<Document> = collection
        .aggregate(booking_service::status_breakdown_pipeline())
        .await?
        .try_collect()
        .await?;
    let stats: Vec<StatusBreakdown> = stats_docs
        .iter()
        .map(StatusBreakdown::from_group_doc)
        .collect();

    let limit = query.limit() as u64;
    let total_pages = total.div_ceil(limit);

    Ok(HttpResponse::Ok().json(json!({
        "data": data_page,
        "pagination": {
            "page": query.page(),
            "limit": query.limit(),
            "total": total,
            "total_pages": total_pages,
        },
        "stats": stats,
    })))
}

/*
    GET /api/bookings/{id} (admin)
*/
pub async fn get_booking(
    data: web::Data<Arc<Client>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let client = data.into_inner();
    let id = parse_object_id(&path.into_inner(), "booking")?;

    let booking = bookings(&client)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| ApiError::not_found("Booking"))?;

    Ok(HttpResponse::Ok().json(populate_one(&client, booking).await?))
}

/*
    GET /api/bookings/reference/{reference} (public customer lookup)
*/
pub async fn get_booking_by_reference(
    data: web::Data<Arc<Client>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let client = data.into_inner();
    let reference = path.into_inner().trim().to_uppercase();

    let booking = bookings(&client)
        .find_one(doc! { "booking_reference": &reference })
        .await?
        .ok_or_else(|| ApiError::not_found("Booking"))?;

    Ok(HttpResponse::Ok().json(populate_one(&client, booking).await?))
}

/*
    GET /api/bookings/customer/{email}?page&limit (public)
*/
pub async fn list_bookings_by_customer(
    data: web::Data<Arc<Client>>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let client = data.into_inner();
    let email = path.into_inner().trim().to_lowercase();
    let query = query.into_inner();
    let collection = bookings(&client);

    let filter = doc! { "customer_info.email": &email };
    let total = collection.count_documents(filter.clone()).await?;
    let cursor = collection
        .find(filter)
        .sort(doc! { "created_at": -1 })
        .skip(query.skip())
        .limit(query.limit())
        .await?;
    let page: Vec<Booking> = cursor.try_collect().await?;
    let data_page = populate_page(&client, page).await?;

    let limit = query.limit() as u64;

    Ok(HttpResponse::Ok().json(json!({
        "data": data_page,
        "pagination": {
            "page": query.page(),
            "limit": query.limit(),
            "total": total,
            "total_pages": total.div_ceil(limit),
        },
    })))
}

/*
    PUT /api/bookings/{id} (admin) — generic field update
*/
pub async fn update_booking(
    data: web::Data<Arc<Client>>,
    path: web::Path<String>,
    input: web::Json<serde_json::Value>,
) -> Result<HttpResponse, ApiError> {
    let client = data.into_inner();
    let id = parse_object_id(&path.into_inner(), "booking")?;

    // Decoding into the editable subset keeps immutable fields and ill-typed
    // values out of the collection entirely.
    let update_doc = booking_service::build_update_document(input.into_inner())?;

    let updated = bookings(&client)
        .find_one_and_update(doc! { "_id": id }, doc! { "$set": update_doc })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| ApiError::not_found("Booking"))?;

    Ok(HttpResponse::Ok().json(populate_one(&client, updated).await?))
}

/*
    PUT /api/bookings/{id}/status (admin) — the only writer of the activity log
*/
pub async fn update_booking_status(
    data: web::Data<Arc<Client>>,
    path: web::Path<String>,
    input: web::Json<StatusUpdateRequest>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, ApiError> {
    let client = data.into_inner();
    let id = parse_object_id(&path.into_inner(), "booking")?;
    let input = input.into_inner();

    booking_service::validate_status_update(&input)?;
    let follow_up_date = input
        .follow_up_date
        .as_deref()
        .map(booking_service::parse_follow_up_date)
        .transpose()?;

    let collection = bookings(&client);
    let mut booking = collection
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| ApiError::not_found("Booking"))?;

    // Actor identity is explicit: the request's contacted_by, else the
    // authenticated admin from the token.
    let actor = input
        .contacted_by
        .clone()
        .unwrap_or_else(|| claims.sub.clone());

    booking.apply_status_update(
        input.booking_status,
        input.admin_notes,
        follow_up_date,
        input.note,
        &actor,
        DateTime::now(),
    );

    collection.replace_one(doc! { "_id": id }, &booking).await?;

    Ok(HttpResponse::Ok().json(populate_one(&client, booking).await?))
}

/*
    PATCH /api/bookings/{id}/cancel (public)
*/
pub async fn cancel_booking(
    data: web::Data<Arc<Client>>,
    path: web::Path<String>,
    input: Option<web::Json<CancelRequest>>,
) -> Result<HttpResponse, ApiError> {
    let client = data.into_inner();
    let id = parse_object_id(&path.into_inner(), "booking")?;
    let reason = input.and_then(|json| json.into_inner().reason);

    let collection = bookings(&client);
    let mut booking = collection
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| ApiError::not_found("Booking"))?;

    if !booking.cancel(reason, DateTime::now()) {
        return Err(ApiError::conflict("Booking is already cancelled"));
    }

    collection.replace_one(doc! { "_id": id }, &booking).await?;

    Ok(HttpResponse::Ok().json(populate_one(&client, booking).await?))
}

/*
    DELETE /api/bookings/{id} (admin) — hard delete
*/
pub async fn delete_booking(
    data: web::Data<Arc<Client>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let client = data.into_inner();
    let id = parse_object_id(&path.into_inner(), "booking")?;

    let result = bookings(&client).delete_one(doc! { "_id": id }).await?;
    booking_service::ensure_deleted(result.deleted_count)?;

    Ok(HttpResponse::Ok().json(json!({ "deleted": true })))
}
