use std::sync::Arc;

use actix_web::{web, HttpResponse};
use bson::{doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::Client;

use crate::errors::ApiError;
use crate::models::package::TourPackage;
use crate::services::package_service;

/*
    GET /api/packages (public)
*/
pub async fn get_packages(data: web::Data<Arc<Client>>) -> Result<HttpResponse, ApiError> {
    let client = data.into_inner();

    let cursor = package_service::packages(&client)
        .find(doc! {})
        .sort(doc! { "created_at": -1 })
        .limit(100)
        .await?;
    let packages: Vec<TourPackage> = cursor.try_collect().await?;

    Ok(HttpResponse::Ok().json(packages))
}

/*
    GET /api/packages/{id} (public)
*/
pub async fn get_package_by_id(
    data: web::Data<Arc<Client>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let client = data.into_inner();
    let id = ObjectId::parse_str(path.into_inner().as_str())
        .map_err(|_| ApiError::validation("Invalid package id", vec!["id".to_string()]))?;

    let package = package_service::find_package(&client, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Package"))?;

    Ok(HttpResponse::Ok().json(package))
}
