use std::collections::HashMap;

use bson::{doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::{Client, Collection};

use crate::db::mongo::DB_NAME;
use crate::models::package::{PackageSummary, TourPackage};

/// Read-only package lookup. The booking core never writes this collection.
pub fn packages(client: &Client) -> Collection<TourPackage> {
    client.database(DB_NAME).collection("Packages")
}

pub async fn find_package(
    client: &Client,
    id: ObjectId,
) -> Result<Option<TourPackage>, mongodb::error::Error> {
    packages(client).find_one(doc! { "_id": id }).await
}

pub async fn find_summary(
    client: &Client,
    id: ObjectId,
) -> Result<Option<PackageSummary>, mongodb::error::Error> {
    Ok(find_package(client, id).await?.map(|pkg| pkg.summary()))
}

/// Batch lookup used when populating a page of bookings: one `$in` query
/// instead of one find per booking.
pub async fn summaries_for(
    client: &Client,
    ids: &[ObjectId],
) -> Result<HashMap<ObjectId, PackageSummary>, mongodb::error::Error> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let cursor = packages(client)
        .find(doc! { "_id": { "$in": ids.to_vec() } })
        .await?;
    let found: Vec<TourPackage> = cursor.try_collect().await?;

    Ok(found
        .into_iter()
        .filter_map(|pkg| pkg.id.map(|id| (id, pkg.summary())))
        .collect())
}
