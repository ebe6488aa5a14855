use bson::{doc, Bson, Document};
use chrono::{NaiveDate, TimeZone, Utc};
use mongodb::bson::DateTime;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;
use crate::models::booking::{
    BookingDetailsInput, BookingRequest, BookingStatus, BookingUpdateRequest, StatusUpdateRequest,
};

const MAX_SPECIAL_REQUESTS_LEN: usize = 500;
const MAX_NOTES_LEN: usize = 1000;
const MAX_TRAVELERS: u32 = 100;

/// Generate a booking reference: "BK" + base-36 millisecond timestamp +
/// 6 random alphanumerics, uppercased. Collisions are improbable; the unique
/// index on `booking_reference` is the backstop.
pub fn generate_booking_reference() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();

    format!("BK{}{}", to_base36(millis), suffix).to_uppercase()
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ascii")
}

pub fn is_valid_email(email: &str) -> bool {
    let re = regex::Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?)*$",
    );
    re.unwrap().is_match(email)
}

/// Field-level validation for the creation payload. Runs before any lookup
/// or write; a failed create leaves no booking behind.
pub fn validate_booking_request(input: &BookingRequest) -> Result<(), ApiError> {
    let mut fields = Vec::new();

    if input.customer_info.first_name.trim().is_empty() {
        fields.push("customer_info.first_name".to_string());
    }
    if input.customer_info.last_name.trim().is_empty() {
        fields.push("customer_info.last_name".to_string());
    }
    if !is_valid_email(input.customer_info.email.trim()) {
        fields.push("customer_info.email".to_string());
    }
    if input.customer_info.phone.trim().is_empty() {
        fields.push("customer_info.phone".to_string());
    }
    validate_details(&input.booking_details, &mut fields);

    if fields.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation("Validation failed", fields))
    }
}

fn validate_details(details: &BookingDetailsInput, fields: &mut Vec<String>) {
    if details.number_of_travelers.adults < 1 {
        fields.push("booking_details.number_of_travelers.adults".to_string());
    }
    if details.number_of_travelers.total() > MAX_TRAVELERS {
        fields.push("booking_details.number_of_travelers".to_string());
    }
    if let Some(requests) = &details.special_requests {
        if requests.chars().count() > MAX_SPECIAL_REQUESTS_LEN {
            fields.push("booking_details.special_requests".to_string());
        }
    }
}

pub fn validate_status_update(input: &StatusUpdateRequest) -> Result<(), ApiError> {
    let mut fields = Vec::new();

    if let Some(notes) = &input.admin_notes {
        if notes.chars().count() > MAX_NOTES_LEN {
            fields.push("admin_notes".to_string());
        }
    }
    if let Some(note) = &input.note {
        if note.chars().count() > MAX_NOTES_LEN {
            fields.push("note".to_string());
        }
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation("Validation failed", fields))
    }
}

/// Turn a generic admin update into a `$set` document. The body must decode
/// into the editable subset first, so an unknown field, an immutable field,
/// or an ill-typed value fails here with a 400 and never reaches the
/// collection where it would poison later reads.
pub fn build_update_document(body: serde_json::Value) -> Result<Document, ApiError> {
    let input: BookingUpdateRequest = serde_json::from_value(body).map_err(|err| {
        ApiError::validation(format!("Unknown or ill-typed update field: {}", err), vec![])
    })?;

    let mut fields = Vec::new();
    if let Some(info) = &input.customer_info {
        if !is_valid_email(info.email.trim()) {
            fields.push("customer_info.email".to_string());
        }
    }
    if let Some(details) = &input.booking_details {
        validate_details(details, &mut fields);
    }
    if let Some(notes) = &input.admin_notes {
        if notes.chars().count() > MAX_NOTES_LEN {
            fields.push("admin_notes".to_string());
        }
    }
    if !fields.is_empty() {
        return Err(ApiError::validation("Validation failed", fields));
    }

    let mut update = Document::new();
    if let Some(mut info) = input.customer_info {
        info.email = info.email.trim().to_lowercase();
        update.insert("customer_info", to_bson_value(&info, "customer_info")?);
    }
    if let Some(details) = input.booking_details {
        update.insert(
            "booking_details",
            to_bson_value(&details.into_details(), "booking_details")?,
        );
    }
    if let Some(contact) = input.emergency_contact {
        update.insert(
            "emergency_contact",
            to_bson_value(&contact, "emergency_contact")?,
        );
    }
    if let Some(status) = input.booking_status {
        update.insert("booking_status", status.as_str());
    }
    if let Some(notes) = input.admin_notes {
        update.insert("admin_notes", notes);
    }
    if let Some(raw) = input.follow_up_date {
        update.insert("follow_up_date", parse_follow_up_date(&raw)?);
    }

    if update.is_empty() {
        return Err(ApiError::validation("No updatable fields provided", vec![]));
    }
    update.insert("updated_at", DateTime::now());
    Ok(update)
}

fn to_bson_value<T: Serialize>(value: &T, field: &str) -> Result<Bson, ApiError> {
    bson::to_bson(value).map_err(|_| {
        ApiError::validation(
            format!("Invalid value for {}", field),
            vec![field.to_string()],
        )
    })
}

/// Hard-delete outcome: zero matched documents is a 404, not a silent no-op.
pub fn ensure_deleted(deleted_count: u64) -> Result<(), ApiError> {
    if deleted_count == 0 {
        Err(ApiError::not_found("Booking"))
    } else {
        Ok(())
    }
}

/// Accepts either a full RFC 3339 timestamp or a bare YYYY-MM-DD date.
pub fn parse_follow_up_date(raw: &str) -> Result<DateTime, ApiError> {
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Ok(DateTime::from_chrono(parsed.with_timezone(&Utc)));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let midnight = Utc
            .from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight is valid"));
        return Ok(DateTime::from_chrono(midnight));
    }
    Err(ApiError::validation(
        "Invalid follow-up date",
        vec!["follow_up_date".to_string()],
    ))
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub needs_follow_up: Option<bool>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, 100)
    }

    pub fn skip(&self) -> u64 {
        (self.page() - 1) * self.limit() as u64
    }
}

/// Plain pagination for the customer-facing listing.
#[derive(Debug, Deserialize, Clone)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl PageQuery {
    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, 100)
    }

    pub fn skip(&self) -> u64 {
        (self.page() - 1) * self.limit() as u64
    }
}

/// Build the admin list filter. Only one `$or` clause can be active: a
/// needs-follow-up request replaces the free-text search clause outright.
pub fn build_list_filter(query: &ListQuery, now: DateTime) -> Document {
    let mut filter = Document::new();

    if let Some(status) = query.status {
        filter.insert("booking_status", status.as_str());
    }

    if query.needs_follow_up == Some(true) {
        filter.insert(
            "$or",
            vec![
                doc! { "booking_status": "pending" },
                doc! { "follow_up_date": { "$lte": now } },
            ],
        );
    } else if let Some(search) = query.search.as_deref().map(str::trim) {
        if !search.is_empty() {
            let pattern = regex::escape(search);
            let clause = |field: &str| {
                let mut matcher = Document::new();
                matcher.insert(field, doc! { "$regex": &pattern, "$options": "i" });
                matcher
            };
            filter.insert(
                "$or",
                vec![
                    clause("booking_reference"),
                    clause("customer_info.first_name"),
                    clause("customer_info.last_name"),
                    clause("customer_info.email"),
                    clause("package_title"),
                ],
            );
        }
    }

    filter
}

const SORTABLE_FIELDS: &[&str] = &[
    "created_at",
    "updated_at",
    "follow_up_date",
    "estimated_total",
    "booking_status",
];

pub fn build_sort(query: &ListQuery) -> Document {
    let field = query
        .sort_by
        .as_deref()
        .filter(|f| SORTABLE_FIELDS.contains(f))
        .unwrap_or("created_at");

    let order: i32 = match query.sort_order.as_deref() {
        Some("asc") => 1,
        _ => -1,
    };

    let mut sort = Document::new();
    sort.insert(field, order);
    sort
}

/// Aggregation over the full collection: per-status count and summed
/// estimated value, shown alongside whatever page the admin is looking at.
pub fn status_breakdown_pipeline() -> Vec<Document> {
    vec![
        doc! {
            "$group": {
                "_id": "$booking_status",
                "count": { "$sum": 1 },
                "total_value": { "$sum": "$estimated_total" },
            }
        },
        doc! { "$sort": { "_id": 1 } },
    ]
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct StatusBreakdown {
    pub status: String,
    pub count: i64,
    pub total_value: f64,
}

impl StatusBreakdown {
    pub fn from_group_doc(doc: &Document) -> Self {
        StatusBreakdown {
            status: doc.get_str("_id").unwrap_or_default().to_string(),
            count: doc.get("count").map(bson_as_i64).unwrap_or(0),
            total_value: doc.get("total_value").map(bson_as_f64).unwrap_or(0.0),
        }
    }
}

fn bson_as_i64(value: &Bson) -> i64 {
    match value {
        Bson::Int32(v) => *v as i64,
        Bson::Int64(v) => *v,
        Bson::Double(v) => *v as i64,
        _ => 0,
    }
}

fn bson_as_f64(value: &Bson) -> f64 {
    match value {
        Bson::Int32(v) => *v as f64,
        Bson::Int64(v) => *v as f64,
        Bson::Double(v) => *v,
        _ => 0.0,
    }
}
