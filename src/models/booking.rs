use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

use crate::models::package::{PackageSummary, Price, TourPackage};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Contacted,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Contacted => "contacted",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    Single,
    #[default]
    Double,
    Triple,
    Family,
    Suite,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CustomerInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: Option<Address>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct NumberOfTravelers {
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub infants: u32,
}

impl NumberOfTravelers {
    /// Saturating so hostile counts can never panic the total.
    pub fn total(&self) -> u32 {
        self.adults
            .saturating_add(self.children)
            .saturating_add(self.infants)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BookingDetails {
    #[serde(default)]
    pub start_date: Option<DateTime>,
    #[serde(default)]
    pub end_date: Option<DateTime>,
    pub number_of_travelers: NumberOfTravelers,
    #[serde(default)]
    pub room_type: RoomType,
    #[serde(default)]
    pub special_requests: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    pub relationship: String,
}

/// One append-only audit entry. Written exclusively by the status-update
/// operation; never edited or removed afterwards.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ActivityLogEntry {
    pub updated_by: String,
    pub status: BookingStatus,
    #[serde(default)]
    pub note: Option<String>,
    pub date: DateTime,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Booking {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub package_id: ObjectId,
    // Snapshotted at creation so later package edits never rewrite history.
    pub package_title: String,
    pub package_price: Price,
    pub customer_info: CustomerInfo,
    pub booking_details: BookingDetails,
    #[serde(default)]
    pub emergency_contact: Option<EmergencyContact>,
    pub estimated_total: f64,
    pub booking_status: BookingStatus,
    pub booking_reference: String,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub admin_activity_logs: Vec<ActivityLogEntry>,
    #[serde(default)]
    pub contacted_at: Option<DateTime>,
    #[serde(default)]
    pub contacted_by: Option<String>,
    #[serde(default)]
    pub follow_up_date: Option<DateTime>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

impl Booking {
    /// Build a new pending booking from a customer request and the resolved
    /// package. Title and price are copied onto the booking so the total is a
    /// function of the price as it was at creation time.
    pub fn from_request(
        package: &TourPackage,
        package_id: ObjectId,
        customer_info: CustomerInfo,
        booking_details: BookingDetails,
        emergency_contact: Option<EmergencyContact>,
        booking_reference: String,
        now: DateTime,
    ) -> Self {
        let total_travelers = booking_details.number_of_travelers.total();
        let estimated_total = package.price.amount * total_travelers as f64;

        let mut customer_info = customer_info;
        customer_info.email = customer_info.email.trim().to_lowercase();

        Booking {
            id: None,
            package_id,
            package_title: package.title.clone(),
            package_price: package.price.clone(),
            customer_info,
            booking_details,
            emergency_contact,
            estimated_total,
            booking_status: BookingStatus::Pending,
            booking_reference,
            admin_notes: None,
            admin_activity_logs: Vec::new(),
            contacted_at: None,
            contacted_by: None,
            follow_up_date: None,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    pub fn total_travelers(&self) -> u32 {
        self.booking_details.number_of_travelers.total()
    }

    pub fn customer_full_name(&self) -> String {
        format!(
            "{} {}",
            self.customer_info.first_name, self.customer_info.last_name
        )
    }

    /// Trip length in whole days, rounded up. None unless both dates are set.
    pub fn duration_days(&self) -> Option<i64> {
        let start = self.booking_details.start_date?.to_chrono();
        let end = self.booking_details.end_date?.to_chrono();
        let seconds = (end - start).num_seconds();
        Some((seconds as f64 / 86_400.0).ceil() as i64)
    }

    pub fn needs_follow_up(&self, now: chrono::DateTime<Utc>) -> bool {
        if self.booking_status == BookingStatus::Pending {
            return true;
        }
        self.follow_up_date
            .map(|date| date.to_chrono() < now)
            .unwrap_or(false)
    }

    /// Apply an admin status update. Appends exactly one activity-log entry
    /// per call, whether or not the status actually changed.
    pub fn apply_status_update(
        &mut self,
        new_status: Option<BookingStatus>,
        admin_notes: Option<String>,
        follow_up_date: Option<DateTime>,
        note: Option<String>,
        actor: &str,
        now: DateTime,
    ) {
        if let Some(status) = new_status {
            self.booking_status = status;
            if status == BookingStatus::Contacted {
                self.contacted_at = Some(now);
                self.contacted_by = Some(actor.to_string());
            }
        }

        // An empty string is a deliberate overwrite, not an omission.
        if let Some(notes) = admin_notes {
            self.admin_notes = Some(notes);
        }

        if let Some(date) = follow_up_date {
            self.follow_up_date = Some(date);
        }

        self.admin_activity_logs.push(ActivityLogEntry {
            updated_by: actor.to_string(),
            status: self.booking_status,
            note,
            date: now,
        });
        self.updated_at = Some(now);
    }

    /// Cancel the booking. Returns false when it is already cancelled, in
    /// which case nothing is touched. Does not write the activity log; only
    /// the status-update path does.
    pub fn cancel(&mut self, reason: Option<String>, now: DateTime) -> bool {
        if self.booking_status == BookingStatus::Cancelled {
            return false;
        }
        self.booking_status = BookingStatus::Cancelled;
        self.admin_notes = Some(reason.unwrap_or_else(|| "Booking cancelled".to_string()));
        self.updated_at = Some(now);
        true
    }

    pub fn populated(self, package: Option<PackageSummary>) -> PopulatedBooking {
        PopulatedBooking::new(self, package)
    }
}

/// Customer-facing creation payload. Dates arrive as RFC 3339 strings and
/// are converted to BSON datetimes at this boundary.
#[derive(Debug, Deserialize, Clone)]
pub struct BookingRequest {
    pub package_id: String,
    pub customer_info: CustomerInfo,
    pub booking_details: BookingDetailsInput,
    #[serde(default)]
    pub emergency_contact: Option<EmergencyContact>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingDetailsInput {
    #[serde(default)]
    pub start_date: Option<chrono::DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<chrono::DateTime<Utc>>,
    pub number_of_travelers: NumberOfTravelers,
    #[serde(default)]
    pub room_type: RoomType,
    #[serde(default)]
    pub special_requests: Option<String>,
}

impl BookingDetailsInput {
    pub fn into_details(self) -> BookingDetails {
        BookingDetails {
            start_date: self.start_date.map(DateTime::from_chrono),
            end_date: self.end_date.map(DateTime::from_chrono),
            number_of_travelers: self.number_of_travelers,
            room_type: self.room_type,
            special_requests: self.special_requests,
        }
    }
}

/// The admin-editable subset of a booking. Generic updates decode into this
/// before anything touches the collection, so an unknown field or a value the
/// document model cannot read back is rejected instead of stored.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct BookingUpdateRequest {
    #[serde(default)]
    pub customer_info: Option<CustomerInfo>,
    #[serde(default)]
    pub booking_details: Option<BookingDetailsInput>,
    #[serde(default)]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default)]
    pub booking_status: Option<BookingStatus>,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub follow_up_date: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StatusUpdateRequest {
    #[serde(default)]
    pub booking_status: Option<BookingStatus>,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub contacted_by: Option<String>,
    #[serde(default)]
    pub follow_up_date: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// A booking decorated for display: the package summary relation plus the
/// computed-on-read fields. Nothing here is persisted.
#[derive(Debug, Serialize, Clone)]
pub struct PopulatedBooking {
    #[serde(flatten)]
    pub booking: Booking,
    pub package: Option<PackageSummary>,
    pub total_travelers: u32,
    pub customer_full_name: String,
    pub duration: Option<i64>,
    pub needs_follow_up: bool,
}

impl PopulatedBooking {
    pub fn new(booking: Booking, package: Option<PackageSummary>) -> Self {
        let total_travelers = booking.total_travelers();
        let customer_full_name = booking.customer_full_name();
        let duration = booking.duration_days();
        let needs_follow_up = booking.needs_follow_up(Utc::now());

        PopulatedBooking {
            booking,
            package,
            total_travelers,
            customer_full_name,
            duration,
            needs_follow_up,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_package(amount: f64) -> TourPackage {
        serde_json::from_value(serde_json::json!({
            "title": "Serengeti Safari",
            "price": { "amount": amount, "currency": "NGN" },
            "category": "Safari",
            "location": "Tanzania",
        }))
        .unwrap()
    }

    fn sample_booking(adults: u32, children: u32, infants: u32) -> Booking {
        let package = sample_package(100_000.0);
        Booking::from_request(
            &package,
            ObjectId::new(),
            CustomerInfo {
                first_name: "Ada".to_string(),
                last_name: "Obi".to_string(),
                email: "  Ada.Obi@Example.COM ".to_string(),
                phone: "+2348012345678".to_string(),
                address: None,
            },
            BookingDetails {
                start_date: None,
                end_date: None,
                number_of_travelers: NumberOfTravelers {
                    adults,
                    children,
                    infants,
                },
                room_type: RoomType::default(),
                special_requests: None,
            },
            None,
            "BKTEST01".to_string(),
            DateTime::now(),
        )
    }

    #[test]
    fn creation_derives_total_and_snapshots_price() {
        let booking = sample_booking(2, 1, 0);
        assert_eq!(booking.estimated_total, 300_000.0);
        assert_eq!(booking.booking_status, BookingStatus::Pending);
        assert_eq!(booking.package_title, "Serengeti Safari");
        assert!(booking.admin_activity_logs.is_empty());
    }

    #[test]
    fn total_is_fixed_against_later_package_edits() {
        let mut package = sample_package(100_000.0);
        let booking = Booking::from_request(
            &package,
            ObjectId::new(),
            sample_booking(1, 0, 0).customer_info,
            sample_booking(1, 0, 0).booking_details,
            None,
            "BKTEST02".to_string(),
            DateTime::now(),
        );

        package.price = Price::new(999_999.0, "NGN");
        assert_eq!(booking.estimated_total, 100_000.0);
        assert_eq!(booking.package_price, Price::new(100_000.0, "NGN"));
    }

    #[test]
    fn creation_normalizes_customer_email() {
        let booking = sample_booking(1, 0, 0);
        assert_eq!(booking.customer_info.email, "ada.obi@example.com");
    }

    #[test]
    fn status_update_appends_one_log_entry_per_call() {
        let mut booking = sample_booking(1, 0, 0);
        let now = DateTime::now();

        booking.apply_status_update(
            Some(BookingStatus::Contacted),
            None,
            None,
            Some("called customer".to_string()),
            "Jane",
            now,
        );
        booking.apply_status_update(Some(BookingStatus::Confirmed), None, None, None, "Jane", now);
        // No status given: the log still records the status in effect.
        booking.apply_status_update(None, Some("deposit paid".to_string()), None, None, "Tunde", now);

        assert_eq!(booking.admin_activity_logs.len(), 3);
        assert_eq!(booking.admin_activity_logs[0].status, BookingStatus::Contacted);
        assert_eq!(booking.admin_activity_logs[1].status, BookingStatus::Confirmed);
        assert_eq!(booking.admin_activity_logs[2].status, BookingStatus::Confirmed);
        assert_eq!(booking.admin_activity_logs[2].updated_by, "Tunde");
        assert_eq!(booking.booking_status, BookingStatus::Confirmed);
    }

    #[test]
    fn contacted_status_records_actor_and_time() {
        let mut booking = sample_booking(1, 0, 0);
        let now = DateTime::now();
        booking.apply_status_update(Some(BookingStatus::Contacted), None, None, None, "Jane", now);

        assert_eq!(booking.contacted_at, Some(now));
        assert_eq!(booking.contacted_by.as_deref(), Some("Jane"));
    }

    #[test]
    fn empty_admin_notes_still_overwrite() {
        let mut booking = sample_booking(1, 0, 0);
        let now = DateTime::now();
        booking.apply_status_update(None, Some("old note".to_string()), None, None, "Jane", now);
        booking.apply_status_update(None, Some(String::new()), None, None, "Jane", now);

        assert_eq!(booking.admin_notes.as_deref(), Some(""));
    }

    #[test]
    fn needs_follow_up_truth_table() {
        let now = Utc::now();
        let mut booking = sample_booking(1, 0, 0);

        // Pending always needs attention.
        assert!(booking.needs_follow_up(now));

        booking.booking_status = BookingStatus::Confirmed;
        assert!(!booking.needs_follow_up(now));

        // Past follow-up date flags any status.
        booking.follow_up_date = Some(DateTime::from_millis(
            now.timestamp_millis() - 86_400_000,
        ));
        assert!(booking.needs_follow_up(now));

        // Future follow-up date does not.
        booking.follow_up_date = Some(DateTime::from_millis(
            now.timestamp_millis() + 86_400_000,
        ));
        assert!(!booking.needs_follow_up(now));
    }

    #[test]
    fn cancel_is_guarded_against_double_cancel() {
        let mut booking = sample_booking(1, 0, 0);
        let now = DateTime::now();

        assert!(booking.cancel(Some("customer request".to_string()), now));
        assert_eq!(booking.booking_status, BookingStatus::Cancelled);
        assert_eq!(booking.admin_notes.as_deref(), Some("customer request"));
        assert!(booking.admin_activity_logs.is_empty());

        assert!(!booking.cancel(Some("again".to_string()), now));
        assert_eq!(booking.admin_notes.as_deref(), Some("customer request"));
    }

    #[test]
    fn cancel_without_reason_uses_default_note() {
        let mut booking = sample_booking(1, 0, 0);
        assert!(booking.cancel(None, DateTime::now()));
        assert_eq!(booking.admin_notes.as_deref(), Some("Booking cancelled"));
    }

    #[test]
    fn duration_rounds_partial_days_up() {
        let mut booking = sample_booking(1, 0, 0);
        assert_eq!(booking.duration_days(), None);

        let start = DateTime::from_millis(0);
        let end = DateTime::from_millis(86_400_000 * 3 + 43_200_000); // 3.5 days
        booking.booking_details.start_date = Some(start);
        booking.booking_details.end_date = Some(end);
        assert_eq!(booking.duration_days(), Some(4));
    }

    #[test]
    fn full_name_and_traveler_count() {
        let booking = sample_booking(2, 1, 1);
        assert_eq!(booking.customer_full_name(), "Ada Obi");
        assert_eq!(booking.total_travelers(), 4);
    }

    #[test]
    fn traveler_totals_saturate_instead_of_overflowing() {
        let booking = sample_booking(u32::MAX, 5, 3);
        assert_eq!(booking.total_travelers(), u32::MAX);
    }
}
