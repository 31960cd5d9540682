use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{CustomerProfile, Ground, TeamProfile};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    /// Statuses that count as revenue.
    pub fn is_billable(self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Completed)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: String,
    pub customer: Option<String>,
    pub customer_name: Option<String>,
    pub team: Option<String>,
    pub booking_date: NaiveDate,
    /// "HH:MM"
    pub booking_time: String,
    /// Hours.
    pub booking_duration: f64,
    pub booking_price: f64,
    pub booking_status: BookingStatus,
    pub payment_method: String,
    pub payment_status: String,
    pub payment_date: Option<DateTime<Utc>>,
    pub ground: String,
    #[serde(default)]
    pub team_required: bool,
    #[serde(default)]
    pub with_lights: bool,
    /// Payment transaction id.
    pub tid: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Booking with customer, ground and team resolved.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub customer_details: Option<CustomerProfile>,
    pub ground_details: Option<Ground>,
    pub team_details: Option<TeamProfile>,
}
