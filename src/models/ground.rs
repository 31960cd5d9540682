use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ImageRef;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Ground {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub city: String,
    pub location: Option<String>,
    pub description: Option<String>,
    /// Opening time, "HH:MM".
    pub start_time: String,
    /// Closing time, "HH:MM".
    pub end_time: String,
    pub rate_with_lights: f64,
    pub rate_without_lights: f64,
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub reserved_times: Vec<ReservedTime>,
    pub created_at: DateTime<Utc>,
}

/// A slot blocked by the admin outside the booking flow.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReservedTime {
    pub date: NaiveDate,
    /// `[start, end]`, both "HH:MM".
    pub time: [String; 2],
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GroundSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub city: String,
    pub rate_with_lights: f64,
    pub rate_without_lights: f64,
}
