use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: String,
    pub customer: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Newsletter subscriber.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchRequestStatus {
    #[default]
    Open,
    Filled,
}

impl MatchRequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchRequestStatus::Open => "open",
            MatchRequestStatus::Filled => "filled",
        }
    }
}

/// A booking that is looking for individual players.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    #[serde(rename = "_id")]
    pub id: String,
    pub match_maker: Option<String>,
    pub players_required: u32,
    pub booking_id: String,
    #[serde(default)]
    pub joined_players: Vec<String>,
    #[serde(default)]
    pub status: MatchRequestStatus,
    pub created_at: DateTime<Utc>,
}

/// A booking that is looking for an opposing team.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TeamRequest {
    #[serde(rename = "_id")]
    pub id: String,
    pub match_maker: Option<String>,
    pub booking_id: String,
    #[serde(default)]
    pub interested_teams: Vec<String>,
    pub created_at: DateTime<Utc>,
}
