use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ImageRef;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum City {
    Rawalpindi,
    Islamabad,
    Lahore,
    Peshawar,
    Faisalabad,
    Karachi,
    Quetta,
    Kashmir,
    #[default]
    Other,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(rename = "_id")]
    pub id: String,
    pub team_name: String,
    pub email: String,
    pub password: String,
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub city: City,
    #[serde(default)]
    pub players: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Team without the password hash.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TeamProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub team_name: String,
    pub email: String,
    pub image: Option<ImageRef>,
    pub city: City,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Team> for TeamProfile {
    fn from(t: Team) -> Self {
        Self {
            id: t.id,
            team_name: t.team_name,
            email: t.email,
            image: t.image,
            city: t.city,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// Team with its roster resolved.
#[derive(Debug, Serialize, Clone)]
pub struct TeamWithPlayers {
    #[serde(flatten)]
    pub team: TeamProfile,
    pub players: Vec<Player>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Player {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub image: Option<ImageRef>,
    pub team: Option<String>,
}
