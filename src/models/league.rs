use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{ImageRef, Player, TeamWithPlayers};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct League {
    #[serde(rename = "_id")]
    pub id: String,
    pub league_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub matches: Vec<Match>,
    pub image: Option<ImageRef>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub team_a: u32,
    pub team_b: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CleanSheets {
    #[serde(default)]
    pub team_a: bool,
    #[serde(default)]
    pub team_b: bool,
    pub goal_keeper_a: Option<String>,
    pub goal_keeper_b: Option<String>,
}

/// A goal or assist tally for one player in one match.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Contribution {
    pub player: Option<String>,
    pub team: Option<String>,
    pub score: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    #[serde(rename = "_id")]
    pub id: String,
    pub team_a: Option<String>,
    pub team_b: Option<String>,
    pub score: Option<Score>,
    #[serde(default)]
    pub clean_sheets: CleanSheets,
    #[serde(default)]
    pub scorers: Vec<Contribution>,
    #[serde(default)]
    pub assists: Vec<Contribution>,
    pub winner: Option<String>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub time: String,
    pub created_at: DateTime<Utc>,
}

/// League with teams and every referenced player resolved.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueView {
    #[serde(rename = "_id")]
    pub id: String,
    pub league_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub teams: Vec<TeamWithPlayers>,
    pub matches: Vec<Match>,
    pub players: Vec<Player>,
    pub image: Option<ImageRef>,
}
