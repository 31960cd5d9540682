// src/league.rs

use std::collections::{HashMap, HashSet};

use actix_web::{web, HttpResponse};
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::TryStreamExt;
use log::info;
use mongodb::bson::{doc, to_bson};
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::AdminUser;
use crate::db::{LEAGUES, PLAYERS, TEAMS};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    new_id, CleanSheets, Contribution, ImageRef, League, LeagueView, Match, Player, Score, Team,
};
use crate::team::with_players;

fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct ContributionInput {
    pub player: Option<String>,
    pub team: Option<String>,
    #[serde(default = "one")]
    pub score: u32,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CleanSheetsInput {
    #[serde(default)]
    pub team_a: bool,
    #[serde(default)]
    pub team_b: bool,
    pub goal_keeper_a: Option<String>,
    pub goal_keeper_b: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInput {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub team_a: Option<String>,
    pub team_b: Option<String>,
    pub score: Option<Score>,
    #[serde(default)]
    pub clean_sheets: CleanSheetsInput,
    #[serde(default)]
    pub scorers: Vec<ContributionInput>,
    #[serde(default)]
    pub assists: Vec<ContributionInput>,
    pub winner: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueRequest {
    pub league_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub matches: Vec<MatchInput>,
    pub image: Option<ImageRef>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Player lookup used while parsing match payloads. A reference is either a
/// known player id or a name; unknown names become new players of the given
/// team, as long as that team exists.
#[derive(Debug, Default)]
pub struct PlayerDirectory {
    ids: HashSet<String>,
    teams: HashSet<String>,
    by_name: HashMap<(String, String), String>,
    created: Vec<Player>,
}

impl PlayerDirectory {
    pub fn new(players: &[Player], teams: HashSet<String>) -> Self {
        let mut dir = PlayerDirectory {
            teams,
            ..PlayerDirectory::default()
        };
        for p in players {
            dir.ids.insert(p.id.clone());
            if let Some(team) = &p.team {
                dir.by_name
                    .entry((team.clone(), p.name.to_lowercase()))
                    .or_insert_with(|| p.id.clone());
            }
        }
        dir
    }

    /// Returns the id the reference points to, or `None` when a name cannot be
    /// tied to an existing team.
    pub fn resolve(&mut self, reference: &str, team: Option<&str>) -> Option<String> {
        if self.ids.contains(reference) {
            return Some(reference.to_string());
        }
        let team = team.filter(|t| self.teams.contains(*t))?;
        let key = (team.to_string(), reference.to_lowercase());
        if let Some(id) = self.by_name.get(&key) {
            return Some(id.clone());
        }

        let player = Player {
            id: new_id(),
            name: reference.to_string(),
            image: None,
            team: Some(team.to_string()),
        };
        self.ids.insert(player.id.clone());
        self.by_name.insert(key, player.id.clone());
        let id = player.id.clone();
        self.created.push(player);
        Some(id)
    }

    pub fn into_created(self) -> Vec<Player> {
        self.created
    }
}

fn parse_contributions(dir: &mut PlayerDirectory, entries: Vec<ContributionInput>) -> Vec<Contribution> {
    entries
        .into_iter()
        .map(|c| {
            let team = non_empty(c.team);
            let player = non_empty(c.player).and_then(|p| dir.resolve(&p, team.as_deref()));
            Contribution {
                player,
                team,
                score: c.score,
            }
        })
        .collect()
}

/// Turns match payloads into stored matches, resolving player names on the way.
pub fn parse_matches(dir: &mut PlayerDirectory, matches: Vec<MatchInput>) -> Vec<Match> {
    let now = Utc::now();
    matches
        .into_iter()
        .map(|m| {
            let team_a = non_empty(m.team_a);
            let team_b = non_empty(m.team_b);
            let sheets = m.clean_sheets;
            let goal_keeper_a =
                non_empty(sheets.goal_keeper_a).and_then(|k| dir.resolve(&k, team_a.as_deref()));
            let goal_keeper_b =
                non_empty(sheets.goal_keeper_b).and_then(|k| dir.resolve(&k, team_b.as_deref()));

            Match {
                id: non_empty(m.id).unwrap_or_else(new_id),
                scorers: parse_contributions(dir, m.scorers),
                assists: parse_contributions(dir, m.assists),
                clean_sheets: CleanSheets {
                    team_a: sheets.team_a,
                    team_b: sheets.team_b,
                    goal_keeper_a,
                    goal_keeper_b,
                },
                team_a,
                team_b,
                score: m.score,
                winner: non_empty(m.winner),
                date: m.date.unwrap_or(now),
                time: m.time.unwrap_or_default(),
                created_at: now,
            }
        })
        .collect()
}

fn validate(info: &LeagueRequest) -> ApiResult<()> {
    if info.league_name.trim().is_empty() {
        return Err(ApiError::bad_request("League name is required"));
    }
    if info.end_date < info.start_date {
        return Err(ApiError::bad_request("League cannot end before it starts"));
    }
    Ok(())
}

/// Parses the matches against the current players of every team involved and
/// stores any players that had to be created.
async fn build_matches(data: &AppState, teams: &[String], matches: Vec<MatchInput>) -> ApiResult<Vec<Match>> {
    let mut team_ids: HashSet<&str> = teams.iter().map(String::as_str).collect();
    for m in &matches {
        team_ids.extend(m.team_a.as_deref());
        team_ids.extend(m.team_b.as_deref());
        for c in m.scorers.iter().chain(m.assists.iter()) {
            team_ids.extend(c.team.as_deref());
        }
    }
    let team_ids: Vec<&str> = team_ids.into_iter().filter(|t| !t.is_empty()).collect();

    let existing: HashSet<String> = data
        .mongodb
        .collection::<Team>(TEAMS)
        .find(doc! { "_id": { "$in": team_ids.clone() } })
        .await?
        .try_collect::<Vec<Team>>()
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();

    let players: Vec<Player> = data
        .mongodb
        .collection::<Player>(PLAYERS)
        .find(doc! { "team": { "$in": team_ids } })
        .await?
        .try_collect()
        .await?;

    let mut dir = PlayerDirectory::new(&players, existing);
    let parsed = parse_matches(&mut dir, matches);
    let created = dir.into_created();

    if !created.is_empty() {
        data.mongodb.collection::<Player>(PLAYERS).insert_many(&created).await?;
        for p in &created {
            if let Some(team) = &p.team {
                data.mongodb
                    .collection::<Team>(TEAMS)
                    .update_one(doc! { "_id": team }, doc! { "$push": { "players": &p.id } })
                    .await?;
            }
        }
        info!("Created {} players from match sheets", created.len());
    }
    Ok(parsed)
}

/// Every player referenced by a match of the league.
fn referenced_players(league: &League) -> Vec<String> {
    let mut ids: Vec<String> = league
        .matches
        .iter()
        .flat_map(|m| {
            m.scorers
                .iter()
                .chain(m.assists.iter())
                .filter_map(|c| c.player.clone())
                .chain(m.clean_sheets.goal_keeper_a.clone())
                .chain(m.clean_sheets.goal_keeper_b.clone())
        })
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

async fn to_view(data: &AppState, league: League) -> ApiResult<LeagueView> {
    let teams: Vec<Team> = data
        .mongodb
        .collection::<Team>(TEAMS)
        .find(doc! { "_id": { "$in": league.teams.clone() } })
        .await?
        .try_collect()
        .await?;
    let players: Vec<Player> = data
        .mongodb
        .collection::<Player>(PLAYERS)
        .find(doc! { "_id": { "$in": referenced_players(&league) } })
        .await?
        .try_collect()
        .await?;

    Ok(LeagueView {
        id: league.id,
        league_name: league.league_name,
        start_date: league.start_date,
        end_date: league.end_date,
        teams: with_players(data, teams).await?,
        matches: league.matches,
        players,
        image: league.image,
    })
}

async fn find_league(data: &AppState, id: &str) -> ApiResult<League> {
    data.mongodb
        .collection::<League>(LEAGUES)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| ApiError::not_found("League not found"))
}

/// GET /teams/leagues, /leagues
pub async fn get_leagues(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let leagues: Vec<League> = data
        .mongodb
        .collection::<League>(LEAGUES)
        .find(doc! {})
        .sort(doc! { "startDate": -1 })
        .await?
        .try_collect()
        .await?;

    let mut views = Vec::with_capacity(leagues.len());
    for league in leagues {
        views.push(to_view(&data, league).await?);
    }
    Ok(HttpResponse::Ok().json(json!({ "leagues": views })))
}

/// GET /teams/leagues/{id}, /leagues/{id}
pub async fn get_league(data: web::Data<AppState>, league_id: web::Path<String>) -> ApiResult<HttpResponse> {
    let league = find_league(&data, &league_id).await?;
    let view = to_view(&data, league).await?;
    Ok(HttpResponse::Ok().json(json!({ "league": view })))
}

/// POST /leagues
pub async fn create_league(
    data: web::Data<AppState>,
    _admin: AdminUser,
    info: web::Json<LeagueRequest>,
) -> ApiResult<HttpResponse> {
    let info = info.into_inner();
    validate(&info)?;
    let matches = build_matches(&data, &info.teams, info.matches).await?;

    let league = League {
        id: new_id(),
        league_name: info.league_name.trim().to_string(),
        start_date: info.start_date,
        end_date: info.end_date,
        teams: info.teams,
        matches,
        image: info.image,
    };
    data.mongodb.collection::<League>(LEAGUES).insert_one(&league).await?;
    info!("League created: {} ({} matches)", league.league_name, league.matches.len());
    Ok(HttpResponse::Created().json(json!({ "message": "League added successfully" })))
}

/// PUT /leagues/{id}
pub async fn update_league(
    data: web::Data<AppState>,
    _admin: AdminUser,
    league_id: web::Path<String>,
    info: web::Json<LeagueRequest>,
) -> ApiResult<HttpResponse> {
    let league_id = league_id.into_inner();
    let info = info.into_inner();
    validate(&info)?;
    let current = find_league(&data, &league_id).await?;
    let matches = build_matches(&data, &info.teams, info.matches).await?;

    let mut update = doc! {
        "leagueName": info.league_name.trim(),
        "startDate": info.start_date.to_string(),
        "endDate": info.end_date.to_string(),
        "teams": info.teams,
        "matches": to_bson(&matches)?,
    };
    if let Some(image) = info.image.or(current.image) {
        update.insert("image", to_bson(&image)?);
    }

    data.mongodb
        .collection::<League>(LEAGUES)
        .update_one(doc! { "_id": &league_id }, doc! { "$set": update })
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "League updated successfully" })))
}

/// DELETE /leagues/{id}
pub async fn delete_league(
    data: web::Data<AppState>,
    _admin: AdminUser,
    league_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let result = data
        .mongodb
        .collection::<League>(LEAGUES)
        .delete_one(doc! { "_id": league_id.as_str() })
        .await?;
    if result.deleted_count == 0 {
        return Err(ApiError::not_found("League not found"));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "League deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, name: &str, team: &str) -> Player {
        Player {
            id: id.into(),
            name: name.into(),
            image: None,
            team: Some(team.into()),
        }
    }

    fn teams(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn contribution(player: &str, team: &str) -> ContributionInput {
        ContributionInput {
            player: Some(player.into()),
            team: Some(team.into()),
            score: 1,
        }
    }

    #[test]
    fn resolves_ids_names_and_new_players() {
        let mut dir = PlayerDirectory::new(
            &[player("p1", "Ali", "t1"), player("p2", "Omar", "t2")],
            teams(&["t1", "t2"]),
        );

        assert_eq!(dir.resolve("p2", None).as_deref(), Some("p2"));
        assert_eq!(dir.resolve("ali", Some("t1")).as_deref(), Some("p1"));
        // same name on another team is a different player
        let fresh = dir.resolve("Ali", Some("t2")).unwrap();
        assert_ne!(fresh, "p1");
        assert_eq!(dir.resolve("Ali", Some("t2")), Some(fresh.clone()));
        assert_eq!(dir.resolve("Nobody", None), None);

        let created = dir.into_created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].id, fresh);
        assert_eq!(created[0].team.as_deref(), Some("t2"));
    }

    #[test]
    fn names_on_unknown_teams_are_not_created() {
        let mut dir = PlayerDirectory::new(&[player("p1", "Ali", "t1")], teams(&["t1"]));

        assert_eq!(dir.resolve("Bilal", Some("ghost")), None);
        assert_eq!(dir.resolve("p1", Some("ghost")).as_deref(), Some("p1"));
        assert!(dir.resolve("Bilal", Some("t1")).is_some());

        let created = dir.into_created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].team.as_deref(), Some("t1"));
    }

    #[test]
    fn parses_match_sheets() {
        let mut dir = PlayerDirectory::new(&[player("gk", "Saad", "t1")], teams(&["t1", "t2"]));
        let input = MatchInput {
            id: None,
            team_a: Some("t1".into()),
            team_b: Some("t2".into()),
            score: Some(Score { team_a: 2, team_b: 0 }),
            clean_sheets: CleanSheetsInput {
                team_a: true,
                team_b: false,
                goal_keeper_a: Some("Saad".into()),
                goal_keeper_b: Some("  ".into()),
            },
            scorers: vec![contribution("Hamza", "t1"), contribution("Hamza", "t1")],
            assists: vec![ContributionInput {
                player: Some("".into()),
                team: Some("t1".into()),
                score: 1,
            }],
            winner: Some("t1".into()),
            date: None,
            time: Some("18:00".into()),
        };

        let matches = parse_matches(&mut dir, vec![input]);
        let m = &matches[0];
        assert_eq!(m.clean_sheets.goal_keeper_a.as_deref(), Some("gk"));
        assert_eq!(m.clean_sheets.goal_keeper_b, None);
        assert_eq!(m.scorers[0].player, m.scorers[1].player);
        assert_eq!(m.assists[0].player, None);
        assert_eq!(m.winner.as_deref(), Some("t1"));
        assert_eq!(dir.into_created().len(), 1);
    }

    #[test]
    fn referenced_players_are_distinct() {
        let mut dir = PlayerDirectory::new(&[player("a", "A", "t1"), player("b", "B", "t2")], teams(&["t1", "t2"]));
        let input = MatchInput {
            id: Some("m1".into()),
            team_a: Some("t1".into()),
            team_b: Some("t2".into()),
            score: None,
            clean_sheets: CleanSheetsInput {
                goal_keeper_b: Some("b".into()),
                ..Default::default()
            },
            scorers: vec![contribution("a", "t1")],
            assists: vec![contribution("a", "t1")],
            winner: None,
            date: None,
            time: None,
        };
        let league = League {
            id: "l1".into(),
            league_name: "Summer Cup".into(),
            start_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2030, 2, 1).unwrap(),
            teams: vec!["t1".into(), "t2".into()],
            matches: parse_matches(&mut dir, vec![input]),
            image: None,
        };
        assert_eq!(league.matches[0].id, "m1");
        assert_eq!(referenced_players(&league), vec!["a".to_string(), "b".to_string()]);
    }
}
