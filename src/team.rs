// src/team.rs

use std::collections::{HashMap, HashSet};

use actix_web::{web, HttpResponse};
use bcrypt::{hash, DEFAULT_COST};
use chrono::Utc;
use futures_util::TryStreamExt;
use log::{debug, info};
use mongodb::bson::{doc, to_bson};
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::AdminUser;
use crate::db::{self, PLAYERS, TEAMS};
use crate::error::{ApiError, ApiResult};
use crate::models::{new_id, City, ImageRef, Player, Team, TeamProfile, TeamWithPlayers};

// ─── REQUEST PAYLOADS ─────────────────────────────────────────────────────────

/// A roster entry: either just a name, or an object that may carry the id of
/// an existing player.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum PlayerInput {
    Name(String),
    Entry {
        #[serde(rename = "_id")]
        id: Option<String>,
        name: String,
        image: Option<ImageRef>,
    },
}

impl PlayerInput {
    fn parts(&self) -> (Option<&str>, &str, Option<&ImageRef>) {
        match self {
            PlayerInput::Name(name) => (None, name.as_str(), None),
            PlayerInput::Entry { id, name, image } => (id.as_deref(), name.as_str(), image.as_ref()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    pub team_name: String,
    pub email: String,
    pub password: String,
    pub city: Option<City>,
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub players: Vec<PlayerInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeamRequest {
    pub team_name: Option<String>,
    pub email: Option<String>,
    pub city: Option<City>,
    pub image: Option<ImageRef>,
    pub players: Option<Vec<PlayerInput>>,
}

// ─── ROSTER SYNC ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, PartialEq)]
pub struct RosterPlan {
    /// Existing players that stay, in request order.
    pub keep: Vec<String>,
    /// Existing players whose name changed: (id, new name).
    pub rename: Vec<(String, String)>,
    /// Players to create: (name, image).
    pub create: Vec<(String, Option<ImageRef>)>,
    /// Existing players no longer listed.
    pub delete: Vec<String>,
}

/// Works out how to turn `current` into the roster described by `incoming`.
/// Ids that are not on the current roster are treated as new players.
pub fn plan_roster(current: &[Player], incoming: &[PlayerInput]) -> RosterPlan {
    let by_id: HashMap<&str, &Player> = current.iter().map(|p| (p.id.as_str(), p)).collect();
    let mut plan = RosterPlan::default();
    let mut kept: HashSet<&str> = HashSet::new();

    for entry in incoming {
        let (id, name, image) = entry.parts();
        let name = name.trim();
        match id.and_then(|id| by_id.get(id)) {
            Some(existing) if kept.insert(existing.id.as_str()) => {
                plan.keep.push(existing.id.clone());
                if !name.is_empty() && existing.name != name {
                    plan.rename.push((existing.id.clone(), name.to_string()));
                }
            }
            Some(_) => {}
            None if !name.is_empty() => plan.create.push((name.to_string(), image.cloned())),
            None => {}
        }
    }

    plan.delete = current
        .iter()
        .filter(|p| !kept.contains(p.id.as_str()))
        .map(|p| p.id.clone())
        .collect();
    plan
}

// ─── HELPERS ──────────────────────────────────────────────────────────────────

/// Players belonging to a team.
pub async fn roster(data: &AppState, team_id: &str) -> ApiResult<Vec<Player>> {
    let players = data
        .mongodb
        .collection::<Player>(PLAYERS)
        .find(doc! { "team": team_id })
        .await?
        .try_collect()
        .await?;
    Ok(players)
}

/// Resolves the rosters of many teams with a single player query.
pub async fn with_players(data: &AppState, teams: Vec<Team>) -> ApiResult<Vec<TeamWithPlayers>> {
    let ids: Vec<&str> = teams.iter().map(|t| t.id.as_str()).collect();
    let players: Vec<Player> = data
        .mongodb
        .collection::<Player>(PLAYERS)
        .find(doc! { "team": { "$in": ids } })
        .await?
        .try_collect()
        .await?;

    let mut by_team: HashMap<String, Vec<Player>> = HashMap::new();
    for p in players {
        if let Some(team) = p.team.clone() {
            by_team.entry(team).or_default().push(p);
        }
    }

    Ok(teams
        .into_iter()
        .map(|t| {
            let players = by_team.remove(&t.id).unwrap_or_default();
            TeamWithPlayers { team: TeamProfile::from(t), players }
        })
        .collect())
}

async fn find_team(data: &AppState, id: &str) -> ApiResult<Team> {
    data.mongodb
        .collection::<Team>(TEAMS)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| ApiError::not_found("Team not found"))
}

async fn insert_players(data: &AppState, team_id: &str, new: Vec<(String, Option<ImageRef>)>) -> ApiResult<Vec<String>> {
    if new.is_empty() {
        return Ok(Vec::new());
    }
    let players: Vec<Player> = new
        .into_iter()
        .map(|(name, image)| Player {
            id: new_id(),
            name,
            image,
            team: Some(team_id.to_string()),
        })
        .collect();
    data.mongodb.collection::<Player>(PLAYERS).insert_many(&players).await?;
    Ok(players.into_iter().map(|p| p.id).collect())
}

// ─── ENDPOINTS ────────────────────────────────────────────────────────────────

/// GET /teams
pub async fn get_teams(data: web::Data<AppState>, _admin: AdminUser) -> ApiResult<HttpResponse> {
    let teams: Vec<Team> = data
        .mongodb
        .collection::<Team>(TEAMS)
        .find(doc! {})
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;
    let teams = with_players(&data, teams).await?;
    Ok(HttpResponse::Ok().json(json!({ "teams": teams })))
}

/// GET /customer/teams
pub async fn list_public_teams(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let teams: Vec<Team> = data
        .mongodb
        .collection::<Team>(TEAMS)
        .find(doc! {})
        .sort(doc! { "teamName": 1 })
        .await?
        .try_collect()
        .await?;
    let teams: Vec<TeamProfile> = teams.into_iter().map(TeamProfile::from).collect();
    Ok(HttpResponse::Ok().json(json!({ "teams": teams })))
}

/// GET /teams/{id}
pub async fn get_team(
    data: web::Data<AppState>,
    _admin: AdminUser,
    team_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let team = find_team(&data, &team_id).await?;
    let players = roster(&data, &team.id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "team": TeamWithPlayers { team: TeamProfile::from(team), players }
    })))
}

/// POST /teams
pub async fn create_team(
    data: web::Data<AppState>,
    _admin: AdminUser,
    info: web::Json<CreateTeamRequest>,
) -> ApiResult<HttpResponse> {
    let info = info.into_inner();
    debug!("create_team called for {}", info.team_name);
    if info.team_name.trim().is_empty() || info.email.trim().is_empty() || info.password.is_empty() {
        return Err(ApiError::bad_request("Team name, email and password are required"));
    }

    let teams = data.mongodb.collection::<Team>(TEAMS);
    if teams.find_one(doc! { "teamName": &info.team_name }).await?.is_some() {
        return Err(ApiError::Conflict("Team already exists".into()));
    }
    if teams.find_one(doc! { "email": &info.email }).await?.is_some() {
        return Err(ApiError::Conflict("Email already exists".into()));
    }

    let now = Utc::now();
    let mut team = Team {
        id: new_id(),
        team_name: info.team_name,
        email: info.email,
        password: hash(&info.password, DEFAULT_COST)?,
        image: info.image,
        city: info.city.unwrap_or_default(),
        players: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    teams
        .insert_one(&team)
        .await
        .map_err(|e| db::duplicate_as_conflict(e, "Team already exists"))?;

    let plan = plan_roster(&[], &info.players);
    team.players = insert_players(&data, &team.id, plan.create).await?;
    teams
        .update_one(doc! { "_id": &team.id }, doc! { "$set": { "players": team.players.clone() } })
        .await?;

    info!("Team created: {} with {} players", team.team_name, team.players.len());
    let players = roster(&data, &team.id).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Team added successfully",
        "team": TeamWithPlayers { team: TeamProfile::from(team), players },
    })))
}

/// PUT /teams/{id}
pub async fn update_team(
    data: web::Data<AppState>,
    _admin: AdminUser,
    team_id: web::Path<String>,
    info: web::Json<UpdateTeamRequest>,
) -> ApiResult<HttpResponse> {
    let team_id = team_id.into_inner();
    let info = info.into_inner();
    let team = find_team(&data, &team_id).await?;
    let teams = data.mongodb.collection::<Team>(TEAMS);

    let mut update = doc! { "updatedAt": to_bson(&Utc::now())? };
    if let Some(name) = info.team_name.filter(|n| !n.trim().is_empty()) {
        if name != team.team_name
            && teams.find_one(doc! { "teamName": &name, "_id": { "$ne": &team_id } }).await?.is_some()
        {
            return Err(ApiError::Conflict("Team already exists".into()));
        }
        update.insert("teamName", name);
    }
    if let Some(email) = info.email.filter(|e| !e.trim().is_empty()) {
        if email != team.email
            && teams.find_one(doc! { "email": &email, "_id": { "$ne": &team_id } }).await?.is_some()
        {
            return Err(ApiError::Conflict("Email already exists".into()));
        }
        update.insert("email", email);
    }
    if let Some(city) = info.city {
        update.insert("city", to_bson(&city)?);
    }
    if let Some(image) = info.image {
        update.insert("image", to_bson(&image)?);
    }

    if let Some(incoming) = info.players {
        let current = roster(&data, &team_id).await?;
        let plan = plan_roster(&current, &incoming);
        debug!("Roster plan for {}: {:?}", team_id, plan);

        let players = data.mongodb.collection::<Player>(PLAYERS);
        for (id, name) in &plan.rename {
            players.update_one(doc! { "_id": id }, doc! { "$set": { "name": name } }).await?;
        }
        if !plan.delete.is_empty() {
            players.delete_many(doc! { "_id": { "$in": plan.delete.clone() } }).await?;
        }
        let mut roster_ids = plan.keep;
        roster_ids.extend(insert_players(&data, &team_id, plan.create).await?);
        update.insert("players", roster_ids);
    }

    teams
        .update_one(doc! { "_id": &team_id }, doc! { "$set": update })
        .await
        .map_err(|e| db::duplicate_as_conflict(e, "Team already exists"))?;

    let team = find_team(&data, &team_id).await?;
    let players = roster(&data, &team_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Team updated successfully",
        "team": TeamWithPlayers { team: TeamProfile::from(team), players },
    })))
}

/// DELETE /teams/{id}
pub async fn delete_team(
    data: web::Data<AppState>,
    _admin: AdminUser,
    team_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let team_id = team_id.into_inner();
    find_team(&data, &team_id).await?;

    data.mongodb
        .collection::<Player>(PLAYERS)
        .delete_many(doc! { "team": &team_id })
        .await?;
    data.mongodb
        .collection::<Team>(TEAMS)
        .delete_one(doc! { "_id": &team_id })
        .await?;
    info!("Team {} deleted with its players", team_id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Team and associated players deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, name: &str) -> Player {
        Player {
            id: id.into(),
            name: name.into(),
            image: None,
            team: Some("t1".into()),
        }
    }

    fn entry(id: Option<&str>, name: &str) -> PlayerInput {
        PlayerInput::Entry {
            id: id.map(String::from),
            name: name.into(),
            image: None,
        }
    }

    #[test]
    fn roster_entries_accept_names_or_objects() {
        let parsed: Vec<PlayerInput> =
            serde_json::from_str(r#"["Babar", {"_id": "p1", "name": "Rizwan"}, {"name": "Shaheen"}]"#).unwrap();
        assert_eq!(parsed[0], PlayerInput::Name("Babar".into()));
        assert_eq!(parsed[1], entry(Some("p1"), "Rizwan"));
        assert_eq!(parsed[2], entry(None, "Shaheen"));
    }

    #[test]
    fn new_team_creates_every_named_player() {
        let plan = plan_roster(&[], &[PlayerInput::Name("A".into()), entry(None, " B "), PlayerInput::Name("".into())]);
        assert_eq!(plan.create, vec![("A".to_string(), None), ("B".to_string(), None)]);
        assert!(plan.keep.is_empty());
        assert!(plan.delete.is_empty());
    }

    #[test]
    fn roster_update_keeps_renames_adds_and_deletes() {
        let current = vec![player("p1", "Ali"), player("p2", "Bilal"), player("p3", "Umar")];
        let incoming = vec![
            entry(Some("p2"), "Bilal"),
            entry(Some("p1"), "Ali Khan"),
            entry(None, "Zaid"),
            entry(Some("stranger"), "Hamza"),
        ];
        let plan = plan_roster(&current, &incoming);

        assert_eq!(plan.keep, vec!["p2", "p1"]);
        assert_eq!(plan.rename, vec![("p1".to_string(), "Ali Khan".to_string())]);
        assert_eq!(plan.create, vec![("Zaid".to_string(), None), ("Hamza".to_string(), None)]);
        assert_eq!(plan.delete, vec!["p3"]);
    }

    #[test]
    fn duplicate_ids_are_kept_once() {
        let current = vec![player("p1", "Ali")];
        let plan = plan_roster(&current, &[entry(Some("p1"), "Ali"), entry(Some("p1"), "Ali")]);
        assert_eq!(plan.keep, vec!["p1"]);
        assert!(plan.create.is_empty());
        assert!(plan.delete.is_empty());
    }

    #[test]
    fn empty_roster_deletes_everyone() {
        let current = vec![player("p1", "Ali"), player("p2", "Bilal")];
        let plan = plan_roster(&current, &[]);
        assert_eq!(plan.delete, vec!["p1", "p2"]);
    }
}
