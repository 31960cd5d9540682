// src/requests.rs
//
// Bookings that are looking for extra players (match requests) or for an
// opposing team (team requests).

use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt;
use log::info;
use mongodb::bson::{doc, Document};
use mongodb::options::ReturnDocument;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::app_state::AppState;
use crate::auth::{active_customer, CustomerUser, TeamUser};
use crate::db::{BOOKINGS, MATCH_REQUESTS, TEAM_REQUESTS};
use crate::error::{ApiError, ApiResult};
use crate::models::{Booking, MatchRequest, MatchRequestStatus, TeamRequest};

#[derive(Debug, Error, PartialEq)]
pub enum JoinError {
    #[error("You cannot join your own request")]
    OwnRequest,

    #[error("You have already joined this request")]
    AlreadyJoined,

    #[error("This request is already full")]
    Full,
}

impl From<JoinError> for ApiError {
    fn from(e: JoinError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

/// Adds `customer` to the request and closes it once enough players joined.
pub fn join_match(request: &mut MatchRequest, customer: &str) -> Result<(), JoinError> {
    if request.match_maker.as_deref() == Some(customer) {
        return Err(JoinError::OwnRequest);
    }
    if request.joined_players.iter().any(|p| p == customer) {
        return Err(JoinError::AlreadyJoined);
    }
    if request.status == MatchRequestStatus::Filled {
        return Err(JoinError::Full);
    }
    request.joined_players.push(customer.to_string());
    if request.joined_players.len() as u32 >= request.players_required {
        request.status = MatchRequestStatus::Filled;
    }
    Ok(())
}

/// Filter that only matches while `customer` may still join: the request is
/// open, not theirs, not already joined by them, and has a free place.
fn open_place_for(request_id: &str, customer: &str) -> Document {
    doc! {
        "_id": request_id,
        "status": MatchRequestStatus::Open.as_str(),
        "matchMaker": { "$ne": customer },
        "joinedPlayers": { "$ne": customer },
        "$expr": { "$lt": [{ "$size": "$joinedPlayers" }, "$playersRequired"] },
    }
}

fn now_full(request_id: &str) -> Document {
    doc! {
        "_id": request_id,
        "status": MatchRequestStatus::Open.as_str(),
        "$expr": { "$gte": [{ "$size": "$joinedPlayers" }, "$playersRequired"] },
    }
}

pub fn register_interest(request: &mut TeamRequest, team: &str) -> Result<(), JoinError> {
    if request.match_maker.as_deref() == Some(team) {
        return Err(JoinError::OwnRequest);
    }
    if request.interested_teams.iter().any(|t| t == team) {
        return Err(JoinError::AlreadyJoined);
    }
    request.interested_teams.push(team.to_string());
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WithBooking<T> {
    #[serde(flatten)]
    request: T,
    booking: Option<Booking>,
}

trait ForBooking {
    fn booking_id(&self) -> &str;
}

impl ForBooking for MatchRequest {
    fn booking_id(&self) -> &str {
        &self.booking_id
    }
}

impl ForBooking for TeamRequest {
    fn booking_id(&self) -> &str {
        &self.booking_id
    }
}

async fn attach_bookings<T: ForBooking>(data: &AppState, requests: Vec<T>) -> ApiResult<Vec<WithBooking<T>>> {
    let ids: Vec<String> = requests.iter().map(|r| r.booking_id().to_string()).collect();
    let bookings: HashMap<String, Booking> = data
        .mongodb
        .collection::<Booking>(BOOKINGS)
        .find(doc! { "_id": { "$in": ids } })
        .await?
        .try_collect::<Vec<Booking>>()
        .await?
        .into_iter()
        .map(|b| (b.id.clone(), b))
        .collect();

    Ok(requests
        .into_iter()
        .map(|request| {
            let booking = bookings.get(request.booking_id()).cloned();
            WithBooking { request, booking }
        })
        .collect())
}

// ─── MATCH REQUESTS ───────────────────────────────────────────────────────────

/// GET /customer/match-requests
pub async fn get_match_requests(data: web::Data<AppState>, customer: CustomerUser) -> ApiResult<HttpResponse> {
    active_customer(&data, &customer.0).await?;
    let requests: Vec<MatchRequest> = data
        .mongodb
        .collection::<MatchRequest>(MATCH_REQUESTS)
        .find(doc! { "status": MatchRequestStatus::Open.as_str() })
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;
    let requests = attach_bookings(&data, requests).await?;
    Ok(HttpResponse::Ok().json(json!({ "matchRequests": requests })))
}

async fn find_match_request(data: &AppState, id: &str) -> ApiResult<MatchRequest> {
    data.mongodb
        .collection::<MatchRequest>(MATCH_REQUESTS)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| ApiError::not_found("Match request not found"))
}

/// POST /customer/match-requests/{id}/join
pub async fn join_match_request(
    data: web::Data<AppState>,
    customer: CustomerUser,
    request_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let customer = active_customer(&data, &customer.0).await?;
    let requests = data.mongodb.collection::<MatchRequest>(MATCH_REQUESTS);
    join_match(&mut find_match_request(&data, &request_id).await?, &customer.id)?;

    let joined = requests
        .find_one_and_update(
            open_place_for(&request_id, &customer.id),
            doc! { "$push": { "joinedPlayers": &customer.id } },
        )
        .return_document(ReturnDocument::After)
        .await?;
    let Some(mut request) = joined else {
        // Someone else changed the request since it was read.
        join_match(&mut find_match_request(&data, &request_id).await?, &customer.id)?;
        return Err(JoinError::Full.into());
    };

    if request.joined_players.len() as u32 >= request.players_required {
        requests
            .update_one(
                now_full(&request.id),
                doc! { "$set": { "status": MatchRequestStatus::Filled.as_str() } },
            )
            .await?;
        request.status = MatchRequestStatus::Filled;
    }
    info!("{} joined match request {}", customer.username, request.id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Joined match request successfully", "matchRequest": request })))
}

// ─── TEAM REQUESTS ────────────────────────────────────────────────────────────

/// GET /team-requests
pub async fn get_team_requests(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let requests: Vec<TeamRequest> = data
        .mongodb
        .collection::<TeamRequest>(TEAM_REQUESTS)
        .find(doc! {})
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;
    let requests = attach_bookings(&data, requests).await?;
    Ok(HttpResponse::Ok().json(json!({ "teamRequests": requests })))
}

/// POST /team-requests/{id}/interest
pub async fn express_interest(
    data: web::Data<AppState>,
    team: TeamUser,
    request_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let requests = data.mongodb.collection::<TeamRequest>(TEAM_REQUESTS);
    let mut request = requests
        .find_one(doc! { "_id": request_id.as_str() })
        .await?
        .ok_or_else(|| ApiError::not_found("Team request not found"))?;

    register_interest(&mut request, &team.0)?;
    requests
        .update_one(
            doc! { "_id": &request.id },
            doc! { "$addToSet": { "interestedTeams": &team.0 } },
        )
        .await?;
    info!("Team {} interested in request {}", team.0, request.id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Interest registered successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn match_request(required: u32) -> MatchRequest {
        MatchRequest {
            id: "mr1".into(),
            match_maker: Some("owner".into()),
            players_required: required,
            booking_id: "b1".into(),
            joined_players: Vec::new(),
            status: MatchRequestStatus::Open,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn request_fills_when_enough_players_join() {
        let mut req = match_request(2);
        join_match(&mut req, "c1").unwrap();
        assert_eq!(req.status, MatchRequestStatus::Open);
        join_match(&mut req, "c2").unwrap();
        assert_eq!(req.status, MatchRequestStatus::Filled);
        assert_eq!(join_match(&mut req, "c3"), Err(JoinError::Full));
        assert_eq!(req.joined_players, vec!["c1".to_string(), "c2".to_string()]);
    }

    #[test]
    fn owner_and_repeat_joins_are_refused() {
        let mut req = match_request(3);
        assert_eq!(join_match(&mut req, "owner"), Err(JoinError::OwnRequest));
        join_match(&mut req, "c1").unwrap();
        assert_eq!(join_match(&mut req, "c1"), Err(JoinError::AlreadyJoined));
    }

    #[test]
    fn join_only_matches_an_open_request_with_room() {
        let filter = open_place_for("mr1", "c1");
        assert_eq!(filter.get_str("_id").unwrap(), "mr1");
        assert_eq!(filter.get_str("status").unwrap(), "open");
        assert_eq!(filter.get_document("matchMaker").unwrap(), &doc! { "$ne": "c1" });
        assert_eq!(filter.get_document("joinedPlayers").unwrap(), &doc! { "$ne": "c1" });
        assert_eq!(
            filter.get_document("$expr").unwrap(),
            &doc! { "$lt": [{ "$size": "$joinedPlayers" }, "$playersRequired"] }
        );

        let full = now_full("mr1");
        assert_eq!(full.get_str("status").unwrap(), "open");
        assert_eq!(
            full.get_document("$expr").unwrap(),
            &doc! { "$gte": [{ "$size": "$joinedPlayers" }, "$playersRequired"] }
        );
    }

    #[test]
    fn team_interest_is_recorded_once() {
        let mut req = TeamRequest {
            id: "tr1".into(),
            match_maker: Some("t1".into()),
            booking_id: "b1".into(),
            interested_teams: Vec::new(),
            created_at: Utc::now(),
        };
        assert_eq!(register_interest(&mut req, "t1"), Err(JoinError::OwnRequest));
        register_interest(&mut req, "t2").unwrap();
        assert_eq!(register_interest(&mut req, "t2"), Err(JoinError::AlreadyJoined));
        assert_eq!(req.interested_teams, vec!["t2".to_string()]);
    }
}
