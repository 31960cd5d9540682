// src/ground.rs

use actix_web::{web, HttpResponse};
use chrono::{NaiveDate, Utc};
use futures_util::TryStreamExt;
use log::info;
use mongodb::bson::{doc, to_bson, Document};
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::AdminUser;
use crate::db::GROUNDS;
use crate::error::{ApiError, ApiResult};
use crate::models::{new_id, Ground, ImageRef, ReservedTime};
use crate::schedule::{ClockTime, OpeningHours};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroundRequest {
    pub name: String,
    pub city: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub rate_with_lights: f64,
    pub rate_without_lights: f64,
    pub image: Option<ImageRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroundRequest {
    pub name: Option<String>,
    pub city: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub rate_with_lights: Option<f64>,
    pub rate_without_lights: Option<f64>,
    pub image: Option<ImageRef>,
}

#[derive(Debug, Deserialize)]
pub struct ReservedTimeInput {
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Deserialize)]
pub struct AddReservedTimeRequest {
    pub reserved_time: ReservedTimeInput,
}

fn check_rates(with_lights: f64, without_lights: f64) -> ApiResult<()> {
    if with_lights < 0.0 || without_lights < 0.0 {
        return Err(ApiError::bad_request("Rates cannot be negative"));
    }
    Ok(())
}

pub async fn find_ground(data: &AppState, id: &str) -> ApiResult<Ground> {
    data.mongodb
        .collection::<Ground>(GROUNDS)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| ApiError::not_found("Ground not found"))
}

/// GET /all-grounds, /teams/grounds, /general/grounds
pub async fn get_grounds(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let grounds: Vec<Ground> = data
        .mongodb
        .collection::<Ground>(GROUNDS)
        .find(doc! {})
        .await?
        .try_collect()
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "grounds": grounds })))
}

/// GET /grounds/{id}
pub async fn get_ground(data: web::Data<AppState>, ground_id: web::Path<String>) -> ApiResult<HttpResponse> {
    let ground = find_ground(&data, &ground_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "ground": ground })))
}

/// POST /grounds
pub async fn create_ground(
    data: web::Data<AppState>,
    _admin: AdminUser,
    info: web::Json<CreateGroundRequest>,
) -> ApiResult<HttpResponse> {
    let info = info.into_inner();
    if info.name.trim().is_empty() {
        return Err(ApiError::bad_request("Ground name is required"));
    }
    OpeningHours::parse(&info.start_time, &info.end_time)?;
    check_rates(info.rate_with_lights, info.rate_without_lights)?;

    let ground = Ground {
        id: new_id(),
        name: info.name,
        city: info.city,
        location: info.location,
        description: info.description,
        start_time: info.start_time,
        end_time: info.end_time,
        rate_with_lights: info.rate_with_lights,
        rate_without_lights: info.rate_without_lights,
        image: info.image,
        reserved_times: Vec::new(),
        created_at: Utc::now(),
    };
    data.mongodb.collection::<Ground>(GROUNDS).insert_one(&ground).await?;
    info!("Ground created: {} ({})", ground.name, ground.id);
    Ok(HttpResponse::Created().json(json!({ "message": "Ground added successfully", "ground": ground })))
}

/// PUT /grounds/{id}
pub async fn update_ground(
    data: web::Data<AppState>,
    _admin: AdminUser,
    ground_id: web::Path<String>,
    info: web::Json<UpdateGroundRequest>,
) -> ApiResult<HttpResponse> {
    let ground_id = ground_id.into_inner();
    let info = info.into_inner();
    let ground = find_ground(&data, &ground_id).await?;

    let start = info.start_time.unwrap_or(ground.start_time);
    let end = info.end_time.unwrap_or(ground.end_time);
    OpeningHours::parse(&start, &end)?;
    let with_lights = info.rate_with_lights.unwrap_or(ground.rate_with_lights);
    let without_lights = info.rate_without_lights.unwrap_or(ground.rate_without_lights);
    check_rates(with_lights, without_lights)?;

    let mut update = Document::new();
    update.insert("startTime", start);
    update.insert("endTime", end);
    update.insert("rateWithLights", with_lights);
    update.insert("rateWithoutLights", without_lights);
    if let Some(name) = info.name.filter(|n| !n.trim().is_empty()) {
        update.insert("name", name);
    }
    if let Some(city) = info.city {
        update.insert("city", city);
    }
    if let Some(location) = info.location {
        update.insert("location", location);
    }
    if let Some(description) = info.description {
        update.insert("description", description);
    }
    if let Some(image) = info.image {
        update.insert("image", to_bson(&image)?);
    }

    data.mongodb
        .collection::<Ground>(GROUNDS)
        .update_one(doc! { "_id": &ground_id }, doc! { "$set": update })
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Ground updated successfully" })))
}

/// DELETE /grounds/{id}
pub async fn delete_ground(
    data: web::Data<AppState>,
    _admin: AdminUser,
    ground_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let result = data
        .mongodb
        .collection::<Ground>(GROUNDS)
        .delete_one(doc! { "_id": ground_id.as_str() })
        .await?;
    if result.deleted_count == 0 {
        return Err(ApiError::not_found("Ground not found"));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "Ground deleted successfully" })))
}

/// POST /admin/grounds/{id}/reserved-times
pub async fn add_reserved_time(
    data: web::Data<AppState>,
    _admin: AdminUser,
    ground_id: web::Path<String>,
    info: web::Json<AddReservedTimeRequest>,
) -> ApiResult<HttpResponse> {
    let slot = &info.reserved_time;
    let start = ClockTime::parse(&slot.start_time)?;
    let end = ClockTime::parse(&slot.end_time)?;
    if end <= start {
        return Err(ApiError::bad_request("Reserved time must end after it starts"));
    }

    let reserved = ReservedTime {
        date: slot.date,
        time: [start.to_string(), end.to_string()],
    };
    let result = data
        .mongodb
        .collection::<Ground>(GROUNDS)
        .update_one(
            doc! { "_id": ground_id.as_str() },
            doc! { "$push": { "reservedTimes": to_bson(&reserved)? } },
        )
        .await?;
    if result.matched_count == 0 {
        return Err(ApiError::not_found("Ground not found"));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "Reserved time added successfully" })))
}
