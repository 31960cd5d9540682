// src/review.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use futures_util::TryStreamExt;
use log::info;
use mongodb::bson::doc;
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::{active_customer, AdminUser, CustomerUser};
use crate::db::REVIEWS;
use crate::error::{ApiError, ApiResult};
use crate::models::{new_id, Review};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Deserialize)]
pub struct AddReviewRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

pub fn check_rating(rating: u8) -> ApiResult<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ApiError::BadRequest(format!(
            "Rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )));
    }
    Ok(())
}

/// GET /all-reviews
pub async fn get_reviews(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let reviews: Vec<Review> = data
        .mongodb
        .collection::<Review>(REVIEWS)
        .find(doc! {})
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "reviews": reviews })))
}

/// POST /reviews
pub async fn add_review(
    data: web::Data<AppState>,
    customer: CustomerUser,
    info: web::Json<AddReviewRequest>,
) -> ApiResult<HttpResponse> {
    check_rating(info.rating)?;
    let customer = active_customer(&data, &customer.0).await?;

    let review = Review {
        id: new_id(),
        customer: customer.id,
        rating: info.rating,
        comment: info.comment.trim().to_string(),
        created_at: Utc::now(),
    };
    data.mongodb.collection::<Review>(REVIEWS).insert_one(&review).await?;
    info!("Review {} added by {}", review.id, customer.username);
    Ok(HttpResponse::Created().json(json!({ "message": "Review added successfully" })))
}

/// DELETE /admin/reviews/{id}
pub async fn delete_review(
    data: web::Data<AppState>,
    _admin: AdminUser,
    review_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let result = data
        .mongodb
        .collection::<Review>(REVIEWS)
        .delete_one(doc! { "_id": review_id.as_str() })
        .await?;
    if result.deleted_count == 0 {
        return Err(ApiError::not_found("Review not found"));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "Review deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_outside_one_to_five_are_rejected() {
        assert!(check_rating(1).is_ok());
        assert!(check_rating(5).is_ok());
        assert!(check_rating(0).is_err());
        assert!(check_rating(6).is_err());
    }
}
