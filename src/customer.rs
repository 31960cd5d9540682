// src/customer.rs

use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt;
use log::info;
use mongodb::bson::doc;
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::AdminUser;
use crate::db::CUSTOMERS;
use crate::error::{ApiError, ApiResult};
use crate::models::{Customer, CustomerProfile};

/// GET /admin/customers
pub async fn get_customers(data: web::Data<AppState>, _admin: AdminUser) -> ApiResult<HttpResponse> {
    let customers: Vec<Customer> = data
        .mongodb
        .collection::<Customer>(CUSTOMERS)
        .find(doc! {})
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;
    let customers: Vec<CustomerProfile> = customers.into_iter().map(CustomerProfile::from).collect();
    Ok(HttpResponse::Ok().json(json!({ "customers": customers })))
}

/// PATCH /admin/customers/{id}/status
///
/// Flips the customer between active and blocked.
pub async fn toggle_customer_status(
    data: web::Data<AppState>,
    _admin: AdminUser,
    customer_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let customers = data.mongodb.collection::<Customer>(CUSTOMERS);
    let customer = customers
        .find_one(doc! { "_id": customer_id.as_str() })
        .await?
        .ok_or_else(|| ApiError::not_found("Customer not found"))?;

    let status = customer.status.toggled();
    customers
        .update_one(
            doc! { "_id": &customer.id },
            doc! { "$set": { "status": status.as_str() } },
        )
        .await?;
    info!("Customer {} is now {}", customer.username, status.as_str());
    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Customer {} successfully", status.as_str()),
        "status": status,
    })))
}
