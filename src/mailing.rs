// src/mailing.rs

use std::sync::OnceLock;

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use log::info;
use mongodb::bson::doc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::AdminUser;
use crate::db::{CONTACTS, CUSTOMERS, EMAILS};
use crate::error::{ApiError, ApiResult};
use crate::models::{new_id, Contact, Customer, Email};

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email.trim())
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MailingEntry {
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AddEmailRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

/// Subscribers first, then every customer's address.
pub fn mailing_list(subscribers: Vec<Email>, customers: Vec<Customer>) -> Vec<MailingEntry> {
    subscribers
        .into_iter()
        .map(|e| MailingEntry {
            email: e.email,
            created_at: e.created_at,
        })
        .chain(customers.into_iter().map(|c| MailingEntry {
            email: c.email,
            created_at: c.created_at,
        }))
        .collect()
}

/// GET /email
pub async fn get_emails(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let subscribers: Vec<Email> = data
        .mongodb
        .collection::<Email>(EMAILS)
        .find(doc! {})
        .await?
        .try_collect()
        .await?;
    let customers: Vec<Customer> = data
        .mongodb
        .collection::<Customer>(CUSTOMERS)
        .find(doc! {})
        .await?
        .try_collect()
        .await?;
    Ok(HttpResponse::Ok().json(mailing_list(subscribers, customers)))
}

/// POST /email
pub async fn add_email(data: web::Data<AppState>, info: web::Json<AddEmailRequest>) -> ApiResult<HttpResponse> {
    let email = info.email.trim();
    if email.is_empty() {
        return Err(ApiError::bad_request("Email is required"));
    }
    let subscriber = Email {
        id: new_id(),
        email: email.to_string(),
        created_at: Utc::now(),
    };
    data.mongodb.collection::<Email>(EMAILS).insert_one(&subscriber).await?;
    Ok(HttpResponse::Created().json(json!({ "message": "Email added successfully" })))
}

/// POST /contact
pub async fn submit_contact(data: web::Data<AppState>, info: web::Json<ContactRequest>) -> ApiResult<HttpResponse> {
    let info = info.into_inner();
    if info.email.trim().is_empty() || info.subject.trim().is_empty() || info.message.trim().is_empty() {
        return Err(ApiError::bad_request("Email, subject and message are required"));
    }
    if !is_valid_email(&info.email) {
        return Err(ApiError::bad_request("Please enter a valid email address"));
    }

    let contact = Contact {
        id: new_id(),
        email: info.email.trim().to_string(),
        subject: info.subject,
        message: info.message,
        created_at: Utc::now(),
    };
    data.mongodb.collection::<Contact>(CONTACTS).insert_one(&contact).await?;
    info!("Contact message received from {}", contact.email);
    Ok(HttpResponse::Created().json(json!({ "message": "Message sent successfully" })))
}

/// GET /admin/contacts
pub async fn get_contacts(data: web::Data<AppState>, _admin: AdminUser) -> ApiResult<HttpResponse> {
    let contacts: Vec<Contact> = data
        .mongodb
        .collection::<Contact>(CONTACTS)
        .find(doc! {})
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "contacts": contacts })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CustomerStatus;

    #[test]
    fn email_format() {
        assert!(is_valid_email("ali@example.com"));
        assert!(is_valid_email(" team@club.pk "));
        assert!(!is_valid_email("ali@example"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("two words@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn mailing_list_appends_customers() {
        let now = Utc::now();
        let subscribers = vec![Email {
            id: "e1".into(),
            email: "fan@example.com".into(),
            created_at: now,
        }];
        let customers = vec![Customer {
            id: "c1".into(),
            username: "ali".into(),
            name: None,
            email: "ali@example.com".into(),
            phone: None,
            address: None,
            dob: None,
            password: "hash".into(),
            status: CustomerStatus::Active,
            created_at: now,
        }];

        let list = mailing_list(subscribers, customers);
        let emails: Vec<&str> = list.iter().map(|e| e.email.as_str()).collect();
        assert_eq!(emails, vec!["fan@example.com", "ali@example.com"]);
    }
}
