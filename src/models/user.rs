use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::new_id;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

impl Admin {
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            id: new_id(),
            username,
            password: password_hash,
            created_at: Utc::now(),
        }
    }
}

/// Admin as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<Admin> for AdminProfile {
    fn from(a: Admin) -> Self {
        Self {
            id: a.id,
            username: a.username,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    #[default]
    Active,
    Blocked,
}

impl CustomerStatus {
    pub fn toggled(self) -> Self {
        match self {
            CustomerStatus::Active => CustomerStatus::Blocked,
            CustomerStatus::Blocked => CustomerStatus::Active,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CustomerStatus::Active => "active",
            CustomerStatus::Blocked => "blocked",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub dob: Option<NaiveDate>,
    pub password: String,
    #[serde(default)]
    pub status: CustomerStatus,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn is_blocked(&self) -> bool {
        self.status == CustomerStatus::Blocked
    }
}

/// Customer without the password hash.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub dob: Option<NaiveDate>,
    pub status: CustomerStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Customer> for CustomerProfile {
    fn from(c: Customer) -> Self {
        Self {
            id: c.id,
            username: c.username,
            name: c.name,
            email: c.email,
            phone: c.phone,
            address: c.address,
            dob: c.dob,
            status: c.status,
            created_at: c.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_toggles_both_ways() {
        assert_eq!(CustomerStatus::Active.toggled(), CustomerStatus::Blocked);
        assert_eq!(CustomerStatus::Blocked.toggled(), CustomerStatus::Active);
    }

    #[test]
    fn missing_status_defaults_to_active() {
        let json = serde_json::json!({
            "_id": "c1",
            "username": "ali",
            "name": null,
            "email": "ali@example.com",
            "phone": null,
            "address": null,
            "dob": null,
            "password": "hash",
            "createdAt": "2024-01-01T00:00:00Z"
        });
        let customer: Customer = serde_json::from_value(json).unwrap();
        assert!(!customer.is_blocked());
    }
}
