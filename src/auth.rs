use std::fmt;

use actix_web::{dev::Payload, web, FromRequest, HttpMessage, HttpRequest, HttpResponse};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, NaiveDate, Utc};
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{info, warn};
use mongodb::bson::doc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app_state::AppState;
use crate::db::{self, ADMINS, CUSTOMERS, EMAILS, TEAMS};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    new_id, Admin, AdminProfile, City, Customer, CustomerProfile, CustomerStatus, Email, Team,
    TeamProfile, TeamWithPlayers,
};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
    Team,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Admin => "admin",
            Role::Customer => "customer",
            Role::Team => "team",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}

// JWT Creation
pub fn create_jwt(subject: &str, role: Role, secret: &str, ttl_hours: i64) -> ApiResult<String> {
    let expiration = Duration::try_hours(ttl_hours)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| ApiError::Internal(format!("Token lifetime of {} hours is out of range", ttl_hours)))?;
    let claims = Claims {
        sub: subject.to_string(),
        role,
        exp: expiration.timestamp() as usize,
    };
    Ok(encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))?)
}

// JWT Validation
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Accepts `Bearer <token>` as well as a bare token.
pub fn token_from_header(value: &str) -> Option<&str> {
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

// ─── CALLER IDENTITY ───────────────────────────────────────────────────────────

/// The verified caller, attached to the request by the authentication middleware.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
}

/// Attached instead of [`AuthUser`] when a token was presented but did not verify.
#[derive(Debug, Clone)]
pub struct TokenRejected(pub String);

fn caller(req: &HttpRequest) -> Result<AuthUser, ApiError> {
    let ext = req.extensions();
    if let Some(user) = ext.get::<AuthUser>() {
        return Ok(user.clone());
    }
    match ext.get::<TokenRejected>() {
        Some(TokenRejected(reason)) => Err(ApiError::Unauthorized(format!("Invalid token: {}", reason))),
        None => Err(ApiError::Unauthorized("Authentication token is required".to_string())),
    }
}

fn caller_with_role(req: &HttpRequest, role: Role) -> Result<String, ApiError> {
    let user = caller(req)?;
    if user.role != role {
        return Err(ApiError::Forbidden(format!("Access restricted to {} accounts", role)));
    }
    Ok(user.id)
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(caller(req))
    }
}

macro_rules! role_extractor {
    ($name:ident, $role:expr) => {
        #[derive(Debug, Clone)]
        pub struct $name(pub String);

        impl FromRequest for $name {
            type Error = ApiError;
            type Future = Ready<Result<Self, Self::Error>>;

            fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
                ready(caller_with_role(req, $role).map($name))
            }
        }
    };
}

role_extractor!(AdminUser, Role::Admin);
role_extractor!(CustomerUser, Role::Customer);
role_extractor!(TeamUser, Role::Team);

// ─── REQUEST PAYLOADS ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterCustomerRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub dob: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTeamRequest {
    pub team_name: String,
    pub password: String,
    pub email: String,
    pub city: Option<City>,
}

fn require(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{} is required", field)));
    }
    Ok(())
}

// ─── ADMIN ─────────────────────────────────────────────────────────────────────

/// POST /auth/admin/register. Only an existing admin may add another; the
/// first account comes from `SEED_ADMIN`.
pub async fn register_admin(
    data: web::Data<AppState>,
    _admin: AdminUser,
    info: web::Json<AdminCredentials>,
) -> ApiResult<HttpResponse> {
    require("Username", &info.username)?;
    require("Password", &info.password)?;
    let admins = data.mongodb.collection::<Admin>(ADMINS);
    if admins.find_one(doc! { "username": &info.username }).await?.is_some() {
        return Err(ApiError::Conflict("Admin already exists".into()));
    }

    let admin = Admin::new(info.username.clone(), hash(&info.password, DEFAULT_COST)?);
    admins
        .insert_one(&admin)
        .await
        .map_err(|e| db::duplicate_as_conflict(e, "Admin already exists"))?;
    info!("Admin {} registered", admin.username);
    Ok(HttpResponse::Created().json(json!({ "message": "Admin created successfully" })))
}

/// POST /auth/admin/login
pub async fn login_admin(
    data: web::Data<AppState>,
    info: web::Json<AdminCredentials>,
) -> ApiResult<HttpResponse> {
    let admin = data
        .mongodb
        .collection::<Admin>(ADMINS)
        .find_one(doc! { "username": &info.username })
        .await?
        .ok_or_else(|| ApiError::not_found("Admin not found"))?;

    if !verify(&info.password, &admin.password).unwrap_or(false) {
        return Err(ApiError::bad_request("Invalid password"));
    }
    let token = create_jwt(&admin.id, Role::Admin, &data.config.jwt_secret, data.config.token_ttl_hours)?;
    Ok(HttpResponse::Ok().json(json!({ "token": token, "adminToken": token })))
}

/// GET /auth/admin/profile
pub async fn admin_profile(data: web::Data<AppState>, admin: AdminUser) -> ApiResult<HttpResponse> {
    let admin = data
        .mongodb
        .collection::<Admin>(ADMINS)
        .find_one(doc! { "_id": &admin.0 })
        .await?
        .ok_or_else(|| ApiError::not_found("Admin not found"))?;
    Ok(HttpResponse::Ok().json(json!({ "admin": AdminProfile::from(admin) })))
}

// ─── CUSTOMER ──────────────────────────────────────────────────────────────────

/// POST /auth/customer/register
pub async fn register_customer(
    data: web::Data<AppState>,
    info: web::Json<RegisterCustomerRequest>,
) -> ApiResult<HttpResponse> {
    let info = info.into_inner();
    require("Username", &info.username)?;
    require("Email", &info.email)?;
    require("Password", &info.password)?;

    let customers = data.mongodb.collection::<Customer>(CUSTOMERS);
    if customers.find_one(doc! { "email": &info.email }).await?.is_some() {
        return Err(ApiError::Conflict("Customer already exists".into()));
    }
    if customers.find_one(doc! { "username": &info.username }).await?.is_some() {
        return Err(ApiError::Conflict("Username already exists".into()));
    }
    if let Some(phone) = info.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        if customers.find_one(doc! { "phone": phone }).await?.is_some() {
            return Err(ApiError::Conflict("Phone already registered".into()));
        }
    }

    let now = Utc::now();
    let customer = Customer {
        id: new_id(),
        username: info.username,
        name: info.name,
        email: info.email.clone(),
        phone: info.phone,
        address: info.address,
        dob: info.dob,
        password: hash(&info.password, DEFAULT_COST)?,
        status: CustomerStatus::Active,
        created_at: now,
    };
    customers
        .insert_one(&customer)
        .await
        .map_err(|e| db::duplicate_as_conflict(e, "Customer already exists"))?;

    let subscriber = Email {
        id: new_id(),
        email: info.email,
        created_at: now,
    };
    data.mongodb.collection::<Email>(EMAILS).insert_one(&subscriber).await?;

    info!("Customer {} registered", customer.username);
    Ok(HttpResponse::Created().json(json!({ "message": "Customer created successfully" })))
}

/// POST /auth/customer/login
pub async fn login_customer(
    data: web::Data<AppState>,
    info: web::Json<EmailCredentials>,
) -> ApiResult<HttpResponse> {
    let customer = data
        .mongodb
        .collection::<Customer>(CUSTOMERS)
        .find_one(doc! { "email": &info.email })
        .await?
        .ok_or_else(|| ApiError::not_found("Account not found"))?;

    if customer.is_blocked() {
        warn!("Blocked customer {} attempted to log in", customer.id);
        return Err(ApiError::bad_request("Customer is blocked"));
    }
    if !verify(&info.password, &customer.password).unwrap_or(false) {
        return Err(ApiError::bad_request("Invalid password"));
    }
    let token = create_jwt(&customer.id, Role::Customer, &data.config.jwt_secret, data.config.token_ttl_hours)?;
    Ok(HttpResponse::Ok().json(json!({ "token": token })))
}

/// GET /auth/customer/profile
pub async fn customer_profile(data: web::Data<AppState>, customer: CustomerUser) -> ApiResult<HttpResponse> {
    let customer = data
        .mongodb
        .collection::<Customer>(CUSTOMERS)
        .find_one(doc! { "_id": &customer.0 })
        .await?
        .ok_or_else(|| ApiError::not_found("Customer not found"))?;
    if customer.is_blocked() {
        return Err(ApiError::Forbidden("Your account has been blocked".into()));
    }
    Ok(HttpResponse::Ok().json(json!({ "customer": CustomerProfile::from(customer) })))
}

/// Loads the calling customer and refuses blocked accounts.
pub async fn active_customer(data: &AppState, customer_id: &str) -> ApiResult<Customer> {
    let customer = data
        .mongodb
        .collection::<Customer>(CUSTOMERS)
        .find_one(doc! { "_id": customer_id })
        .await?
        .ok_or_else(|| ApiError::not_found("Customer not found"))?;
    if customer.is_blocked() {
        return Err(ApiError::Forbidden("Your account has been blocked".into()));
    }
    Ok(customer)
}

// ─── TEAM ──────────────────────────────────────────────────────────────────────

/// POST /auth/team/register, POST /customer/teams/register
pub async fn register_team(
    data: web::Data<AppState>,
    info: web::Json<RegisterTeamRequest>,
) -> ApiResult<HttpResponse> {
    let info = info.into_inner();
    require("Team name", &info.team_name)?;
    require("Email", &info.email)?;
    require("Password", &info.password)?;

    let teams = data.mongodb.collection::<Team>(TEAMS);
    if teams.find_one(doc! { "teamName": &info.team_name }).await?.is_some() {
        return Err(ApiError::Conflict("Team already exists".into()));
    }
    if teams.find_one(doc! { "email": &info.email }).await?.is_some() {
        return Err(ApiError::Conflict("Email already exists".into()));
    }

    let now = Utc::now();
    let team = Team {
        id: new_id(),
        team_name: info.team_name,
        email: info.email,
        password: hash(&info.password, DEFAULT_COST)?,
        image: None,
        city: info.city.unwrap_or_default(),
        players: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    teams
        .insert_one(&team)
        .await
        .map_err(|e| db::duplicate_as_conflict(e, "Team already exists"))?;
    info!("Team {} registered", team.team_name);
    Ok(HttpResponse::Created().json(json!({ "message": "Team registered successfully" })))
}

/// POST /auth/team/login, POST /customer/teams/login
pub async fn login_team(
    data: web::Data<AppState>,
    info: web::Json<EmailCredentials>,
) -> ApiResult<HttpResponse> {
    let team = data
        .mongodb
        .collection::<Team>(TEAMS)
        .find_one(doc! { "email": &info.email })
        .await?
        .ok_or_else(|| ApiError::not_found("Team not found"))?;

    if !verify(&info.password, &team.password).unwrap_or(false) {
        return Err(ApiError::bad_request("Invalid password"));
    }
    let token = create_jwt(&team.id, Role::Team, &data.config.jwt_secret, data.config.token_ttl_hours)?;
    Ok(HttpResponse::Ok().json(json!({ "teamToken": token })))
}

/// GET /auth/team/profile, GET /customer/teams/team-profile
pub async fn team_profile(data: web::Data<AppState>, team: TeamUser) -> ApiResult<HttpResponse> {
    let team = data
        .mongodb
        .collection::<Team>(TEAMS)
        .find_one(doc! { "_id": &team.0 })
        .await?
        .ok_or_else(|| ApiError::not_found("Team not found"))?;
    let players = crate::team::roster(&data, &team.id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "team": TeamWithPlayers { team: TeamProfile::from(team), players }
    })))
}

// ─── SESSION ───────────────────────────────────────────────────────────────────

/// GET /auth/check-auth. Never fails: a bad or stale token simply reads as signed out.
pub async fn check_auth(req: HttpRequest, data: web::Data<AppState>) -> HttpResponse {
    let signed_out = || HttpResponse::Ok().json(json!({ "isAuthenticated": false }));
    let Ok(user) = caller(&req) else {
        return signed_out();
    };

    let filter = doc! { "_id": &user.id };
    let exists = match user.role {
        Role::Admin => data.mongodb.collection::<Admin>(ADMINS).find_one(filter).await.map(|a| a.is_some()),
        Role::Customer => data
            .mongodb
            .collection::<Customer>(CUSTOMERS)
            .find_one(filter)
            .await
            .map(|c| c.is_some_and(|c| !c.is_blocked())),
        Role::Team => data.mongodb.collection::<Team>(TEAMS).find_one(filter).await.map(|t| t.is_some()),
    };

    match exists {
        Ok(true) => HttpResponse::Ok().json(json!({ "isAuthenticated": true, "role": user.role })),
        Ok(false) => signed_out(),
        Err(e) => {
            warn!("check-auth lookup failed: {}", e);
            signed_out()
        }
    }
}

/// POST /auth/logout. Tokens are stateless; the client discards its copy.
pub async fn logout() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "Logged out successfully" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    const SECRET: &str = "test-secret";

    #[test]
    fn jwt_round_trip_keeps_subject_and_role() {
        let token = create_jwt("team-42", Role::Team, SECRET, 1).unwrap();
        let claims = validate_jwt(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "team-42");
        assert_eq!(claims.role, Role::Team);
    }

    #[test]
    fn jwt_with_wrong_secret_or_expired_is_rejected() {
        let token = create_jwt("c1", Role::Customer, SECRET, 1).unwrap();
        assert!(validate_jwt(&token, "other-secret").is_err());

        let expired = create_jwt("c1", Role::Customer, SECRET, -2).unwrap();
        assert!(validate_jwt(&expired, SECRET).is_err());
    }

    #[test]
    fn out_of_range_lifetime_is_an_error_not_a_panic() {
        let result = create_jwt("a1", Role::Admin, SECRET, i64::MAX);
        assert!(matches!(result, Err(ApiError::Internal(_))));
    }

    #[test]
    fn header_accepts_bearer_and_bare_tokens() {
        assert_eq!(token_from_header("Bearer abc.def"), Some("abc.def"));
        assert_eq!(token_from_header("abc.def"), Some("abc.def"));
        assert_eq!(token_from_header("Bearer "), None);
        assert_eq!(token_from_header(""), None);
    }

    #[test]
    fn role_extractors_enforce_role() {
        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(AuthUser { id: "c1".into(), role: Role::Customer });

        assert_eq!(caller_with_role(&req, Role::Customer).unwrap(), "c1");
        assert!(matches!(caller_with_role(&req, Role::Admin), Err(ApiError::Forbidden(_))));
    }

    #[test]
    fn missing_or_rejected_tokens_are_unauthorized() {
        let anonymous = TestRequest::default().to_http_request();
        assert!(matches!(caller(&anonymous), Err(ApiError::Unauthorized(_))));

        let rejected = TestRequest::default().to_http_request();
        rejected.extensions_mut().insert(TokenRejected("ExpiredSignature".into()));
        match caller(&rejected) {
            Err(ApiError::Unauthorized(msg)) => assert!(msg.contains("ExpiredSignature")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
