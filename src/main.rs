// src/main.rs
mod app_state;
mod auth;
mod booking;
mod config;
mod customer;
mod db;
mod error;
mod ground;
mod league;
mod mailer;
mod mailing;
mod middleware;
mod models;
mod reports;
mod requests;
mod review;
mod schedule;
mod statistics;
mod team;

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpResponse, HttpServer};
use env_logger::Env;
use log::info;

use crate::app_state::AppState;
use crate::auth::{
    admin_profile, check_auth, customer_profile, login_admin, login_customer, login_team, logout,
    register_admin, register_customer, register_team, team_profile,
};
use crate::booking::{add_booking, cancel_booking, change_status, delete_booking, get_bookings, update_booking};
use crate::customer::{get_customers, toggle_customer_status};
use crate::db::MongoDB;
use crate::ground::{add_reserved_time, create_ground, delete_ground, get_ground, get_grounds, update_ground};
use crate::league::{create_league, delete_league, get_league, get_leagues, update_league};
use crate::mailer::Mailer;
use crate::mailing::{add_email, get_contacts, get_emails, submit_contact};
use crate::middleware::Authentication;
use crate::reports::{get_financial_report, get_grounds_for_report, get_statistics};
use crate::requests::{express_interest, get_match_requests, get_team_requests, join_match_request};
use crate::review::{add_review, delete_review, get_reviews};
use crate::statistics::{get_players_statistics, get_teams_statistics};
use crate::team::{create_team, delete_team, get_team, get_teams, list_public_teams, update_team};

async fn index() -> HttpResponse {
    HttpResponse::Ok().body("Welcome to the Ground Booking API")
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env();
    let mongodb = Arc::new(
        MongoDB::init(&config.mongo_uri, &config.database_name)
            .await
            .map_err(io::Error::other)?,
    );
    mongodb.ensure_indexes().await.map_err(io::Error::other)?;
    if config.seed_admin {
        mongodb
            .seed_admin(&config.admin_username, &config.admin_password)
            .await
            .map_err(io::Error::other)?;
    }

    let mailer = Mailer::new(config.mail.clone());

    info!("Server running at http://{}", config.bind_addr);
    info!("Allowed CORS origins: {}", config.frontend_origins.join(", "));

    let bind_addr = config.bind_addr.clone();
    HttpServer::new(move || {
        let cors = config
            .frontend_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Authentication::new(&config.jwt_secret))
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(web::Data::new(AppState {
                mongodb: mongodb.clone(),
                config: config.clone(),
                mailer: mailer.clone(),
            }))
            .route("/", web::get().to(index))
            // PUBLIC LISTINGS
            .route("/all-grounds", web::get().to(get_grounds))
            .route("/all-reviews", web::get().to(get_reviews))
            .route("/general/grounds", web::get().to(get_grounds))
            .route("/players/statistics", web::get().to(get_players_statistics))
            // AUTH
            .service(
                web::scope("/auth")
                    .route("/admin/register", web::post().to(register_admin))
                    .route("/admin/login", web::post().to(login_admin))
                    .route("/admin/profile", web::get().to(admin_profile))
                    .route("/customer/register", web::post().to(register_customer))
                    .route("/customer/login", web::post().to(login_customer))
                    .route("/customer/profile", web::get().to(customer_profile))
                    .route("/team/register", web::post().to(register_team))
                    .route("/team/login", web::post().to(login_team))
                    .route("/team/profile", web::get().to(team_profile))
                    .route("/check-auth", web::get().to(check_auth))
                    .route("/logout", web::post().to(logout)),
            )
            // TEAMS
            .service(
                web::scope("/teams")
                    .route("/statistics", web::get().to(get_teams_statistics))
                    .route("/bookings", web::get().to(get_bookings))
                    .route("/bookings", web::post().to(add_booking))
                    .route("/grounds", web::get().to(get_grounds))
                    .route("/leagues", web::get().to(get_leagues))
                    .route("/leagues/{id}", web::get().to(get_league))
                    .route("", web::get().to(get_teams))
                    .route("", web::post().to(create_team))
                    .route("/{team_id}", web::get().to(get_team))
                    .route("/{team_id}", web::put().to(update_team))
                    .route("/{team_id}", web::delete().to(delete_team)),
            )
            // CUSTOMER
            .service(
                web::scope("/customer")
                    .route("/teams", web::get().to(list_public_teams))
                    .route("/teams/register", web::post().to(register_team))
                    .route("/teams/login", web::post().to(login_team))
                    .route("/teams/team-profile", web::get().to(team_profile))
                    .route("/match-requests", web::get().to(get_match_requests))
                    .route("/match-requests/{id}/join", web::post().to(join_match_request)),
            )
            .service(
                web::scope("/team-requests")
                    .route("", web::get().to(get_team_requests))
                    .route("/{id}/interest", web::post().to(express_interest)),
            )
            // BOOKINGS
            .service(
                web::scope("/bookings")
                    .route("", web::get().to(get_bookings))
                    .route("", web::post().to(add_booking))
                    .route("/{id}", web::put().to(update_booking))
                    .route("/{id}", web::delete().to(delete_booking))
                    .route("/{id}/cancel", web::patch().to(cancel_booking))
                    .route("/{id}/status", web::patch().to(change_status)),
            )
            // GROUNDS
            .service(
                web::scope("/grounds")
                    .route("", web::get().to(get_grounds))
                    .route("", web::post().to(create_ground))
                    .route("/{id}", web::get().to(get_ground))
                    .route("/{id}", web::put().to(update_ground))
                    .route("/{id}", web::delete().to(delete_ground)),
            )
            // LEAGUES
            .service(
                web::scope("/leagues")
                    .route("", web::get().to(get_leagues))
                    .route("", web::post().to(create_league))
                    .route("/{id}", web::get().to(get_league))
                    .route("/{id}", web::put().to(update_league))
                    .route("/{id}", web::delete().to(delete_league)),
            )
            // ADMIN
            .service(
                web::scope("/admin")
                    .route("/statistics", web::get().to(get_statistics))
                    .route("/financial-report", web::get().to(get_financial_report))
                    .route("/report-grounds", web::get().to(get_grounds_for_report))
                    .route("/customers", web::get().to(get_customers))
                    .route("/customers/{id}/status", web::patch().to(toggle_customer_status))
                    .route("/contacts", web::get().to(get_contacts))
                    .route("/reviews/{id}", web::delete().to(delete_review))
                    .route("/grounds/{id}/reserved-times", web::post().to(add_reserved_time)),
            )
            // COMMUNITY
            .route("/reviews", web::post().to(add_review))
            .route("/contact", web::post().to(submit_contact))
            .route("/email", web::get().to(get_emails))
            .route("/email", web::post().to(add_email))
    })
    .bind(bind_addr)?
    .run()
    .await
}
