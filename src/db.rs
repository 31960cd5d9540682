use log::info;
use mongodb::{
    bson::doc,
    options::{ClientOptions, IndexOptions},
    Client, Collection, Database, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::models::{Admin, Customer, Team};

pub const ADMINS: &str = "admins";
pub const CUSTOMERS: &str = "customers";
pub const TEAMS: &str = "teams";
pub const PLAYERS: &str = "players";
pub const GROUNDS: &str = "grounds";
pub const BOOKINGS: &str = "bookings";
pub const LEAGUES: &str = "leagues";
pub const REVIEWS: &str = "reviews";
pub const EMAILS: &str = "emails";
pub const CONTACTS: &str = "contacts";
pub const MATCH_REQUESTS: &str = "matchrequests";
pub const TEAM_REQUESTS: &str = "teamrequests";

pub struct MongoDB {
    pub db: Database,
}

impl MongoDB {
    pub async fn init(uri: &str, db_name: &str) -> mongodb::error::Result<Self> {
        let client_options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);
        Ok(MongoDB { db })
    }

    pub fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        self.db.collection::<T>(name)
    }

    /// Unique indexes backing the duplicate checks done in the handlers.
    pub async fn ensure_indexes(&self) -> mongodb::error::Result<()> {
        let unique = || IndexOptions::builder().unique(true).build();

        self.collection::<Team>(TEAMS)
            .create_index(IndexModel::builder().keys(doc! { "teamName": 1 }).options(unique()).build())
            .await?;
        self.collection::<Team>(TEAMS)
            .create_index(IndexModel::builder().keys(doc! { "email": 1 }).options(unique()).build())
            .await?;
        for key in ["email", "username"] {
            self.collection::<Customer>(CUSTOMERS)
                .create_index(IndexModel::builder().keys(doc! { key: 1 }).options(unique()).build())
                .await?;
        }
        self.collection::<Admin>(ADMINS)
            .create_index(IndexModel::builder().keys(doc! { "username": 1 }).options(unique()).build())
            .await?;
        self.collection::<mongodb::bson::Document>(BOOKINGS)
            .create_index(IndexModel::builder().keys(doc! { "ground": 1, "bookingDate": 1 }).build())
            .await?;

        info!("MongoDB indexes ensured");
        Ok(())
    }

    /// Creates the initial admin account unless one with that username exists.
    pub async fn seed_admin(&self, username: &str, password: &str) -> Result<bool, crate::error::ApiError> {
        let admins = self.collection::<Admin>(ADMINS);
        if admins.find_one(doc! { "username": username }).await?.is_some() {
            info!("Admin user '{}' already exists", username);
            return Ok(false);
        }
        let admin = Admin::new(username.to_string(), bcrypt::hash(password, bcrypt::DEFAULT_COST)?);
        admins.insert_one(&admin).await?;
        info!("Admin user '{}' created", username);
        Ok(true)
    }
}

/// Maps a unique-index violation to a 400 with `message`; other errors pass through.
pub fn duplicate_as_conflict(err: mongodb::error::Error, message: &str) -> crate::error::ApiError {
    use mongodb::error::{ErrorKind, WriteFailure};

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY => {
            crate::error::ApiError::Conflict(message.to_string())
        }
        _ => crate::error::ApiError::Database(err),
    }
}

const DUPLICATE_KEY: i32 = 11000;
