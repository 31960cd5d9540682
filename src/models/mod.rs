mod booking;
mod community;
mod ground;
mod league;
mod team;
mod user;

pub use booking::*;
pub use community::*;
pub use ground::*;
pub use league::*;
pub use team::*;
pub use user::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fresh document id. Every collection keys its `_id` with a v4 UUID string.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// An image already uploaded to the image host.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ImageRef {
    pub url: Option<String>,
    pub filename: Option<String>,
}
