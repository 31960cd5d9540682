use crate::config::Config;
use crate::db::MongoDB;
use crate::mailer::Mailer;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub mongodb: Arc<MongoDB>,
    pub config: Config,
    pub mailer: Mailer,
}
