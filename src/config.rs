use std::env;

use crate::mailer::MailConfig;

const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

#[derive(Clone)]
pub struct Config {
    pub mongo_uri: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bind_addr: String,
    pub frontend_origins: Vec<String>,
    pub seed_admin: bool,
    pub admin_username: String,
    pub admin_password: String,
    pub mail: Option<MailConfig>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let token_ttl_hours = token_ttl(env::var("TOKEN_TTL_HOURS").ok().as_deref());
        let seed_admin = env::var("SEED_ADMIN")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        Self {
            mongo_uri: env::var("MONGO_URI").expect("MONGO_URI must be set"),
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "dream_football".to_string()),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            token_ttl_hours,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string()),
            frontend_origins: parse_origins(
                &env::var("FRONTEND_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".to_string()),
            ),
            seed_admin,
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string()),
            mail: MailConfig::from_env(),
        }
    }
}

/// Token lifetime in hours, kept between one hour and a year.
fn token_ttl(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .map(|hours| hours.clamp(1, MAX_TOKEN_TTL_HOURS))
        .unwrap_or(DEFAULT_TOKEN_TTL_HOURS)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_split_and_trimmed() {
        let origins = parse_origins("https://dream-total.com, http://localhost:5173,,");
        assert_eq!(origins, vec!["https://dream-total.com", "http://localhost:5173"]);
    }

    #[test]
    fn token_ttl_is_clamped() {
        assert_eq!(token_ttl(None), 24);
        assert_eq!(token_ttl(Some("abc")), 24);
        assert_eq!(token_ttl(Some(" 48 ")), 48);
        assert_eq!(token_ttl(Some("0")), 1);
        assert_eq!(token_ttl(Some("-5")), 1);
        assert_eq!(token_ttl(Some("9223372036854775807")), MAX_TOKEN_TTL_HOURS);
    }
}
