use anyhow::{bail, Context, Result};
use std::env;

const DEV_JWT_SECRET: &str = "campus-dev-secret";

#[derive(Clone, Debug)]
pub struct AppConfig {
    // Server
    pub backend_port: u16,
    pub env_mode: String,
    pub cors_allowed_origins: Vec<String>,

    // Database
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub run_migrations: bool,

    // Authentication
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub bcrypt_cost: u32,

    // First admin account
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Clone, Debug)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let env_mode = env::var("ENV_MODE").unwrap_or_else(|_| "development".to_string());
        let development = env_mode == "development";

        // Require JWT_SECRET outside development; a fixed secret keeps local runs working.
        let jwt_secret = match non_empty("JWT_SECRET") {
            Some(secret) => secret,
            None if development => DEV_JWT_SECRET.to_string(),
            None => bail!("JWT_SECRET must be set when ENV_MODE is {}", env_mode),
        };

        let bootstrap_admin = match (non_empty("BOOTSTRAP_ADMIN_EMAIL"), non_empty("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                email,
                password,
                name: non_empty("BOOTSTRAP_ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            backend_port: parsed("BACKEND_PORT", 5000)?,
            env_mode,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),

            database_url: non_empty("DATABASE_URL"),
            db_max_connections: parsed("DB_MAX_CONNECTIONS", 10)?,
            run_migrations: parsed("RUN_MIGRATIONS", true)?,

            jwt_secret,
            jwt_expiry_hours: parsed("JWT_EXPIRY_HOURS", 24)?,
            bcrypt_cost: parsed("BCRYPT_COST", campus_database::utils::DEFAULT_BCRYPT_COST)?,

            bootstrap_admin,
        })
    }

    pub fn is_development(&self) -> bool {
        self.env_mode == "development"
    }

    /// Configuration for tests: in-memory store, cheap hashing.
    pub fn for_tests() -> Self {
        Self {
            backend_port: 0,
            env_mode: "test".to_string(),
            cors_allowed_origins: vec!["http://localhost:3000".to_string()],
            database_url: None,
            db_max_connections: 1,
            run_migrations: false,
            jwt_secret: "campus-test-secret".to_string(),
            jwt_expiry_hours: 1,
            bcrypt_cost: 4,
            bootstrap_admin: None,
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} has an invalid value `{}`", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_falls_back_and_reports_bad_values() {
        env::remove_var("CAMPUS_TEST_UNSET_PORT");
        assert_eq!(parsed("CAMPUS_TEST_UNSET_PORT", 5000u16).unwrap(), 5000);

        env::set_var("CAMPUS_TEST_BAD_PORT", "not-a-port");
        let err = parsed::<u16>("CAMPUS_TEST_BAD_PORT", 5000).unwrap_err();
        assert!(err.to_string().contains("CAMPUS_TEST_BAD_PORT"));
        env::remove_var("CAMPUS_TEST_BAD_PORT");
    }
}
