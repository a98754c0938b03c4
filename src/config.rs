// src/config.rs

use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    pub jwt_secret: String,

    /// Token lifetime (seconds) for a session-scoped login.
    pub jwt_expiration_session: u64,

    /// Token lifetime (seconds) when the user asked to stay signed in.
    pub jwt_expiration_durable: u64,

    /// Directory where uploaded images are stored and served from.
    pub uploads_dir: PathBuf,

    pub rust_log: String,

    /// Seed credentials for the admin account (created on startup if absent).
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_path = env::var("DATABASE_PATH")
            .unwrap_or_else(|_| "data/blog.db".to_string())
            .into();

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        // 12 hours unless "remember me" was checked, then 30 days.
        let jwt_expiration_session = env::var("JWT_EXPIRATION_SESSION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(43_200);

        let jwt_expiration_durable = env::var("JWT_EXPIRATION_DURABLE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2_592_000);

        let uploads_dir = env::var("UPLOADS_DIR")
            .unwrap_or_else(|_| "uploads".to_string())
            .into();

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let admin_email = env::var("ADMIN_EMAIL").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        Self {
            database_path,
            jwt_secret,
            jwt_expiration_session,
            jwt_expiration_durable,
            uploads_dir,
            rust_log,
            admin_email,
            admin_password,
        }
    }
}
