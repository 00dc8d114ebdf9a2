// src/config.rs

use dotenvy::dotenv;
use std::env;
use url::Url;

/// Seconds a participant gets per question before the countdown expires.
pub const QUESTION_SECONDS: i64 = 30;

/// Bonus points granted to a new participant for registering with someone
/// else's referral code.
pub const REFEREE_BONUS_POINTS: i64 = 10;

/// Bonus points credited to the code's owner each time their code is used.
pub const REFERRER_BONUS_POINTS: i64 = 5;

pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;
pub const MAX_LEADERBOARD_LIMIT: i64 = 100;

/// Idle sessions are dropped after this many minutes.
pub const SESSION_TTL_MINUTES: i64 = 30;

/// Upper bound on insert attempts when generated referral codes keep
/// colliding with existing rows.
pub const CODE_INSERT_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub port: u16,
    pub questions_path: String,
    /// Finished registrations are POSTed here, fire-and-forget.
    pub webhook_url: Option<Url>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let questions_path =
            env::var("QUESTIONS_PATH").unwrap_or_else(|_| "questions.json".to_string());

        let webhook_url = env::var("REGISTRATION_WEBHOOK_URL")
            .ok()
            .map(|v| Url::parse(&v).expect("REGISTRATION_WEBHOOK_URL must be a valid URL"));

        Self {
            database_url,
            rust_log,
            port,
            questions_path,
            webhook_url,
        }
    }
}
