// src/repos/participants.rs

use std::fmt;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::participant::{NewParticipant, Participant};

/// Storage-layer failure classes the rest of the system cares about. The
/// registrar translates these into its user-facing taxonomy.
#[derive(Debug)]
pub enum StoreError {
    /// Unique constraint violation. Carries the constraint name when the
    /// backend reports one, so identity duplicates can be told apart from
    /// referral-code collisions.
    DuplicateKey { constraint: Option<String> },
    /// The participants table (or schema) is missing entirely.
    TableMissing,
    PermissionDenied,
    /// Transient: pool exhausted, connection refused, network trouble.
    Unavailable(String),
    /// Anything else the server reported.
    Server(String),
}

impl StoreError {
    pub fn is_referral_code_collision(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { constraint: Some(c) } if c.contains("referral_code"))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::DuplicateKey {
                constraint: Some(c),
            } => write!(f, "duplicate key ({})", c),
            StoreError::DuplicateKey { constraint: None } => write!(f, "duplicate key"),
            StoreError::TableMissing => write!(f, "participants table is missing"),
            StoreError::PermissionDenied => write!(f, "storage permission denied"),
            StoreError::Unavailable(msg) => write!(f, "storage unavailable: {}", msg),
            StoreError::Server(msg) => write!(f, "storage server error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// The registrar's and ranking resolver's view of persistent storage. Kept
/// narrow so tests can swap in an in-memory implementation.
#[async_trait]
pub trait ParticipantStore: Send + Sync {
    /// Looks up a participant by email or, when present, phone.
    async fn find_by_identity(
        &self,
        email: &str,
        phone: Option<&str>,
    ) -> Result<Option<Participant>, StoreError>;

    async fn find_by_referral_code(&self, code: &str)
    -> Result<Option<Participant>, StoreError>;

    async fn insert(&self, new: &NewParticipant) -> Result<Participant, StoreError>;

    /// Atomic in-place increment of a participant's bonus points.
    async fn add_bonus_points(&self, id: i64, delta: i64) -> Result<(), StoreError>;

    /// Up to `limit` participants ordered by base score descending, total
    /// time ascending. The final leaderboard ordering happens in the
    /// resolver.
    async fn list_top(&self, limit: i64) -> Result<Vec<Participant>, StoreError>;
}

const PARTICIPANT_COLUMNS: &str = "id, name, email, phone, base_score_percent, correct_count, \
     total_questions, total_time_spent_seconds, average_time_spent_seconds, own_referral_code, \
     referred_by, referral_bonus_points, created_at";

/// Postgres-backed implementation used in production.
#[derive(Clone)]
pub struct PgParticipantStore {
    pool: PgPool,
}

impl PgParticipantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParticipantStore for PgParticipantStore {
    async fn find_by_identity(
        &self,
        email: &str,
        phone: Option<&str>,
    ) -> Result<Option<Participant>, StoreError> {
        let query = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants \
             WHERE email = $1 OR (phone IS NOT NULL AND phone = $2) \
             LIMIT 1"
        );
        sqlx::query_as::<_, Participant>(&query)
            .bind(email)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }

    async fn find_by_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<Participant>, StoreError> {
        let query =
            format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE own_referral_code = $1");
        sqlx::query_as::<_, Participant>(&query)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }

    async fn insert(&self, new: &NewParticipant) -> Result<Participant, StoreError> {
        let query = format!(
            "INSERT INTO participants \
             (name, email, phone, base_score_percent, correct_count, total_questions, \
              total_time_spent_seconds, average_time_spent_seconds, own_referral_code, \
              referred_by, referral_bonus_points) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {PARTICIPANT_COLUMNS}"
        );
        sqlx::query_as::<_, Participant>(&query)
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.phone)
            .bind(new.base_score_percent)
            .bind(new.correct_count)
            .bind(new.total_questions)
            .bind(new.total_time_spent_seconds)
            .bind(new.average_time_spent_seconds)
            .bind(&new.own_referral_code)
            .bind(new.referred_by)
            .bind(new.referral_bonus_points)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)
    }

    async fn add_bonus_points(&self, id: i64, delta: i64) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE participants SET referral_bonus_points = referral_bonus_points + $2 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(delta)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn list_top(&self, limit: i64) -> Result<Vec<Participant>, StoreError> {
        let query = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants \
             ORDER BY base_score_percent DESC, total_time_spent_seconds ASC \
             LIMIT $1"
        );
        sqlx::query_as::<_, Participant>(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)
    }
}

/// Maps sqlx failures onto the storage taxonomy. Postgres error codes:
/// 23505 unique_violation, 42P01 undefined_table, 42501 insufficient_privilege.
fn classify(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23505") => StoreError::DuplicateKey {
                constraint: db.constraint().map(str::to_string),
            },
            Some("42P01") => StoreError::TableMissing,
            Some("42501") => StoreError::PermissionDenied,
            _ => StoreError::Server(db.to_string()),
        },
        e @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed) => {
            StoreError::Unavailable(e.to_string())
        }
        sqlx::Error::Io(io) => StoreError::Unavailable(io.to_string()),
        other => StoreError::Server(other.to_string()),
    }
}
