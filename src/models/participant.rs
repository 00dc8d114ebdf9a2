// src/models/participant.rs

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents one row of the 'participants' table: a completed, registered
/// quiz attempt tied to a unique identity.
///
/// No two rows share an email, and no two rows share a non-null phone.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Participant {
    pub id: i64,

    pub name: String,

    /// Unique across all participants.
    pub email: String,

    /// Unique across all participants when present.
    pub phone: Option<String>,

    /// The quiz score, 0..=100.
    pub base_score_percent: f64,

    pub correct_count: i64,
    pub total_questions: i64,
    pub total_time_spent_seconds: i64,
    pub average_time_spent_seconds: f64,

    /// Unique, generated at registration time.
    pub own_referral_code: String,

    /// Set when the participant registered with another participant's code.
    pub referred_by: Option<i64>,

    /// Never decreases; bumped by later registrations that used this
    /// participant's code.
    pub referral_bonus_points: i64,

    pub created_at: Option<DateTime<Utc>>,
}

/// Insert payload for a new participant row.
#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub base_score_percent: f64,
    pub correct_count: i64,
    pub total_questions: i64,
    pub total_time_spent_seconds: i64,
    pub average_time_spent_seconds: f64,
    pub own_referral_code: String,
    pub referred_by: Option<i64>,
    pub referral_bonus_points: i64,
}

/// The identity a lead supplies on the registration form.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Leaderboard projection of a participant plus the computed total score.
/// Recomputed per query, never persisted.
#[derive(Debug, Serialize)]
pub struct RankingEntry {
    pub name: String,
    pub base_points: f64,
    pub bonus_points: i64,
    pub total_points: f64,
    pub time_spent_seconds: i64,
    pub correct_count: i64,
    pub total_questions: i64,
    pub own_referral_code: String,
}

impl From<&Participant> for RankingEntry {
    fn from(p: &Participant) -> Self {
        RankingEntry {
            name: p.name.clone(),
            base_points: p.base_score_percent,
            bonus_points: p.referral_bonus_points,
            total_points: p.base_score_percent + p.referral_bonus_points as f64,
            time_spent_seconds: p.total_time_spent_seconds,
            correct_count: p.correct_count,
            total_questions: p.total_questions,
            own_referral_code: p.own_referral_code.clone(),
        }
    }
}

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 ()\-]{5,19}$").unwrap());

/// DTO for registering a finished session as a participant.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    pub session_id: String,

    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters."
    ))]
    pub name: String,

    #[validate(email(message = "A valid email address is required."))]
    pub email: String,

    #[validate(regex(path = *PHONE_RE, message = "Phone number format is invalid."))]
    pub phone: Option<String>,

    /// Another participant's referral code. Unknown codes are ignored.
    #[validate(length(max = 16))]
    pub referral_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// The freshly generated code the new participant can share.
    pub referral_code: String,
    pub participant: Participant,
}
