// src/registrar.rs

use std::fmt;
use std::sync::Arc;

use chrono::Utc;

use crate::config;
use crate::models::participant::{Identity, NewParticipant, Participant};
use crate::models::session::QuizResult;
use crate::notify::Notifier;
use crate::repos::participants::{ParticipantStore, StoreError};
use crate::utils::referral;

/// User-facing registration failure taxonomy: everything a handler needs
/// to pick a status code and a single inline message.
#[derive(Debug)]
pub enum RegistrationError {
    /// This identity (email or phone) already registered. Terminal.
    Duplicate,
    /// Backing store is missing its schema; operator intervention needed.
    StorageMisconfigured,
    /// Transient storage failure; safe to retry after user confirmation.
    StorageUnavailable(String),
    PermissionDenied,
    Unknown(String),
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::Duplicate => write!(f, "identity already registered"),
            RegistrationError::StorageMisconfigured => write!(f, "storage is misconfigured"),
            RegistrationError::StorageUnavailable(msg) => {
                write!(f, "storage unavailable: {}", msg)
            }
            RegistrationError::PermissionDenied => write!(f, "storage permission denied"),
            RegistrationError::Unknown(msg) => write!(f, "registration failed: {}", msg),
        }
    }
}

impl std::error::Error for RegistrationError {}

impl From<StoreError> for RegistrationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { .. } => RegistrationError::Duplicate,
            StoreError::TableMissing => RegistrationError::StorageMisconfigured,
            StoreError::PermissionDenied => RegistrationError::PermissionDenied,
            StoreError::Unavailable(msg) => RegistrationError::StorageUnavailable(msg),
            StoreError::Server(msg) => RegistrationError::Unknown(msg),
        }
    }
}

/// Registers finished quiz results as participants: one registration per
/// identity, referral linkage and bonus allocation, best-effort outbound
/// notification.
#[derive(Clone)]
pub struct Registrar {
    store: Arc<dyn ParticipantStore>,
    notifier: Option<Notifier>,
}

impl Registrar {
    pub fn new(store: Arc<dyn ParticipantStore>, notifier: Option<Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Runs the full registration protocol. No automatic retries: callers
    /// decide whether to offer one after a transient failure.
    pub async fn register(
        &self,
        identity: &Identity,
        result: &QuizResult,
        supplied_code: Option<&str>,
    ) -> Result<Participant, RegistrationError> {
        // Fast-path duplicate check. The unique constraints on the table
        // remain the authority under concurrent registration.
        let existing = self
            .store
            .find_by_identity(&identity.email, identity.phone.as_deref())
            .await?;
        if existing.is_some() {
            return Err(RegistrationError::Duplicate);
        }

        let referrer = match supplied_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => {
                let found = self.store.find_by_referral_code(code).await?;
                if found.is_none() {
                    // unknown codes degrade silently to "no referral"
                    tracing::debug!(code, "supplied referral code not found, ignoring");
                }
                found
            }
            None => None,
        };

        let bonus = if referrer.is_some() {
            config::REFEREE_BONUS_POINTS
        } else {
            0
        };

        let participant = self
            .insert_with_fresh_code(
                identity,
                result,
                referrer.as_ref().map(|r| r.id),
                bonus,
            )
            .await?;

        if let Some(referrer) = &referrer {
            // Best-effort, at most one attempt. The new participant is
            // already persisted either way.
            if let Err(err) = self
                .store
                .add_bonus_points(referrer.id, config::REFERRER_BONUS_POINTS)
                .await
            {
                tracing::warn!(
                    referrer_id = referrer.id,
                    error = %err,
                    "failed to credit referrer bonus"
                );
            }
        }

        if let Some(notifier) = &self.notifier {
            notifier.registration_completed(identity, result, &participant);
        }

        Ok(participant)
    }

    /// Inserts the row, regenerating the referral code on a code-constraint
    /// collision. An email/phone uniqueness violation surfaces as
    /// `Duplicate` (the fast-path check above raced with a concurrent
    /// insert).
    async fn insert_with_fresh_code(
        &self,
        identity: &Identity,
        result: &QuizResult,
        referred_by: Option<i64>,
        bonus: i64,
    ) -> Result<Participant, RegistrationError> {
        let mut last_collision = None;
        for _ in 0..config::CODE_INSERT_ATTEMPTS {
            let new = NewParticipant {
                name: identity.name.clone(),
                email: identity.email.clone(),
                phone: identity.phone.clone(),
                base_score_percent: result.score_percent,
                correct_count: result.correct_count as i64,
                total_questions: result.total_questions as i64,
                total_time_spent_seconds: result.total_time_spent_seconds,
                average_time_spent_seconds: result.average_time_spent_seconds,
                own_referral_code: referral::generate_code(Utc::now().timestamp_millis()),
                referred_by,
                referral_bonus_points: bonus,
            };
            match self.store.insert(&new).await {
                Ok(participant) => return Ok(participant),
                Err(err) if err.is_referral_code_collision() => {
                    tracing::warn!(
                        code = %new.own_referral_code,
                        "referral code collided, regenerating"
                    );
                    last_collision = Some(err);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(RegistrationError::Unknown(format!(
            "gave up after {} referral code collisions: {}",
            config::CODE_INSERT_ATTEMPTS,
            last_collision.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}
