// src/notify.rs

use std::time::Duration;

use serde_json::json;
use url::Url;

use crate::models::participant::{Identity, Participant};
use crate::models::session::QuizResult;

/// Pushes finished registrations to the configured automation hook.
///
/// Fire and forget: one attempt, no retry, failures are logged and never
/// reach the registration flow.
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    endpoint: Url,
}

impl Notifier {
    pub fn new(endpoint: Url) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("failed to build HTTP client");
        Self { client, endpoint }
    }

    pub fn registration_completed(
        &self,
        identity: &Identity,
        result: &QuizResult,
        participant: &Participant,
    ) {
        let payload = json!({
            "identity": identity,
            "result": result,
            "referral_code": participant.own_referral_code,
        });
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        tokio::spawn(async move {
            match client.post(endpoint.clone()).json(&payload).send().await {
                Ok(resp) if !resp.status().is_success() => {
                    tracing::warn!(
                        status = %resp.status(),
                        %endpoint,
                        "registration webhook rejected the payload"
                    );
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, %endpoint, "registration webhook failed");
                }
            }
        });
    }
}
