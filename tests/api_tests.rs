// tests/api_tests.rs

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use quiz_funnel::config::Config;
use quiz_funnel::models::participant::{NewParticipant, Participant};
use quiz_funnel::models::question::{Difficulty, Question};
use quiz_funnel::quiz::bank::QuestionBank;
use quiz_funnel::quiz::store::SessionStore;
use quiz_funnel::ranking::RankingResolver;
use quiz_funnel::registrar::Registrar;
use quiz_funnel::repos::participants::{ParticipantStore, StoreError};
use quiz_funnel::routes;
use quiz_funnel::state::AppState;

/// In-memory participant store mirroring the uniqueness rules of the real
/// schema, so the whole funnel can be exercised without Postgres.
#[derive(Default)]
struct MemoryStore {
    rows: Mutex<Vec<Participant>>,
    next_id: AtomicI64,
}

#[async_trait]
impl ParticipantStore for MemoryStore {
    async fn find_by_identity(
        &self,
        email: &str,
        phone: Option<&str>,
    ) -> Result<Option<Participant>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.email == email || (phone.is_some() && p.phone.as_deref() == phone))
            .cloned())
    }

    async fn find_by_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<Participant>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.own_referral_code == code)
            .cloned())
    }

    async fn insert(&self, new: &NewParticipant) -> Result<Participant, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|p| p.email == new.email) {
            return Err(StoreError::DuplicateKey {
                constraint: Some("participants_email_key".to_string()),
            });
        }
        if new.phone.is_some() && rows.iter().any(|p| p.phone == new.phone) {
            return Err(StoreError::DuplicateKey {
                constraint: Some("participants_phone_key".to_string()),
            });
        }
        if rows
            .iter()
            .any(|p| p.own_referral_code == new.own_referral_code)
        {
            return Err(StoreError::DuplicateKey {
                constraint: Some("participants_referral_code_key".to_string()),
            });
        }
        let participant = Participant {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            name: new.name.clone(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            base_score_percent: new.base_score_percent,
            correct_count: new.correct_count,
            total_questions: new.total_questions,
            total_time_spent_seconds: new.total_time_spent_seconds,
            average_time_spent_seconds: new.average_time_spent_seconds,
            own_referral_code: new.own_referral_code.clone(),
            referred_by: new.referred_by,
            referral_bonus_points: new.referral_bonus_points,
            created_at: Some(Utc::now()),
        };
        rows.push(participant.clone());
        Ok(participant)
    }

    async fn add_bonus_points(&self, id: i64, delta: i64) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(p) = rows.iter_mut().find(|p| p.id == id) {
            p.referral_bonus_points += delta;
        }
        Ok(())
    }

    async fn list_top(&self, limit: i64) -> Result<Vec<Participant>, StoreError> {
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by(|a, b| {
            b.base_score_percent
                .partial_cmp(&a.base_score_percent)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.total_time_spent_seconds.cmp(&b.total_time_spent_seconds))
        });
        rows.truncate(limit as usize);
        Ok(rows)
    }
}

fn test_bank() -> Arc<QuestionBank> {
    let questions = (0..2)
        .map(|i| Question {
            id: i + 1,
            prompt: format!("Question {}", i + 1),
            options: vec![
                "A".to_string(),
                "B".to_string(),
                "C".to_string(),
                "D".to_string(),
            ],
            correct_option_index: 0,
            explanation: "A is the answer.".to_string(),
            difficulty: Difficulty::Easy,
        })
        .collect();
    Arc::new(QuestionBank::from_questions(questions).expect("test bank"))
}

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL and a handle to the in-memory store.
async fn spawn_app() -> (String, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let participant_store: Arc<dyn ParticipantStore> = Arc::clone(&store);

    let config = Config {
        database_url: "postgres://unused-in-tests".to_string(),
        rust_log: "error".to_string(),
        port: 0,
        questions_path: "questions.json".to_string(),
        webhook_url: None,
    };

    let state = AppState {
        sessions: SessionStore::new(test_bank()),
        registrar: Registrar::new(Arc::clone(&participant_store), None),
        ranking: RankingResolver::new(participant_store),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, store)
}

/// Plays a full 2-question session, answering with the given options, and
/// returns the session id plus the final result payload.
async fn run_full_quiz(
    client: &reqwest::Client,
    address: &str,
    picks: [usize; 2],
) -> (String, serde_json::Value) {
    let started: serde_json::Value = client
        .post(format!("{}/api/quiz/start", address))
        .send()
        .await
        .expect("start request")
        .json()
        .await
        .expect("start json");
    let session_id = started["session_id"].as_str().expect("session id").to_string();

    let mut last = serde_json::Value::Null;
    for pick in picks {
        client
            .post(format!("{}/api/quiz/{}/answer", address, session_id))
            .json(&serde_json::json!({ "option_index": pick }))
            .send()
            .await
            .expect("answer request");
        last = client
            .post(format!("{}/api/quiz/{}/advance", address, session_id))
            .json(&serde_json::json!({}))
            .send()
            .await
            .expect("advance request")
            .json()
            .await
            .expect("advance json");
    }

    assert_eq!(last["finished"], true, "quiz should be finished");
    (session_id, last["result"].clone())
}

#[tokio::test]
async fn unknown_routes_return_404() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn starting_a_quiz_serves_the_first_question_without_answers() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/quiz/start", address))
        .send()
        .await
        .expect("start request");
    assert_eq!(response.status().as_u16(), 201);

    let body: serde_json::Value = response.json().await.expect("json");
    assert_eq!(body["question_number"], 1);
    assert_eq!(body["total_questions"], 2);
    assert_eq!(body["seconds_per_question"], 30);
    assert_eq!(body["question"]["prompt"], "Question 1");
    // the DTO must not leak the correct index or the explanation
    assert!(body["question"].get("correct_option_index").is_none());
    assert!(body["question"].get("explanation").is_none());
}

#[tokio::test]
async fn the_session_view_reports_progress_and_remaining_time() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    let started: serde_json::Value = client
        .post(format!("{}/api/quiz/start", address))
        .send()
        .await
        .expect("start")
        .json()
        .await
        .expect("json");
    let session_id = started["session_id"].as_str().expect("id");

    let view: serde_json::Value = client
        .get(format!("{}/api/quiz/{}", address, session_id))
        .send()
        .await
        .expect("view")
        .json()
        .await
        .expect("json");

    assert_eq!(view["state"], "in_progress");
    assert_eq!(view["question_number"], 1);
    assert_eq!(view["answered"], false);
    let remaining = view["remaining_seconds"].as_i64().expect("remaining");
    assert!((0..=30).contains(&remaining));
}

#[tokio::test]
async fn a_full_run_produces_the_expected_result() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    // first answer correct, second wrong
    let (_session_id, result) = run_full_quiz(&client, &address, [0, 2]).await;

    assert_eq!(result["total_questions"], 2);
    assert_eq!(result["correct_count"], 1);
    assert_eq!(result["wrong_count"], 1);
    assert_eq!(result["score_percent"], 50.0);
}

#[tokio::test]
async fn answering_reveals_the_verdict_and_explanation() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    let started: serde_json::Value = client
        .post(format!("{}/api/quiz/start", address))
        .send()
        .await
        .expect("start")
        .json()
        .await
        .expect("json");
    let session_id = started["session_id"].as_str().expect("id");

    let answer: serde_json::Value = client
        .post(format!("{}/api/quiz/{}/answer", address, session_id))
        .json(&serde_json::json!({ "option_index": 0 }))
        .send()
        .await
        .expect("answer")
        .json()
        .await
        .expect("json");

    assert_eq!(answer["is_correct"], true);
    assert_eq!(answer["correct_option_index"], 0);
    assert_eq!(answer["explanation"], "A is the answer.");
}

#[tokio::test]
async fn an_out_of_range_option_is_a_bad_request() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    let started: serde_json::Value = client
        .post(format!("{}/api/quiz/start", address))
        .send()
        .await
        .expect("start")
        .json()
        .await
        .expect("json");
    let session_id = started["session_id"].as_str().expect("id");

    let response = client
        .post(format!("{}/api/quiz/{}/answer", address, session_id))
        .json(&serde_json::json!({ "option_index": 9 }))
        .send()
        .await
        .expect("answer");
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn an_unknown_session_is_not_found() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/quiz/not-a-session", address))
        .send()
        .await
        .expect("view");
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn registration_requires_a_finished_session() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    let started: serde_json::Value = client
        .post(format!("{}/api/quiz/start", address))
        .send()
        .await
        .expect("start")
        .json()
        .await
        .expect("json");
    let session_id = started["session_id"].as_str().expect("id");

    let response = client
        .post(format!("{}/api/register", address))
        .json(&serde_json::json!({
            "session_id": session_id,
            "name": "Too Early",
            "email": "early@example.com"
        }))
        .send()
        .await
        .expect("register");
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn registration_validates_the_email() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    let (session_id, _result) = run_full_quiz(&client, &address, [0, 0]).await;

    let response = client
        .post(format!("{}/api/register", address))
        .json(&serde_json::json!({
            "session_id": session_id,
            "name": "No Email",
            "email": "not-an-email"
        }))
        .send()
        .await
        .expect("register");
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn a_finished_session_registers_once_and_only_once() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();
    let email = format!("u_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8]);

    let (session_id, _result) = run_full_quiz(&client, &address, [0, 0]).await;

    let response = client
        .post(format!("{}/api/register", address))
        .json(&serde_json::json!({
            "session_id": session_id,
            "name": "First Finisher",
            "email": email
        }))
        .send()
        .await
        .expect("register");
    assert_eq!(response.status().as_u16(), 201);

    let body: serde_json::Value = response.json().await.expect("json");
    let code = body["referral_code"].as_str().expect("code");
    assert_eq!(code.len(), 8);
    assert_eq!(body["participant"]["base_score_percent"], 100.0);

    // same identity, new session: rejected as a duplicate
    let (second_session, _result) = run_full_quiz(&client, &address, [0, 2]).await;
    let response = client
        .post(format!("{}/api/register", address))
        .json(&serde_json::json!({
            "session_id": second_session,
            "name": "First Finisher",
            "email": email
        }))
        .send()
        .await
        .expect("register again");
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn referral_codes_award_both_sides_and_rank_accordingly() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();

    // Alice registers with a perfect score
    let (alice_session, _result) = run_full_quiz(&client, &address, [0, 0]).await;
    let alice: serde_json::Value = client
        .post(format!("{}/api/register", address))
        .json(&serde_json::json!({
            "session_id": alice_session,
            "name": "Alice",
            "email": "alice@example.com"
        }))
        .send()
        .await
        .expect("register alice")
        .json()
        .await
        .expect("json");
    let alice_code = alice["referral_code"].as_str().expect("alice code");

    // Bob registers with Alice's code, also perfect
    let (bob_session, _result) = run_full_quiz(&client, &address, [0, 0]).await;
    let bob: serde_json::Value = client
        .post(format!("{}/api/register", address))
        .json(&serde_json::json!({
            "session_id": bob_session,
            "name": "Bob",
            "email": "bob@example.com",
            "referral_code": alice_code
        }))
        .send()
        .await
        .expect("register bob")
        .json()
        .await
        .expect("json");
    assert_eq!(bob["participant"]["referral_bonus_points"], 10);

    // Alice's stored bonus went up by exactly 5
    let alice_row = store
        .find_by_referral_code(alice_code)
        .await
        .expect("lookup")
        .expect("alice row");
    assert_eq!(alice_row.referral_bonus_points, 5);

    // Bob's 100 + 10 outranks Alice's 100 + 5
    let leaderboard: serde_json::Value = client
        .get(format!("{}/api/leaderboard?limit=10", address))
        .send()
        .await
        .expect("leaderboard")
        .json()
        .await
        .expect("json");
    let entries = leaderboard.as_array().expect("array");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["name"], "Bob");
    assert_eq!(entries[0]["total_points"], 110.0);
    assert_eq!(entries[1]["name"], "Alice");
    assert_eq!(entries[1]["total_points"], 105.0);
}

#[tokio::test]
async fn an_unknown_referral_code_does_not_block_registration() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    let (session_id, _result) = run_full_quiz(&client, &address, [0, 2]).await;

    let response = client
        .post(format!("{}/api/register", address))
        .json(&serde_json::json!({
            "session_id": session_id,
            "name": "No Referrer",
            "email": "loner@example.com",
            "referral_code": "ZZZZZZZZ"
        }))
        .send()
        .await
        .expect("register");
    assert_eq!(response.status().as_u16(), 201);

    let body: serde_json::Value = response.json().await.expect("json");
    assert_eq!(body["participant"]["referral_bonus_points"], 0);
    assert!(body["participant"]["referred_by"].is_null());
}

#[tokio::test]
async fn a_registered_session_is_torn_down() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    let (session_id, _result) = run_full_quiz(&client, &address, [0, 0]).await;

    client
        .post(format!("{}/api/register", address))
        .json(&serde_json::json!({
            "session_id": session_id,
            "name": "Done",
            "email": "done@example.com"
        }))
        .send()
        .await
        .expect("register");

    let response = client
        .get(format!("{}/api/quiz/{}", address, session_id))
        .send()
        .await
        .expect("view");
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn deleting_a_session_tears_it_down() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    let started: serde_json::Value = client
        .post(format!("{}/api/quiz/start", address))
        .send()
        .await
        .expect("start")
        .json()
        .await
        .expect("json");
    let session_id = started["session_id"].as_str().expect("id");

    let response = client
        .delete(format!("{}/api/quiz/{}", address, session_id))
        .send()
        .await
        .expect("delete");
    assert_eq!(response.status().as_u16(), 204);

    let response = client
        .get(format!("{}/api/quiz/{}", address, session_id))
        .send()
        .await
        .expect("view");
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn restarting_returns_to_the_first_question() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    let started: serde_json::Value = client
        .post(format!("{}/api/quiz/start", address))
        .send()
        .await
        .expect("start")
        .json()
        .await
        .expect("json");
    let session_id = started["session_id"].as_str().expect("id");

    client
        .post(format!("{}/api/quiz/{}/answer", address, session_id))
        .json(&serde_json::json!({ "option_index": 0 }))
        .send()
        .await
        .expect("answer");
    client
        .post(format!("{}/api/quiz/{}/advance", address, session_id))
        .json(&serde_json::json!({}))
        .send()
        .await
        .expect("advance");

    let restarted: serde_json::Value = client
        .post(format!("{}/api/quiz/{}/restart", address, session_id))
        .send()
        .await
        .expect("restart")
        .json()
        .await
        .expect("json");
    assert_eq!(restarted["question_number"], 1);

    let view: serde_json::Value = client
        .get(format!("{}/api/quiz/{}", address, session_id))
        .send()
        .await
        .expect("view")
        .json()
        .await
        .expect("json");
    assert_eq!(view["question_number"], 1);
    assert_eq!(view["answered"], false);
}

#[tokio::test]
async fn the_leaderboard_is_empty_without_participants() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    let leaderboard: serde_json::Value = client
        .get(format!("{}/api/leaderboard", address))
        .send()
        .await
        .expect("leaderboard")
        .json()
        .await
        .expect("json");
    assert_eq!(leaderboard.as_array().expect("array").len(), 0);
}
