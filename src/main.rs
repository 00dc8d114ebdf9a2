// src/main.rs

use dotenvy::dotenv;
use quiz_funnel::config::Config;
use quiz_funnel::notify::Notifier;
use quiz_funnel::quiz::bank::QuestionBank;
use quiz_funnel::quiz::store::SessionStore;
use quiz_funnel::ranking::RankingResolver;
use quiz_funnel::registrar::Registrar;
use quiz_funnel::repos::participants::{ParticipantStore, PgParticipantStore};
use quiz_funnel::routes;
use quiz_funnel::state::AppState;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Load the question bank once; it is immutable for the process lifetime.
    let bank = match QuestionBank::load(&config.questions_path) {
        Ok(bank) if !bank.is_empty() => Arc::new(bank),
        Ok(_) => panic!(
            "Question bank '{}' contains no questions",
            config.questions_path
        ),
        Err(e) => panic!(
            "Failed to load question bank '{}': {}",
            config.questions_path, e
        ),
    };
    tracing::info!(
        "Loaded {} questions from {}",
        bank.len(),
        config.questions_path
    );

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!(
                    "Database not ready, retrying in 2s... (Attempt {})",
                    retry_count
                );
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    let store: Arc<dyn ParticipantStore> = Arc::new(PgParticipantStore::new(pool));
    let notifier = config.webhook_url.clone().map(Notifier::new);

    // Create AppState
    let state = AppState {
        sessions: SessionStore::new(Arc::clone(&bank)),
        registrar: Registrar::new(Arc::clone(&store), notifier),
        ranking: RankingResolver::new(store),
        config: config.clone(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    // Start the server
    axum::serve(listener, app).await.unwrap();
}
