// src/handlers/leaderboard.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{config, error::AppError, ranking::RankingResolver};

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

/// Top-N leaderboard, shared by the public page and the admin view.
pub async fn get_leaderboard(
    State(ranking): State<RankingResolver>,
    Query(params): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params
        .limit
        .unwrap_or(config::DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, config::MAX_LEADERBOARD_LIMIT);

    let entries = ranking.top(limit).await?;
    Ok(Json(entries))
}
