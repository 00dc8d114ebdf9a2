use axum::extract::FromRef;

use crate::config::Config;
use crate::quiz::store::SessionStore;
use crate::ranking::RankingResolver;
use crate::registrar::Registrar;

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub registrar: Registrar,
    pub ranking: RankingResolver,
    pub config: Config,
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Registrar {
    fn from_ref(state: &AppState) -> Self {
        state.registrar.clone()
    }
}

impl FromRef<AppState> for RankingResolver {
    fn from_ref(state: &AppState) -> Self {
        state.ranking.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
