use crate::config::Config;
use crate::db::Repository;
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub repo: Repository,
    pub config: Config,
}

impl FromRef<AppState> for Repository {
    fn from_ref(state: &AppState) -> Self {
        state.repo.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
