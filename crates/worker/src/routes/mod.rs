pub mod health;
pub mod runsync;

use axum::Router;

use crate::state::AppState;

/// All worker routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(runsync::router())
}
