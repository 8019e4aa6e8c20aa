mod admin;
mod chat;
mod connect;
mod feed;
mod notifications;
mod profile;
mod reports;
mod users;

use axum::{middleware::from_fn_with_state, Router};

use crate::middleware::{require_admin, require_auth};
use crate::AppState;

/// Every API route. All of them need a verified ID token and `/admin`
/// additionally needs an admin account.
pub fn routes(state: AppState) -> Router<AppState> {
    let admin = admin::routes().route_layer(from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .nest("/user", users::routes())
        .nest("/profile", profile::routes())
        .nest("/feed", feed::routes())
        .nest("/connect", connect::routes())
        .nest("/chat", chat::routes())
        .nest("/notifications", notifications::routes())
        .nest("/reports", reports::routes())
        .nest("/admin", admin)
        .route_layer(from_fn_with_state(state, require_auth))
}
