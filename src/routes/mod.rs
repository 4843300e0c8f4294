use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod agencies;
pub mod auth;
pub mod car_models;
pub mod doc;
pub mod favorites;
pub mod health;
pub mod listings;
pub mod params;
pub mod purchases;
pub mod reviews;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/listings", listings::router())
        .nest("/favorites", favorites::router())
        .nest("/purchases", purchases::router())
        .nest("/reviews", reviews::router())
        .nest("/car-models", car_models::router())
        .nest("/agencies", agencies::router())
        .nest("/admin", admin::router())
}
