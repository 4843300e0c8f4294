use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::favorites::{FavoriteListingList, FavoriteStatus, RemoveFavoriteResponse},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Favorite,
    response::ApiResponse,
    routes::params::FavoriteListQuery,
    services::favorite_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/my", get(list_favorites))
        .route("/{listing_id}", post(add_favorite).delete(remove_favorite))
        .route("/{listing_id}/toggle", post(toggle_favorite))
}

#[utoipa::path(
    post,
    path = "/api/favorites/{listing_id}",
    params(("listing_id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Favorite saved or already present", body = ApiResponse<Favorite>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Listing not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn add_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(listing_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Favorite>>> {
    let resp = favorite_service::add_favorite(&state.pool, &user, listing_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/favorites/{listing_id}",
    params(("listing_id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Removal outcome; absent favorites report removed=false", body = ApiResponse<RemoveFavoriteResponse>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn remove_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(listing_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<RemoveFavoriteResponse>>> {
    let resp = favorite_service::remove_favorite(&state.pool, &user, listing_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/favorites/{listing_id}/toggle",
    params(("listing_id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Flip favorite state", body = ApiResponse<FavoriteStatus>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Listing not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn toggle_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(listing_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<FavoriteStatus>>> {
    let resp = favorite_service::toggle_favorite(&state.pool, &user, listing_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/favorites/my",
    params(
        ("brand" = Option<String>, Query, description = "Filter by brand"),
        ("model" = Option<String>, Query, description = "Filter by model"),
        ("agency_id" = Option<Uuid>, Query, description = "Filter by agency"),
        ("min_price" = Option<f64>, Query, description = "Minimum price"),
        ("max_price" = Option<f64>, Query, description = "Maximum price")
    ),
    responses(
        (status = 200, description = "List saved listings", body = ApiResponse<FavoriteListingList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn list_favorites(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<FavoriteListQuery>,
) -> AppResult<Json<ApiResponse<FavoriteListingList>>> {
    let resp = favorite_service::list_favorites(&state.pool, &user, query).await?;
    Ok(Json(resp))
}
