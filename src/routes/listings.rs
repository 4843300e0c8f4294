use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::listings::{
        CreateListingRequest, ListingCard, ListingCardList, UpdateListingRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Listing,
    response::ApiResponse,
    routes::params::ListingQuery,
    services::listing_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(browse_listings).post(create_listing))
        .route("/{id}", get(get_listing))
        .route("/{id}", patch(update_listing))
        .route("/{id}", delete(delete_listing))
        .route("/{id}/cancel", post(cancel_listing))
        .route("/{id}/activate", post(activate_listing))
}

#[utoipa::path(
    get,
    path = "/api/listings",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search brand or model"),
        ("brand" = Option<String>, Query, description = "Filter by brand"),
        ("model" = Option<String>, Query, description = "Filter by model"),
        ("agency_id" = Option<Uuid>, Query, description = "Filter by agency"),
        ("min_price" = Option<f64>, Query, description = "Minimum price"),
        ("max_price" = Option<f64>, Query, description = "Maximum price"),
        ("sort" = Option<String>, Query, description = "Sort: price_asc, price_desc, newest")
    ),
    responses(
        (status = 200, description = "Browse active listings", body = ApiResponse<ListingCardList>)
    ),
    tag = "Listings"
)]
pub async fn browse_listings(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Query(query): Query<ListingQuery>,
) -> AppResult<Json<ApiResponse<ListingCardList>>> {
    let resp = listing_service::browse_listings(&state, user.as_ref(), query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/listings/{id}",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing detail", body = ApiResponse<ListingCard>),
        (status = 404, description = "Not Found")
    ),
    tag = "Listings"
)]
pub async fn get_listing(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ListingCard>>> {
    let resp = listing_service::get_listing(&state, user.as_ref(), id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/listings",
    request_body = CreateListingRequest,
    responses(
        (status = 200, description = "Create listing from inventory", body = ApiResponse<Listing>),
        (status = 400, description = "Invalid price, stock or currency"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Inventory item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Listings"
)]
pub async fn create_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateListingRequest>,
) -> AppResult<Json<ApiResponse<Listing>>> {
    let resp = listing_service::create_listing(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/listings/{id}",
    params(("id" = Uuid, Path, description = "Listing ID")),
    request_body = UpdateListingRequest,
    responses(
        (status = 200, description = "Update listing", body = ApiResponse<Listing>),
        (status = 403, description = "Listing belongs to another agency"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Listings"
)]
pub async fn update_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateListingRequest>,
) -> AppResult<Json<ApiResponse<Listing>>> {
    let resp = listing_service::update_listing(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/listings/{id}/cancel",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Hide listing from the catalog", body = ApiResponse<Listing>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Listings"
)]
pub async fn cancel_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Listing>>> {
    let resp = listing_service::set_listing_active(&state, &user, id, false).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/listings/{id}/activate",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Return listing to the catalog", body = ApiResponse<Listing>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Listings"
)]
pub async fn activate_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Listing>>> {
    let resp = listing_service::set_listing_active(&state, &user, id, true).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/listings/{id}",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Delete listing without purchases", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Listing has purchases"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Listings"
)]
pub async fn delete_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = listing_service::delete_listing(&state, &user, id).await?;
    Ok(Json(resp))
}
