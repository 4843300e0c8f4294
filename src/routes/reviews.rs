use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::reviews::{
        CreateReviewRequest, ListingReviewList, MyReviewList, UpdateReviewRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Review,
    response::ApiResponse,
    routes::params::{MyReviewQuery, Pagination},
    services::review_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_review))
        .route("/my", get(list_my_reviews))
        .route("/by-listing/{listing_id}", get(list_listing_reviews))
        .route("/{review_id}", put(update_review))
}

#[utoipa::path(
    post,
    path = "/api/reviews",
    request_body = CreateReviewRequest,
    responses(
        (status = 200, description = "Review recorded against the listing's car model", body = ApiResponse<Review>),
        (status = 400, description = "Rating out of range"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Listing not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let resp = review_service::create_review(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/reviews/by-listing/{listing_id}",
    params(
        ("listing_id" = Uuid, Path, description = "Listing ID"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "Reviews for the listing's car model", body = ApiResponse<ListingReviewList>)
    ),
    tag = "Reviews"
)]
pub async fn list_listing_reviews(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ListingReviewList>>> {
    let resp = review_service::list_listing_reviews(&state, listing_id, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/reviews/{review_id}",
    params(("review_id" = Uuid, Path, description = "Review ID")),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Update own review", body = ApiResponse<Review>),
        (status = 400, description = "Rating out of range"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn update_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(review_id): Path<Uuid>,
    Json(payload): Json<UpdateReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let resp = review_service::update_review(&state, &user, review_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/reviews/my",
    params(
        ("brand" = Option<String>, Query, description = "Filter by brand"),
        ("model" = Option<String>, Query, description = "Filter by model"),
        ("min_rating" = Option<i32>, Query, description = "Minimum rating"),
        ("date_from" = Option<String>, Query, description = "From date, YYYY-MM-DD"),
        ("date_to" = Option<String>, Query, description = "To date inclusive, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Own reviews, newest first", body = ApiResponse<MyReviewList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn list_my_reviews(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<MyReviewQuery>,
) -> AppResult<Json<ApiResponse<MyReviewList>>> {
    let resp = review_service::list_my_reviews(&state, &user, query).await?;
    Ok(Json(resp))
}
