use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::admin::{AdminFavoriteList, AdminPurchaseList, AdminReviewList, AdminUserList},
    dto::reports::{TopAgencyList, TopBuyerList, TopFavoriteCarList, TopSoldCarList},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::{
        AdminFavoriteQuery, AdminPurchaseQuery, AdminReviewQuery, AdminUserQuery, ReportQuery,
    },
    services::{admin_service, report_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reports/top-sold-cars", get(top_sold_cars))
        .route("/reports/top-buyers", get(top_buyers))
        .route("/reports/top-agencies", get(top_agencies))
        .route("/reports/top-favorites", get(top_favorited_cars))
        .route("/purchases", get(list_all_purchases))
        .route("/reviews", get(list_all_reviews))
        .route("/favorites", get(list_all_favorites))
        .route("/users", get(list_all_users))
}

#[utoipa::path(
    get,
    path = "/api/admin/reports/top-sold-cars",
    params(
        ("date_from" = Option<String>, Query, description = "From date, YYYY-MM-DD"),
        ("date_to" = Option<String>, Query, description = "To date inclusive, YYYY-MM-DD"),
        ("limit" = Option<i64>, Query, description = "Rows, default 10, max 100")
    ),
    responses(
        (status = 200, description = "Car models ranked by units sold", body = ApiResponse<TopSoldCarList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn top_sold_cars(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ApiResponse<TopSoldCarList>>> {
    let resp = report_service::top_sold_cars(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/reports/top-buyers",
    params(
        ("date_from" = Option<String>, Query, description = "From date, YYYY-MM-DD"),
        ("date_to" = Option<String>, Query, description = "To date inclusive, YYYY-MM-DD"),
        ("limit" = Option<i64>, Query, description = "Rows, default 10, max 100")
    ),
    responses(
        (status = 200, description = "Buyers ranked by completed purchases", body = ApiResponse<TopBuyerList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn top_buyers(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ApiResponse<TopBuyerList>>> {
    let resp = report_service::top_buyers(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/reports/top-agencies",
    params(
        ("date_from" = Option<String>, Query, description = "From date, YYYY-MM-DD"),
        ("date_to" = Option<String>, Query, description = "To date inclusive, YYYY-MM-DD"),
        ("limit" = Option<i64>, Query, description = "Rows, default 10, max 100")
    ),
    responses(
        (status = 200, description = "Agencies ranked by completed sales", body = ApiResponse<TopAgencyList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn top_agencies(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ApiResponse<TopAgencyList>>> {
    let resp = report_service::top_agencies(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/reports/top-favorites",
    params(
        ("date_from" = Option<String>, Query, description = "From date, YYYY-MM-DD"),
        ("date_to" = Option<String>, Query, description = "To date inclusive, YYYY-MM-DD"),
        ("limit" = Option<i64>, Query, description = "Rows, default 10, max 100")
    ),
    responses(
        (status = 200, description = "Car models ranked by favorites", body = ApiResponse<TopFavoriteCarList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn top_favorited_cars(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ApiResponse<TopFavoriteCarList>>> {
    let resp = report_service::top_favorited_cars(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/purchases",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search buyer email, brand or model"),
        ("status" = Option<String>, Query, description = "COMPLETED or CANCELLED"),
        ("date_from" = Option<String>, Query, description = "From date, YYYY-MM-DD"),
        ("date_to" = Option<String>, Query, description = "To date inclusive, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "All purchases (admin only)", body = ApiResponse<AdminPurchaseList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_purchases(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AdminPurchaseQuery>,
) -> AppResult<Json<ApiResponse<AdminPurchaseList>>> {
    let resp = admin_service::list_all_purchases(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/reviews",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search author email, brand or model"),
        ("min_rating" = Option<i32>, Query, description = "Minimum rating"),
        ("max_rating" = Option<i32>, Query, description = "Maximum rating"),
        ("date_from" = Option<String>, Query, description = "From date, YYYY-MM-DD"),
        ("date_to" = Option<String>, Query, description = "To date inclusive, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "All reviews (admin only)", body = ApiResponse<AdminReviewList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_reviews(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AdminReviewQuery>,
) -> AppResult<Json<ApiResponse<AdminReviewList>>> {
    let resp = admin_service::list_all_reviews(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/favorites",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search customer email, brand or model")
    ),
    responses(
        (status = 200, description = "All favorites (admin only)", body = ApiResponse<AdminFavoriteList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_favorites(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AdminFavoriteQuery>,
) -> AppResult<Json<ApiResponse<AdminFavoriteList>>> {
    let resp = admin_service::list_all_favorites(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search email"),
        ("role" = Option<String>, Query, description = "admin, buyer or agency")
    ),
    responses(
        (status = 200, description = "All users (admin only)", body = ApiResponse<AdminUserList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AdminUserQuery>,
) -> AppResult<Json<ApiResponse<AdminUserList>>> {
    let resp = admin_service::list_all_users(&state, &user, query).await?;
    Ok(Json(resp))
}
