use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::purchases::{CreatePurchaseRequest, PurchaseList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Purchase,
    response::ApiResponse,
    services::purchase_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_purchase))
        .route("/my", get(list_my_purchases))
        .route("/{id}/cancel", post(cancel_purchase))
        .route("/{id}/reactivate", post(reactivate_purchase))
}

#[utoipa::path(
    post,
    path = "/api/purchases",
    request_body = CreatePurchaseRequest,
    responses(
        (status = 200, description = "Purchase completed", body = ApiResponse<Purchase>),
        (status = 400, description = "Invalid quantity or not enough stock"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Listing not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Purchases"
)]
pub async fn create_purchase(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePurchaseRequest>,
) -> AppResult<Json<ApiResponse<Purchase>>> {
    let resp = purchase_service::create_purchase(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/purchases/my",
    responses(
        (status = 200, description = "Purchase history, newest first", body = ApiResponse<PurchaseList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Purchases"
)]
pub async fn list_my_purchases(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PurchaseList>>> {
    let resp = purchase_service::list_my_purchases(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/purchases/{id}/cancel",
    params(("id" = Uuid, Path, description = "Purchase ID")),
    responses(
        (status = 200, description = "Purchase cancelled, stock returned", body = ApiResponse<Purchase>),
        (status = 400, description = "Purchase is already cancelled"),
        (status = 403, description = "Not the buyer"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Purchases"
)]
pub async fn cancel_purchase(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Purchase>>> {
    let resp = purchase_service::cancel_purchase(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/purchases/{id}/reactivate",
    params(("id" = Uuid, Path, description = "Purchase ID")),
    responses(
        (status = 200, description = "Cancelled purchase completed again", body = ApiResponse<Purchase>),
        (status = 400, description = "Not cancelled, or not enough stock"),
        (status = 403, description = "Not the buyer"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Purchases"
)]
pub async fn reactivate_purchase(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Purchase>>> {
    let resp = purchase_service::reactivate_purchase(&state, &user, id).await?;
    Ok(Json(resp))
}
