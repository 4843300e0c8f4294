use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::admin::{AgencyUserCreated, CreateAgencyUserRequest},
    dto::inventory::{
        CreateInventoryRequest, InventoryItemWithModel, InventoryList, UpdateInventoryRequest,
    },
    dto::listings::ListingList,
    dto::purchases::{CustomerList, SaleList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Listing,
    response::ApiResponse,
    routes::params::{CustomerListQuery, InventoryListQuery, Pagination, SaleListQuery},
    services::{admin_service, inventory_service, listing_service, purchase_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_agency_user))
        .route("/my-listings", get(list_my_listings))
        .route("/my-listings/{id}", get(get_my_listing))
        .route("/my-sales", get(list_my_sales))
        .route("/my-customers", get(list_my_customers))
        .route("/my-inventory", get(list_inventory).post(create_inventory))
        .route("/my-inventory/{id}", patch(update_inventory))
        .route("/my-inventory/{id}", delete(delete_inventory))
}

#[utoipa::path(
    post,
    path = "/api/agencies",
    request_body = CreateAgencyUserRequest,
    responses(
        (status = 200, description = "Provision agency account", body = ApiResponse<AgencyUserCreated>),
        (status = 400, description = "Email is already taken"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Agency already has a linked account")
    ),
    security(("bearer_auth" = [])),
    tag = "Agencies"
)]
pub async fn create_agency_user(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateAgencyUserRequest>,
) -> AppResult<Json<ApiResponse<AgencyUserCreated>>> {
    let resp = admin_service::create_agency_user(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/agencies/my-listings",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "Own listings, newest first", body = ApiResponse<ListingList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Agencies"
)]
pub async fn list_my_listings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ListingList>>> {
    let resp = listing_service::list_my_listings(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/agencies/my-listings/{id}",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Own listing detail", body = ApiResponse<Listing>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Agencies"
)]
pub async fn get_my_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Listing>>> {
    let resp = listing_service::get_my_listing(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/agencies/my-sales",
    params(
        ("brand" = Option<String>, Query, description = "Filter by brand"),
        ("model" = Option<String>, Query, description = "Filter by model"),
        ("customer" = Option<String>, Query, description = "Filter by buyer email"),
        ("date_from" = Option<String>, Query, description = "From date, YYYY-MM-DD"),
        ("date_to" = Option<String>, Query, description = "To date inclusive, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Completed sales, newest first", body = ApiResponse<SaleList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Agencies"
)]
pub async fn list_my_sales(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SaleListQuery>,
) -> AppResult<Json<ApiResponse<SaleList>>> {
    let resp = purchase_service::list_agency_sales(&state.pool, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/agencies/my-customers",
    params(
        ("q" = Option<String>, Query, description = "Filter by buyer email"),
        ("min_purchases" = Option<i64>, Query, description = "Minimum completed purchases"),
        ("min_spent" = Option<f64>, Query, description = "Minimum total spent")
    ),
    responses(
        (status = 200, description = "Buyers grouped over completed purchases", body = ApiResponse<CustomerList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Agencies"
)]
pub async fn list_my_customers(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CustomerListQuery>,
) -> AppResult<Json<ApiResponse<CustomerList>>> {
    let resp = purchase_service::list_agency_customers(&state.pool, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/agencies/my-inventory",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("brand" = Option<String>, Query, description = "Filter by brand"),
        ("model" = Option<String>, Query, description = "Filter by model"),
        ("is_used" = Option<bool>, Query, description = "Filter by condition")
    ),
    responses(
        (status = 200, description = "Inventory with catalog names", body = ApiResponse<InventoryList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Agencies"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<InventoryListQuery>,
) -> AppResult<Json<ApiResponse<InventoryList>>> {
    let resp = inventory_service::list_inventory(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/agencies/my-inventory",
    request_body = CreateInventoryRequest,
    responses(
        (status = 200, description = "Inventory stocked; same car model folds into one row", body = ApiResponse<InventoryItemWithModel>),
        (status = 400, description = "Unknown car model or invalid quantity"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Agencies"
)]
pub async fn create_inventory(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateInventoryRequest>,
) -> AppResult<Json<ApiResponse<InventoryItemWithModel>>> {
    let resp = inventory_service::create_or_consolidate_inventory(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/agencies/my-inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    request_body = UpdateInventoryRequest,
    responses(
        (status = 200, description = "Update inventory item", body = ApiResponse<InventoryItemWithModel>),
        (status = 400, description = "Invalid quantity"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Agencies"
)]
pub async fn update_inventory(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInventoryRequest>,
) -> AppResult<Json<ApiResponse<InventoryItemWithModel>>> {
    let resp = inventory_service::update_inventory(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/agencies/my-inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    responses(
        (status = 200, description = "Delete inventory item", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Agencies"
)]
pub async fn delete_inventory(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = inventory_service::delete_inventory(&state, &user, id).await?;
    Ok(Json(resp))
}
