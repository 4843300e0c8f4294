use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::car_models::CarModelList,
    error::AppResult,
    response::ApiResponse,
    routes::params::CarModelQuery,
    services::car_model_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(search_car_models))
}

#[utoipa::path(
    get,
    path = "/api/car-models",
    params(
        ("q" = Option<String>, Query, description = "Search brand or model"),
        ("limit" = Option<i64>, Query, description = "Max results, default 20")
    ),
    responses(
        (status = 200, description = "Catalog search", body = ApiResponse<CarModelList>)
    ),
    tag = "CarModels"
)]
pub async fn search_car_models(
    State(state): State<AppState>,
    Query(query): Query<CarModelQuery>,
) -> AppResult<Json<ApiResponse<CarModelList>>> {
    let resp = car_model_service::search_car_models(&state, query).await?;
    Ok(Json(resp))
}
