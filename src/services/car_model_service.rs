use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::{
    dto::car_models::CarModelList,
    entity::car_models::{Column, Entity as CarModels, Model as CarModelModel},
    error::AppResult,
    models::CarModel,
    response::ApiResponse,
    routes::params::CarModelQuery,
    state::AppState,
};

/// Catalog lookup used by the listing form's typeahead.
pub async fn search_car_models(
    state: &AppState,
    query: CarModelQuery,
) -> AppResult<ApiResponse<CarModelList>> {
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Brand).ilike(pattern.clone()))
                .add(Expr::col(Column::Model).ilike(pattern)),
        );
    }

    let items = CarModels::find()
        .filter(condition)
        .order_by_asc(Column::Brand)
        .order_by_asc(Column::Model)
        .limit(query.normalized_limit() as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(car_model_from_entity)
        .collect();

    Ok(ApiResponse::ok("Car models", CarModelList { items }))
}

pub(crate) fn car_model_from_entity(model: CarModelModel) -> CarModel {
    CarModel {
        id: model.id,
        brand: model.brand,
        model: model.model,
    }
}
