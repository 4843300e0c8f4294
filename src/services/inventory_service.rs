use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::inventory::{
        CreateInventoryRequest, InventoryItemWithModel, InventoryList, UpdateInventoryRequest,
    },
    entity::{
        car_models::{Column as CarModelCol, Entity as CarModels},
        inventory_items::{
            ActiveModel as InventoryActive, Column as InventoryCol, Entity as InventoryItems,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_agency},
    response::{ApiResponse, Meta},
    routes::params::InventoryListQuery,
    state::AppState,
};

/// Stocking the same car model twice folds into one row; the lock keeps two
/// concurrent deliveries from splitting the count.
pub async fn create_or_consolidate_inventory(
    state: &AppState,
    user: &AuthUser,
    payload: CreateInventoryRequest,
) -> AppResult<ApiResponse<InventoryItemWithModel>> {
    let agency_id = ensure_agency(user)?;

    if payload.quantity < 1 {
        return Err(AppError::BadRequest("quantity must be at least 1".into()));
    }

    let car_model = CarModels::find()
        .filter(
            Condition::all()
                .add(CarModelCol::Brand.eq(payload.brand.clone()))
                .add(CarModelCol::Model.eq(payload.model.clone())),
        )
        .one(&state.orm)
        .await?;
    let car_model = match car_model {
        Some(m) => m,
        None => {
            return Err(AppError::InvalidState(format!(
                "car model '{} {}' is not in the catalog",
                payload.brand, payload.model
            )));
        }
    };

    let txn = state.orm.begin().await?;

    let existing = InventoryItems::find()
        .filter(
            Condition::all()
                .add(InventoryCol::AgencyId.eq(agency_id))
                .add(InventoryCol::CarModelId.eq(car_model.id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?;

    let item = match existing {
        Some(existing) => {
            let new_quantity = existing.quantity + payload.quantity;
            let mut active: InventoryActive = existing.into();
            active.quantity = Set(new_quantity);
            if let Some(is_used) = payload.is_used {
                active.is_used = Set(is_used);
            }
            active.updated_at = Set(Utc::now().into());
            active.update(&txn).await?
        }
        None => {
            InventoryActive {
                id: Set(Uuid::new_v4()),
                agency_id: Set(agency_id),
                car_model_id: Set(car_model.id),
                quantity: Set(payload.quantity),
                is_used: Set(payload.is_used.unwrap_or(false)),
                created_at: NotSet,
                updated_at: NotSet,
            }
            .insert(&txn)
            .await?
        }
    };

    txn.commit().await?;

    tracing::info!(
        inventory_id = %item.id,
        agency_id = %agency_id,
        quantity = item.quantity,
        "inventory stocked"
    );

    Ok(ApiResponse::ok(
        "Inventory stocked",
        InventoryItemWithModel {
            id: item.id,
            brand: car_model.brand,
            model: car_model.model,
            quantity: item.quantity,
            is_used: item.is_used,
            updated_at: item.updated_at.with_timezone(&Utc),
        },
    ))
}

pub async fn update_inventory(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateInventoryRequest,
) -> AppResult<ApiResponse<InventoryItemWithModel>> {
    let agency_id = ensure_agency(user)?;

    let existing = InventoryItems::find()
        .filter(
            Condition::all()
                .add(InventoryCol::Id.eq(id))
                .add(InventoryCol::AgencyId.eq(agency_id)),
        )
        .one(&state.orm)
        .await?;
    let existing = match existing {
        Some(i) => i,
        None => return Err(AppError::NotFound),
    };

    if let Some(quantity) = payload.quantity {
        if quantity < 0 {
            return Err(AppError::BadRequest("quantity cannot be negative".into()));
        }
    }

    let car_model = CarModels::find_by_id(existing.car_model_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "inventory item {} references a missing car model",
                existing.id
            ))
        })?;

    let mut active: InventoryActive = existing.into();
    if let Some(quantity) = payload.quantity {
        active.quantity = Set(quantity);
    }
    if let Some(is_used) = payload.is_used {
        active.is_used = Set(is_used);
    }
    active.updated_at = Set(Utc::now().into());
    let item = active.update(&state.orm).await?;

    Ok(ApiResponse::ok(
        "Inventory updated",
        InventoryItemWithModel {
            id: item.id,
            brand: car_model.brand,
            model: car_model.model,
            quantity: item.quantity,
            is_used: item.is_used,
            updated_at: item.updated_at.with_timezone(&Utc),
        },
    ))
}

pub async fn delete_inventory(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let agency_id = ensure_agency(user)?;

    let existing = InventoryItems::find()
        .filter(
            Condition::all()
                .add(InventoryCol::Id.eq(id))
                .add(InventoryCol::AgencyId.eq(agency_id)),
        )
        .one(&state.orm)
        .await?;
    if existing.is_none() {
        return Err(AppError::NotFound);
    }

    InventoryItems::delete_by_id(id).exec(&state.orm).await?;

    tracing::info!(inventory_id = %id, "inventory item deleted");

    Ok(ApiResponse::ok("Inventory item deleted", serde_json::json!({})))
}

pub async fn list_inventory(
    state: &AppState,
    user: &AuthUser,
    query: InventoryListQuery,
) -> AppResult<ApiResponse<InventoryList>> {
    let agency_id = ensure_agency(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let items = sqlx::query_as::<_, InventoryItemWithModel>(
        r#"
        SELECT i.id, c.brand, c.model, i.quantity, i.is_used, i.updated_at
        FROM inventory_items i
        JOIN car_models c ON c.id = i.car_model_id
        WHERE i.agency_id = $1
          AND ($2::text IS NULL OR c.brand ILIKE '%' || $2 || '%')
          AND ($3::text IS NULL OR c.model ILIKE '%' || $3 || '%')
          AND ($4::boolean IS NULL OR i.is_used = $4)
        ORDER BY c.brand ASC, c.model ASC
        LIMIT $5 OFFSET $6
        "#,
    )
    .bind(agency_id)
    .bind(&query.brand)
    .bind(&query.model)
    .bind(query.is_used)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM inventory_items i
        JOIN car_models c ON c.id = i.car_model_id
        WHERE i.agency_id = $1
          AND ($2::text IS NULL OR c.brand ILIKE '%' || $2 || '%')
          AND ($3::text IS NULL OR c.model ILIKE '%' || $3 || '%')
          AND ($4::boolean IS NULL OR i.is_used = $4)
        "#,
    )
    .bind(agency_id)
    .bind(&query.brand)
    .bind(&query.model)
    .bind(query.is_used)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Inventory",
        InventoryList { items },
        Some(Meta::new(page, limit, total)),
    ))
}
