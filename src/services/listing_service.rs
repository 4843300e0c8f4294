use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::listings::{
        CreateListingRequest, ListingCard, ListingCardList, ListingList, UpdateListingRequest,
    },
    entity::{
        car_models::Entity as CarModels,
        inventory_items::{Column as InventoryCol, Entity as InventoryItems},
        listings::{
            ActiveModel as ListingActive, Column as ListingCol, Entity as Listings,
            Model as ListingModel,
        },
        purchases::{Column as PurchaseCol, Entity as Purchases},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_agency},
    models::Listing,
    response::{ApiResponse, Meta},
    routes::params::{ListingQuery, ListingSortBy, Pagination},
    state::AppState,
};

/// Puts an owned inventory item on the market. Brand and model are copied
/// from the catalog entry so the listing text stays stable.
pub async fn create_listing(
    state: &AppState,
    user: &AuthUser,
    payload: CreateListingRequest,
) -> AppResult<ApiResponse<Listing>> {
    let agency_id = ensure_agency(user)?;

    if payload.price_amount.is_sign_negative() || payload.price_amount.is_zero() {
        return Err(AppError::BadRequest("price must be positive".into()));
    }
    let stock = payload.stock.unwrap_or(1);
    if stock < 0 {
        return Err(AppError::BadRequest("stock cannot be negative".into()));
    }
    let currency = payload.price_currency.unwrap_or_else(|| "USD".to_string());
    if currency.len() != 3 {
        return Err(AppError::BadRequest(
            "currency must be a 3-letter code".into(),
        ));
    }

    let item = InventoryItems::find()
        .filter(
            Condition::all()
                .add(InventoryCol::Id.eq(payload.inventory_id))
                .add(InventoryCol::AgencyId.eq(agency_id)),
        )
        .one(&state.orm)
        .await?;
    let item = match item {
        Some(i) => i,
        None => return Err(AppError::NotFound),
    };

    let car_model = CarModels::find_by_id(item.car_model_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "inventory item {} references a missing car model",
                item.id
            ))
        })?;

    let listing = ListingActive {
        id: Set(Uuid::new_v4()),
        agency_id: Set(agency_id),
        car_model_id: Set(car_model.id),
        brand: Set(car_model.brand.clone()),
        model: Set(car_model.model.clone()),
        current_price_amount: Set(payload.price_amount),
        current_price_currency: Set(currency),
        stock: Set(stock),
        seller_notes: Set(payload.seller_notes),
        is_active: Set(true),
        expires_on: Set(payload.expires_on),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(listing_id = %listing.id, agency_id = %agency_id, "listing created");

    Ok(ApiResponse::ok("Listing created", listing_from_entity(listing)))
}

/// Public catalog browse over active listings, each row annotated with the
/// caller's favorite flag and the car model's rating aggregate.
pub async fn browse_listings(
    state: &AppState,
    user: Option<&AuthUser>,
    query: ListingQuery,
) -> AppResult<ApiResponse<ListingCardList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all().add(ListingCol::IsActive.eq(true));

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(ListingCol::Brand).ilike(pattern.clone()))
                .add(Expr::col(ListingCol::Model).ilike(pattern)),
        );
    }
    if let Some(brand) = query.brand.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Expr::col(ListingCol::Brand).ilike(format!("%{}%", brand)));
    }
    if let Some(model) = query.model.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Expr::col(ListingCol::Model).ilike(format!("%{}%", model)));
    }
    if let Some(agency_id) = query.agency_id {
        condition = condition.add(ListingCol::AgencyId.eq(agency_id));
    }
    if let Some(min_price) = query.min_price {
        condition = condition.add(ListingCol::CurrentPriceAmount.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(ListingCol::CurrentPriceAmount.lte(max_price));
    }

    let mut finder = Listings::find().filter(condition);
    finder = match query.sort.unwrap_or(ListingSortBy::Newest) {
        ListingSortBy::PriceAsc => finder.order_by_asc(ListingCol::CurrentPriceAmount),
        ListingSortBy::PriceDesc => finder.order_by_desc(ListingCol::CurrentPriceAmount),
        ListingSortBy::Newest => finder.order_by_desc(ListingCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let rows = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = enrich_listings(state, user, rows).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Listings",
        ListingCardList { items },
        Some(meta),
    ))
}

pub async fn get_listing(
    state: &AppState,
    user: Option<&AuthUser>,
    id: Uuid,
) -> AppResult<ApiResponse<ListingCard>> {
    let listing = Listings::find_by_id(id).one(&state.orm).await?;
    let listing = match listing {
        Some(l) => l,
        None => return Err(AppError::NotFound),
    };

    let mut cards = enrich_listings(state, user, vec![listing]).await?;
    let card = cards
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("listing enrichment dropped the row")))?;

    Ok(ApiResponse::ok("Listing", card))
}

pub async fn update_listing(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateListingRequest,
) -> AppResult<ApiResponse<Listing>> {
    let agency_id = ensure_agency(user)?;

    let existing = Listings::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(l) => l,
        None => return Err(AppError::NotFound),
    };
    if existing.agency_id != agency_id {
        return Err(AppError::Forbidden(
            "listing belongs to another agency".into(),
        ));
    }

    if let Some(price) = payload.price_amount {
        if price.is_sign_negative() || price.is_zero() {
            return Err(AppError::BadRequest("price must be positive".into()));
        }
    }
    if let Some(stock) = payload.stock {
        if stock < 0 {
            return Err(AppError::BadRequest("stock cannot be negative".into()));
        }
    }
    if let Some(currency) = payload.price_currency.as_ref() {
        if currency.len() != 3 {
            return Err(AppError::BadRequest(
                "currency must be a 3-letter code".into(),
            ));
        }
    }

    let mut active: ListingActive = existing.into();
    if let Some(price) = payload.price_amount {
        active.current_price_amount = Set(price);
    }
    if let Some(currency) = payload.price_currency {
        active.current_price_currency = Set(currency);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(notes) = payload.seller_notes {
        active.seller_notes = Set(Some(notes));
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(expires_on) = payload.expires_on {
        active.expires_on = Set(Some(expires_on));
    }

    let listing = active.update(&state.orm).await?;

    Ok(ApiResponse::ok("Listing updated", listing_from_entity(listing)))
}

/// Cancel and activate both land here; cross-agency ids read as absent.
pub async fn set_listing_active(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    active_flag: bool,
) -> AppResult<ApiResponse<Listing>> {
    let agency_id = ensure_agency(user)?;

    let existing = Listings::find()
        .filter(
            Condition::all()
                .add(ListingCol::Id.eq(id))
                .add(ListingCol::AgencyId.eq(agency_id)),
        )
        .one(&state.orm)
        .await?;
    let existing = match existing {
        Some(l) => l,
        None => return Err(AppError::NotFound),
    };

    let mut active: ListingActive = existing.into();
    active.is_active = Set(active_flag);
    let listing = active.update(&state.orm).await?;

    tracing::info!(listing_id = %listing.id, is_active = active_flag, "listing visibility changed");

    Ok(ApiResponse::ok(
        if active_flag {
            "Listing activated"
        } else {
            "Listing cancelled"
        },
        listing_from_entity(listing),
    ))
}

/// Refused while purchases reference the listing; cancelled ones count too,
/// since they carry the price history.
pub async fn delete_listing(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let agency_id = ensure_agency(user)?;

    let existing = Listings::find()
        .filter(
            Condition::all()
                .add(ListingCol::Id.eq(id))
                .add(ListingCol::AgencyId.eq(agency_id)),
        )
        .one(&state.orm)
        .await?;
    if existing.is_none() {
        return Err(AppError::NotFound);
    }

    let purchase_count = Purchases::find()
        .filter(PurchaseCol::ListingId.eq(id))
        .count(&state.orm)
        .await?;
    if purchase_count > 0 {
        return Err(AppError::InvalidState(
            "listing has purchases and cannot be deleted".into(),
        ));
    }

    Listings::delete_by_id(id).exec(&state.orm).await?;

    tracing::info!(listing_id = %id, "listing deleted");

    Ok(ApiResponse::ok("Listing deleted", serde_json::json!({})))
}

pub async fn list_my_listings(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<ListingList>> {
    let agency_id = ensure_agency(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Listings::find()
        .filter(ListingCol::AgencyId.eq(agency_id))
        .order_by_desc(ListingCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(listing_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Listings",
        ListingList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_my_listing(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Listing>> {
    let agency_id = ensure_agency(user)?;

    let listing = Listings::find()
        .filter(
            Condition::all()
                .add(ListingCol::Id.eq(id))
                .add(ListingCol::AgencyId.eq(agency_id)),
        )
        .one(&state.orm)
        .await?;
    let listing = match listing {
        Some(l) => l,
        None => return Err(AppError::NotFound),
    };

    Ok(ApiResponse::ok("Listing", listing_from_entity(listing)))
}

#[derive(sqlx::FromRow)]
struct RatingRow {
    car_model_id: Uuid,
    avg_rating: f64,
    reviews_count: i64,
}

/// Two batched lookups instead of per-row subqueries: the caller's favorites
/// among these listings, and the rating aggregate per car model.
async fn enrich_listings(
    state: &AppState,
    user: Option<&AuthUser>,
    rows: Vec<ListingModel>,
) -> AppResult<Vec<ListingCard>> {
    let listing_ids: Vec<Uuid> = rows.iter().map(|l| l.id).collect();
    let car_model_ids: Vec<Uuid> = rows.iter().map(|l| l.car_model_id).collect();

    let favorite_ids: HashSet<Uuid> = match user.filter(|u| u.role == "buyer") {
        Some(u) if !listing_ids.is_empty() => {
            let rows: Vec<(Uuid,)> = sqlx::query_as(
                "SELECT listing_id FROM favorites WHERE customer_id = $1 AND listing_id = ANY($2)",
            )
            .bind(u.user_id)
            .bind(&listing_ids)
            .fetch_all(&state.pool)
            .await?;
            rows.into_iter().map(|(id,)| id).collect()
        }
        _ => HashSet::new(),
    };

    let ratings: HashMap<Uuid, (f64, i64)> = if car_model_ids.is_empty() {
        HashMap::new()
    } else {
        let rows: Vec<RatingRow> = sqlx::query_as(
            r#"
            SELECT car_model_id, AVG(rating)::float8 AS avg_rating, COUNT(*) AS reviews_count
            FROM reviews
            WHERE car_model_id = ANY($1)
            GROUP BY car_model_id
            "#,
        )
        .bind(&car_model_ids)
        .fetch_all(&state.pool)
        .await?;
        rows.into_iter()
            .map(|r| (r.car_model_id, (r.avg_rating, r.reviews_count)))
            .collect()
    };

    let cards = rows
        .into_iter()
        .map(|l| {
            let rating = ratings.get(&l.car_model_id).copied();
            ListingCard {
                is_favorite: favorite_ids.contains(&l.id),
                avg_rating: rating.map(|(avg, _)| avg),
                reviews_count: rating.map(|(_, count)| count).unwrap_or(0),
                listing: listing_from_entity(l),
            }
        })
        .collect();

    Ok(cards)
}

pub(crate) fn listing_from_entity(model: ListingModel) -> Listing {
    Listing {
        id: model.id,
        agency_id: model.agency_id,
        car_model_id: model.car_model_id,
        brand: model.brand,
        model: model.model,
        price_amount: model.current_price_amount,
        price_currency: model.current_price_currency,
        stock: model.stock,
        seller_notes: model.seller_notes,
        is_active: model.is_active,
        expires_on: model.expires_on,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
