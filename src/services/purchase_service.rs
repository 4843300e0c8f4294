use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::purchases::{CreatePurchaseRequest, CustomerList, CustomerSummary, PurchaseList, SaleItem, SaleList},
    entity::{
        listings::{Column as ListingCol, Entity as Listings},
        purchases::{
            ActiveModel as PurchaseActive, Column as PurchaseCol, Entity as Purchases,
            Model as PurchaseModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_agency, ensure_buyer},
    models::{Purchase, PurchaseStatus},
    response::{ApiResponse, Meta},
    routes::params::{CustomerListQuery, DateRange, SaleListQuery},
    state::AppState,
};

/// Buys `quantity` units of a listing. The listing row is locked for the
/// whole check-and-decrement, so concurrent purchases of the last unit cannot
/// both succeed.
pub async fn create_purchase(
    state: &AppState,
    user: &AuthUser,
    payload: CreatePurchaseRequest,
) -> AppResult<ApiResponse<Purchase>> {
    ensure_buyer(user)?;
    if payload.quantity < 1 {
        return Err(AppError::BadRequest("quantity must be at least 1".into()));
    }

    let txn = state.orm.begin().await?;

    let listing = Listings::find_by_id(payload.listing_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let listing = match listing {
        Some(l) => l,
        None => return Err(AppError::NotFound),
    };

    if listing.stock <= 0 {
        return Err(AppError::InvalidState(
            "no stock available for this listing".into(),
        ));
    }
    if payload.quantity > listing.stock {
        return Err(AppError::InvalidState(format!(
            "requested quantity ({}) exceeds available stock ({})",
            payload.quantity, listing.stock
        )));
    }

    let purchase = PurchaseActive {
        id: Set(Uuid::new_v4()),
        buyer_id: Set(user.user_id),
        listing_id: Set(listing.id),
        unit_price_amount: Set(listing.current_price_amount),
        unit_price_currency: Set(listing.current_price_currency.clone()),
        quantity: Set(payload.quantity),
        status: Set(PurchaseStatus::Completed.as_str().into()),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    Listings::update_many()
        .col_expr(
            ListingCol::Stock,
            Expr::col(ListingCol::Stock).sub(payload.quantity),
        )
        .filter(ListingCol::Id.eq(listing.id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(
        purchase_id = %purchase.id,
        listing_id = %listing.id,
        quantity = payload.quantity,
        "purchase created"
    );

    Ok(ApiResponse::ok("Purchase completed", purchase_from_entity(purchase)?))
}

/// Returns the purchased units to the listing's stock and marks the purchase
/// cancelled. Lock order is purchase first, then listing.
pub async fn cancel_purchase(
    state: &AppState,
    user: &AuthUser,
    purchase_id: Uuid,
) -> AppResult<ApiResponse<Purchase>> {
    ensure_buyer(user)?;

    let txn = state.orm.begin().await?;

    let purchase = Purchases::find_by_id(purchase_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let purchase = match purchase {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    if purchase.buyer_id != user.user_id {
        return Err(AppError::Forbidden(
            "cannot cancel another user's purchase".into(),
        ));
    }
    if purchase.status == PurchaseStatus::Cancelled.as_str() {
        return Err(AppError::InvalidState(
            "purchase is already cancelled".into(),
        ));
    }

    let listing = Listings::find_by_id(purchase.listing_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    if listing.is_none() {
        return Err(AppError::Internal(anyhow::anyhow!(
            "purchase {} references a missing listing",
            purchase.id
        )));
    }

    Listings::update_many()
        .col_expr(
            ListingCol::Stock,
            Expr::col(ListingCol::Stock).add(purchase.quantity),
        )
        .filter(ListingCol::Id.eq(purchase.listing_id))
        .exec(&txn)
        .await?;

    let quantity = purchase.quantity;
    let mut active: PurchaseActive = purchase.into();
    active.status = Set(PurchaseStatus::Cancelled.as_str().into());
    let purchase = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        purchase_id = %purchase.id,
        listing_id = %purchase.listing_id,
        quantity,
        "purchase cancelled"
    );

    Ok(ApiResponse::ok("Purchase cancelled", purchase_from_entity(purchase)?))
}

/// Inverse of cancel: re-takes the units from stock and completes the
/// purchase again, provided enough stock is still there.
pub async fn reactivate_purchase(
    state: &AppState,
    user: &AuthUser,
    purchase_id: Uuid,
) -> AppResult<ApiResponse<Purchase>> {
    ensure_buyer(user)?;

    let txn = state.orm.begin().await?;

    let purchase = Purchases::find_by_id(purchase_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let purchase = match purchase {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    if purchase.buyer_id != user.user_id {
        return Err(AppError::Forbidden(
            "cannot reactivate another user's purchase".into(),
        ));
    }
    if purchase.status != PurchaseStatus::Cancelled.as_str() {
        return Err(AppError::InvalidState(
            "only cancelled purchases can be reactivated".into(),
        ));
    }

    let listing = Listings::find_by_id(purchase.listing_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let listing = match listing {
        Some(l) => l,
        None => {
            return Err(AppError::Internal(anyhow::anyhow!(
                "purchase {} references a missing listing",
                purchase.id
            )));
        }
    };

    if listing.stock < purchase.quantity {
        return Err(AppError::InvalidState(format!(
            "not enough stock to reactivate: current stock {}, purchase quantity {}",
            listing.stock, purchase.quantity
        )));
    }

    Listings::update_many()
        .col_expr(
            ListingCol::Stock,
            Expr::col(ListingCol::Stock).sub(purchase.quantity),
        )
        .filter(ListingCol::Id.eq(listing.id))
        .exec(&txn)
        .await?;

    let quantity = purchase.quantity;
    let mut active: PurchaseActive = purchase.into();
    active.status = Set(PurchaseStatus::Completed.as_str().into());
    let purchase = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        purchase_id = %purchase.id,
        listing_id = %purchase.listing_id,
        quantity,
        "purchase reactivated"
    );

    Ok(ApiResponse::ok("Purchase reactivated", purchase_from_entity(purchase)?))
}

/// The caller's purchase history, cancelled ones included.
pub async fn list_my_purchases(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<PurchaseList>> {
    ensure_buyer(user)?;

    let items = Purchases::find()
        .filter(PurchaseCol::BuyerId.eq(user.user_id))
        .order_by_desc(PurchaseCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(purchase_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "OK",
        PurchaseList { items },
        Some(Meta::new(1, total.max(1), total)),
    ))
}

/// Completed sales of the caller's agency, newest first.
pub async fn list_agency_sales(
    pool: &DbPool,
    user: &AuthUser,
    query: SaleListQuery,
) -> AppResult<ApiResponse<SaleList>> {
    let agency_id = ensure_agency(user)?;
    let (from, to) = DateRange::new(query.date_from, query.date_to).bounds();

    let items = sqlx::query_as::<_, SaleItem>(
        r#"
        SELECT p.id AS purchase_id, l.id AS listing_id, l.brand, l.model,
               u.email AS buyer_email, p.quantity, p.unit_price_amount,
               (p.unit_price_amount * p.quantity) AS total_amount, p.created_at
        FROM purchases p
        JOIN listings l ON l.id = p.listing_id
        JOIN users u ON u.id = p.buyer_id
        WHERE l.agency_id = $1
          AND p.status = 'COMPLETED'
          AND ($2::text IS NULL OR l.brand ILIKE '%' || $2 || '%')
          AND ($3::text IS NULL OR l.model ILIKE '%' || $3 || '%')
          AND ($4::text IS NULL OR u.email ILIKE '%' || $4 || '%')
          AND ($5::timestamptz IS NULL OR p.created_at >= $5)
          AND ($6::timestamptz IS NULL OR p.created_at < $6)
        ORDER BY p.created_at DESC
        "#,
    )
    .bind(agency_id)
    .bind(query.brand)
    .bind(query.model)
    .bind(query.customer)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::ok("Sales", SaleList { items }))
}

/// Buyers of the caller's agency grouped over their completed purchases,
/// most recent buyer first.
pub async fn list_agency_customers(
    pool: &DbPool,
    user: &AuthUser,
    query: CustomerListQuery,
) -> AppResult<ApiResponse<CustomerList>> {
    let agency_id = ensure_agency(user)?;

    let items = sqlx::query_as::<_, CustomerSummary>(
        r#"
        SELECT u.id AS buyer_id, u.email, COUNT(p.id) AS purchases_count,
               COALESCE(SUM(p.unit_price_amount * p.quantity), 0)::float8 AS total_spent,
               MAX(p.created_at) AS last_purchase_at
        FROM purchases p
        JOIN listings l ON l.id = p.listing_id
        JOIN users u ON u.id = p.buyer_id
        WHERE l.agency_id = $1
          AND p.status = 'COMPLETED'
          AND ($2::text IS NULL OR u.email ILIKE '%' || $2 || '%')
        GROUP BY u.id, u.email
        HAVING COUNT(p.id) >= COALESCE($3::bigint, 0)
           AND COALESCE(SUM(p.unit_price_amount * p.quantity), 0)::float8 >= COALESCE($4::float8, 0)
        ORDER BY last_purchase_at DESC
        "#,
    )
    .bind(agency_id)
    .bind(query.q)
    .bind(query.min_purchases)
    .bind(query.min_spent)
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::ok("Customers", CustomerList { items }))
}

/// A status outside the CHECK vocabulary means the row was tampered with;
/// surface it instead of guessing.
pub(crate) fn purchase_from_entity(model: PurchaseModel) -> AppResult<Purchase> {
    if PurchaseStatus::parse(&model.status).is_none() {
        return Err(AppError::Internal(anyhow::anyhow!(
            "purchase {} has unknown status {:?}",
            model.id,
            model.status
        )));
    }
    Ok(Purchase {
        id: model.id,
        buyer_id: model.buyer_id,
        listing_id: model.listing_id,
        unit_price_amount: model.unit_price_amount,
        unit_price_currency: model.unit_price_currency,
        quantity: model.quantity,
        status: model.status,
        created_at: model.created_at.with_timezone(&Utc),
    })
}
