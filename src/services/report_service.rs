use crate::{
    dto::reports::{
        TopAgency, TopAgencyList, TopBuyer, TopBuyerList, TopFavoriteCar, TopFavoriteCarList,
        TopSoldCar, TopSoldCarList,
    },
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    response::ApiResponse,
    routes::params::ReportQuery,
    state::AppState,
};

/// Sales reports count COMPLETED purchases only; a cancelled purchase drops
/// out of every ranking the moment it is cancelled.
pub async fn top_sold_cars(
    state: &AppState,
    user: &AuthUser,
    query: ReportQuery,
) -> AppResult<ApiResponse<TopSoldCarList>> {
    ensure_admin(user)?;
    let limit = query.normalized_limit();
    let (from, to) = query.range().bounds();

    let items = sqlx::query_as::<_, TopSoldCar>(
        r#"
        SELECT l.brand, l.model,
               SUM(p.quantity) AS units_sold,
               COALESCE(SUM(p.unit_price_amount * p.quantity), 0)::float8 AS total_amount
        FROM purchases p
        JOIN listings l ON l.id = p.listing_id
        WHERE p.status = 'COMPLETED'
          AND ($1::timestamptz IS NULL OR p.created_at >= $1)
          AND ($2::timestamptz IS NULL OR p.created_at < $2)
        GROUP BY l.brand, l.model
        ORDER BY units_sold DESC, l.brand ASC, l.model ASC
        LIMIT $3
        "#,
    )
    .bind(from)
    .bind(to)
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::ok("Top sold cars", TopSoldCarList { items }))
}

pub async fn top_buyers(
    state: &AppState,
    user: &AuthUser,
    query: ReportQuery,
) -> AppResult<ApiResponse<TopBuyerList>> {
    ensure_admin(user)?;
    let limit = query.normalized_limit();
    let (from, to) = query.range().bounds();

    let items = sqlx::query_as::<_, TopBuyer>(
        r#"
        SELECT u.id AS buyer_id, u.email,
               COUNT(p.id) AS purchases_count,
               COALESCE(SUM(p.unit_price_amount * p.quantity), 0)::float8 AS total_spent,
               MAX(p.created_at) AS last_purchase_at
        FROM purchases p
        JOIN users u ON u.id = p.buyer_id
        WHERE p.status = 'COMPLETED'
          AND ($1::timestamptz IS NULL OR p.created_at >= $1)
          AND ($2::timestamptz IS NULL OR p.created_at < $2)
        GROUP BY u.id, u.email
        ORDER BY purchases_count DESC, u.email ASC
        LIMIT $3
        "#,
    )
    .bind(from)
    .bind(to)
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::ok("Top buyers", TopBuyerList { items }))
}

pub async fn top_agencies(
    state: &AppState,
    user: &AuthUser,
    query: ReportQuery,
) -> AppResult<ApiResponse<TopAgencyList>> {
    ensure_admin(user)?;
    let limit = query.normalized_limit();
    let (from, to) = query.range().bounds();

    let items = sqlx::query_as::<_, TopAgency>(
        r#"
        SELECT a.id AS agency_id, a.name,
               COUNT(p.id) AS sales_count,
               COALESCE(SUM(p.unit_price_amount * p.quantity), 0)::float8 AS total_amount
        FROM purchases p
        JOIN listings l ON l.id = p.listing_id
        JOIN agencies a ON a.id = l.agency_id
        WHERE p.status = 'COMPLETED'
          AND ($1::timestamptz IS NULL OR p.created_at >= $1)
          AND ($2::timestamptz IS NULL OR p.created_at < $2)
        GROUP BY a.id, a.name
        ORDER BY sales_count DESC, a.name ASC
        LIMIT $3
        "#,
    )
    .bind(from)
    .bind(to)
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::ok("Top agencies", TopAgencyList { items }))
}

/// Favorites are a browsing signal, not a sales one, so cancelled purchases
/// have no bearing here and the window filters on when the favorite was set.
pub async fn top_favorited_cars(
    state: &AppState,
    user: &AuthUser,
    query: ReportQuery,
) -> AppResult<ApiResponse<TopFavoriteCarList>> {
    ensure_admin(user)?;
    let limit = query.normalized_limit();
    let (from, to) = query.range().bounds();

    let items = sqlx::query_as::<_, TopFavoriteCar>(
        r#"
        SELECT l.brand, l.model, COUNT(f.id) AS favorites_count
        FROM favorites f
        JOIN listings l ON l.id = f.listing_id
        WHERE ($1::timestamptz IS NULL OR f.created_at >= $1)
          AND ($2::timestamptz IS NULL OR f.created_at < $2)
        GROUP BY l.brand, l.model
        ORDER BY favorites_count DESC, l.brand ASC, l.model ASC
        LIMIT $3
        "#,
    )
    .bind(from)
    .bind(to)
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::ok("Top favorited cars", TopFavoriteCarList { items }))
}
