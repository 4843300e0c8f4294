use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::favorites::{FavoriteListingItem, FavoriteListingList, FavoriteStatus, RemoveFavoriteResponse},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_buyer},
    models::Favorite,
    response::ApiResponse,
    routes::params::FavoriteListQuery,
};

/// Idempotent: a listing already in the set comes back unchanged, and a
/// concurrent duplicate insert resolves to the winner's row.
pub async fn add_favorite(
    pool: &DbPool,
    user: &AuthUser,
    listing_id: Uuid,
) -> AppResult<ApiResponse<Favorite>> {
    ensure_buyer(user)?;

    let listing_exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM listings WHERE id = $1")
        .bind(listing_id)
        .fetch_optional(pool)
        .await?;
    if listing_exists.is_none() {
        return Err(AppError::NotFound);
    }

    if let Some(fav) = find_favorite(pool, user.user_id, listing_id).await? {
        return Ok(ApiResponse::ok("Added to favorites", fav));
    }

    let favorite = match insert_favorite(pool, user.user_id, listing_id).await {
        Ok(fav) => fav,
        // Lost the insert race: the unique constraint fired, so the winner's
        // row must be there now.
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            match find_favorite(pool, user.user_id, listing_id).await? {
                Some(fav) => fav,
                // Winner removed it again in between; one more attempt, then
                // give up as a server error.
                None => insert_favorite(pool, user.user_id, listing_id)
                    .await
                    .map_err(|e| {
                        AppError::Internal(anyhow::anyhow!("favorite insert retry failed: {e}"))
                    })?,
            }
        }
        Err(err) => return Err(err.into()),
    };

    Ok(ApiResponse::ok("Added to favorites", favorite))
}

/// Reports whether a row actually died; removing an absent favorite is not an
/// error.
pub async fn remove_favorite(
    pool: &DbPool,
    user: &AuthUser,
    listing_id: Uuid,
) -> AppResult<ApiResponse<RemoveFavoriteResponse>> {
    ensure_buyer(user)?;

    let result = sqlx::query("DELETE FROM favorites WHERE customer_id = $1 AND listing_id = $2")
        .bind(user.user_id)
        .bind(listing_id)
        .execute(pool)
        .await?;

    Ok(ApiResponse::ok(
        "OK",
        RemoveFavoriteResponse {
            removed: result.rows_affected() > 0,
        },
    ))
}

/// Flips membership and answers with the state after the flip.
pub async fn toggle_favorite(
    pool: &DbPool,
    user: &AuthUser,
    listing_id: Uuid,
) -> AppResult<ApiResponse<FavoriteStatus>> {
    ensure_buyer(user)?;

    let is_favorite = if find_favorite(pool, user.user_id, listing_id).await?.is_some() {
        sqlx::query("DELETE FROM favorites WHERE customer_id = $1 AND listing_id = $2")
            .bind(user.user_id)
            .bind(listing_id)
            .execute(pool)
            .await?;
        false
    } else {
        add_favorite(pool, user, listing_id).await?;
        true
    };

    Ok(ApiResponse::ok(
        "OK",
        FavoriteStatus {
            listing_id,
            is_favorite,
        },
    ))
}

pub async fn list_favorites(
    pool: &DbPool,
    user: &AuthUser,
    query: FavoriteListQuery,
) -> AppResult<ApiResponse<FavoriteListingList>> {
    ensure_buyer(user)?;

    let items = sqlx::query_as::<_, FavoriteListingItem>(
        r#"
        SELECT f.id AS favorite_id, l.id AS listing_id, l.brand, l.model,
               l.current_price_amount AS price_amount,
               l.current_price_currency AS price_currency,
               l.stock, l.is_active, l.agency_id, f.created_at AS favorited_at
        FROM favorites f
        JOIN listings l ON l.id = f.listing_id
        WHERE f.customer_id = $1
          AND ($2::text IS NULL OR l.brand ILIKE '%' || $2 || '%')
          AND ($3::text IS NULL OR l.model ILIKE '%' || $3 || '%')
          AND ($4::uuid IS NULL OR l.agency_id = $4)
          AND ($5::numeric IS NULL OR l.current_price_amount >= $5)
          AND ($6::numeric IS NULL OR l.current_price_amount <= $6)
        ORDER BY f.created_at DESC
        "#,
    )
    .bind(user.user_id)
    .bind(query.brand)
    .bind(query.model)
    .bind(query.agency_id)
    .bind(query.min_price)
    .bind(query.max_price)
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::ok("OK", FavoriteListingList { items }))
}

async fn find_favorite(
    pool: &DbPool,
    customer_id: Uuid,
    listing_id: Uuid,
) -> Result<Option<Favorite>, sqlx::Error> {
    sqlx::query_as::<_, Favorite>(
        "SELECT * FROM favorites WHERE customer_id = $1 AND listing_id = $2",
    )
    .bind(customer_id)
    .bind(listing_id)
    .fetch_optional(pool)
    .await
}

async fn insert_favorite(
    pool: &DbPool,
    customer_id: Uuid,
    listing_id: Uuid,
) -> Result<Favorite, sqlx::Error> {
    sqlx::query_as::<_, Favorite>(
        r#"
        INSERT INTO favorites (id, customer_id, listing_id)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(customer_id)
    .bind(listing_id)
    .fetch_one(pool)
    .await
}
