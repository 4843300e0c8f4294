use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Favorite joined with its listing, ordered by when it was favorited.
#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct FavoriteListingItem {
    pub favorite_id: Uuid,
    pub listing_id: Uuid,
    pub brand: String,
    pub model: String,
    pub price_amount: Decimal,
    pub price_currency: String,
    pub stock: i32,
    pub is_active: bool,
    pub agency_id: Uuid,
    pub favorited_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FavoriteListingList {
    pub items: Vec<FavoriteListingItem>,
}

/// Result of a toggle: whether the listing is a favorite afterwards.
#[derive(Debug, Serialize, ToSchema)]
pub struct FavoriteStatus {
    pub listing_id: Uuid,
    pub is_favorite: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RemoveFavoriteResponse {
    pub removed: bool,
}
