use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Listing;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateListingRequest {
    pub inventory_id: Uuid,
    pub price_amount: Decimal,
    pub price_currency: Option<String>,
    pub stock: Option<i32>,
    pub seller_notes: Option<String>,
    pub expires_on: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateListingRequest {
    pub price_amount: Option<Decimal>,
    pub price_currency: Option<String>,
    pub stock: Option<i32>,
    pub seller_notes: Option<String>,
    pub is_active: Option<bool>,
    pub expires_on: Option<NaiveDate>,
}

/// Browse row: the listing plus what a buyer sees next to it.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListingCard {
    #[serde(flatten)]
    pub listing: Listing,
    pub is_favorite: bool,
    pub avg_rating: Option<f64>,
    pub reviews_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListingCardList {
    pub items: Vec<ListingCard>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListingList {
    pub items: Vec<Listing>,
}
