use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Aggregate sums are computed in NUMERIC and cast to float8 in SQL; an empty
// group set never reaches the caller as NULL.

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct TopSoldCar {
    pub brand: String,
    pub model: String,
    pub units_sold: i64,
    pub total_amount: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopSoldCarList {
    pub items: Vec<TopSoldCar>,
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct TopBuyer {
    pub buyer_id: Uuid,
    pub email: String,
    pub purchases_count: i64,
    pub total_spent: f64,
    pub last_purchase_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopBuyerList {
    pub items: Vec<TopBuyer>,
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct TopAgency {
    pub agency_id: Uuid,
    pub name: String,
    pub sales_count: i64,
    pub total_amount: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopAgencyList {
    pub items: Vec<TopAgency>,
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct TopFavoriteCar {
    pub brand: String,
    pub model: String,
    pub favorites_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopFavoriteCarList {
    pub items: Vec<TopFavoriteCar>,
}
