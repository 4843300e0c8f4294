use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Purchase;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePurchaseRequest {
    pub listing_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseList {
    pub items: Vec<Purchase>,
}

/// One completed sale of an agency's listing, joined with the buyer.
#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct SaleItem {
    pub purchase_id: Uuid,
    pub listing_id: Uuid,
    pub brand: String,
    pub model: String,
    pub buyer_email: String,
    pub quantity: i32,
    pub unit_price_amount: Decimal,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaleList {
    pub items: Vec<SaleItem>,
}

/// Buyer aggregated over their completed purchases at one agency.
#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct CustomerSummary {
    pub buyer_id: Uuid,
    pub email: String,
    pub purchases_count: i64,
    pub total_spent: f64,
    pub last_purchase_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerList {
    pub items: Vec<CustomerSummary>,
}
