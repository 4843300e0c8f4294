use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// The car is named by brand and model; the catalog resolves the pair to a
/// car_model row, and unknown pairs are rejected.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInventoryRequest {
    pub brand: String,
    pub model: String,
    pub quantity: i32,
    pub is_used: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateInventoryRequest {
    pub quantity: Option<i32>,
    pub is_used: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct InventoryItemWithModel {
    pub id: Uuid,
    pub brand: String,
    pub model: String,
    pub quantity: i32,
    pub is_used: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryList {
    pub items: Vec<InventoryItemWithModel>,
}
