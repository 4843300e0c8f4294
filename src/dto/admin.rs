use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{dto::auth::UserDto, models::Agency};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAgencyUserRequest {
    pub email: String,
    pub password: String,
    pub agency_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AgencyUserCreated {
    pub user: UserDto,
    pub agency: Agency,
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct AdminPurchaseItem {
    pub id: Uuid,
    pub buyer_email: String,
    pub agency_name: String,
    pub brand: String,
    pub model: String,
    pub quantity: i32,
    pub unit_price_amount: Decimal,
    pub total_amount: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminPurchaseList {
    pub items: Vec<AdminPurchaseItem>,
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct AdminReviewItem {
    pub id: Uuid,
    pub author_email: String,
    pub brand: String,
    pub model: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminReviewList {
    pub items: Vec<AdminReviewItem>,
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct AdminFavoriteItem {
    pub id: Uuid,
    pub customer_email: String,
    pub brand: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminFavoriteList {
    pub items: Vec<AdminFavoriteItem>,
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct AdminUserItem {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub agency_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminUserList {
    pub items: Vec<AdminUserItem>,
}
