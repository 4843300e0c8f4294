use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReviewRequest {
    pub listing_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReviewRequest {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

/// Review of a listing's car model, with the author attached.
#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct ListingReviewItem {
    pub id: Uuid,
    pub author_email: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListingReviewList {
    pub items: Vec<ListingReviewItem>,
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct MyReviewItem {
    pub id: Uuid,
    pub car_model_id: Uuid,
    pub brand: String,
    pub model: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MyReviewList {
    pub items: Vec<MyReviewItem>,
}
