use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    dto::reviews::{
        CreateReviewRequest, ListingReviewItem, ListingReviewList, MyReviewItem, MyReviewList,
        UpdateReviewRequest,
    },
    entity::{
        listings::Entity as Listings,
        reviews::{ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews,
            Model as ReviewModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_buyer},
    models::Review,
    response::{ApiResponse, Meta},
    routes::params::{DateRange, MyReviewQuery, Pagination},
    state::AppState,
};

/// Reviews are written against a listing but stored against its car model, so
/// every listing of the same car shares one rating history.
pub async fn create_review(
    state: &AppState,
    user: &AuthUser,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    ensure_buyer(user)?;

    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest(
            "rating must be between 1 and 5".into(),
        ));
    }

    let listing = Listings::find_by_id(payload.listing_id)
        .one(&state.orm)
        .await?;
    let listing = match listing {
        Some(l) => l,
        None => return Err(AppError::NotFound),
    };

    let review = ReviewActive {
        id: Set(Uuid::new_v4()),
        car_model_id: Set(listing.car_model_id),
        author_id: Set(user.user_id),
        rating: Set(payload.rating),
        comment: Set(payload.comment),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(review_id = %review.id, car_model_id = %review.car_model_id, "review created");

    Ok(ApiResponse::ok("Review created", review_from_entity(review)))
}

/// An unknown listing id yields an empty page rather than an error; the
/// subquery resolves to NULL and matches nothing.
pub async fn list_listing_reviews(
    state: &AppState,
    listing_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<ListingReviewList>> {
    let (page, limit, offset) = pagination.normalize();

    let items = sqlx::query_as::<_, ListingReviewItem>(
        r#"
        SELECT r.id, u.email AS author_email, r.rating, r.comment, r.created_at
        FROM reviews r
        JOIN users u ON u.id = r.author_id
        WHERE r.car_model_id = (SELECT car_model_id FROM listings WHERE id = $1)
        ORDER BY r.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(listing_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM reviews r
        WHERE r.car_model_id = (SELECT car_model_id FROM listings WHERE id = $1)
        "#,
    )
    .bind(listing_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Reviews",
        ListingReviewList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn update_review(
    state: &AppState,
    user: &AuthUser,
    review_id: Uuid,
    payload: UpdateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    ensure_buyer(user)?;

    if let Some(rating) = payload.rating {
        if !(1..=5).contains(&rating) {
            return Err(AppError::BadRequest(
                "rating must be between 1 and 5".into(),
            ));
        }
    }

    let existing = Reviews::find()
        .filter(
            Condition::all()
                .add(ReviewCol::Id.eq(review_id))
                .add(ReviewCol::AuthorId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?;
    let existing = match existing {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };

    let mut active: ReviewActive = existing.into();
    if let Some(rating) = payload.rating {
        active.rating = Set(rating);
    }
    if let Some(comment) = payload.comment {
        active.comment = Set(Some(comment));
    }
    let review = active.update(&state.orm).await?;

    Ok(ApiResponse::ok("Review updated", review_from_entity(review)))
}

pub async fn list_my_reviews(
    state: &AppState,
    user: &AuthUser,
    query: MyReviewQuery,
) -> AppResult<ApiResponse<MyReviewList>> {
    ensure_buyer(user)?;

    let (from, to) = DateRange::new(query.date_from, query.date_to).bounds();

    let items = sqlx::query_as::<_, MyReviewItem>(
        r#"
        SELECT r.id, r.car_model_id, c.brand, c.model, r.rating, r.comment, r.created_at
        FROM reviews r
        JOIN car_models c ON c.id = r.car_model_id
        WHERE r.author_id = $1
          AND ($2::text IS NULL OR c.brand ILIKE '%' || $2 || '%')
          AND ($3::text IS NULL OR c.model ILIKE '%' || $3 || '%')
          AND ($4::int IS NULL OR r.rating >= $4)
          AND ($5::timestamptz IS NULL OR r.created_at >= $5)
          AND ($6::timestamptz IS NULL OR r.created_at < $6)
        ORDER BY r.created_at DESC
        "#,
    )
    .bind(user.user_id)
    .bind(&query.brand)
    .bind(&query.model)
    .bind(query.min_rating)
    .bind(from)
    .bind(to)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::ok("My reviews", MyReviewList { items }))
}

pub(crate) fn review_from_entity(model: ReviewModel) -> Review {
    Review {
        id: model.id,
        car_model_id: model.car_model_id,
        author_id: model.author_id,
        rating: model.rating,
        comment: model.comment,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
