use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::admin::{
        AdminFavoriteItem, AdminFavoriteList, AdminPurchaseItem, AdminPurchaseList,
        AdminReviewItem, AdminReviewList, AdminUserItem, AdminUserList, AgencyUserCreated,
        CreateAgencyUserRequest,
    },
    dto::auth::UserDto,
    entity::{
        agencies::{ActiveModel as AgencyActive, Column as AgencyCol, Entity as Agencies},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Agency, PurchaseStatus},
    response::{ApiResponse, Meta},
    routes::params::{
        AdminFavoriteQuery, AdminPurchaseQuery, AdminReviewQuery, AdminUserQuery, DateRange,
    },
    services::auth_service,
    state::AppState,
};

/// Provisions an agency account. The agency row is reused by exact name when
/// it already exists, so repeated onboarding is safe; the one-account-per-
/// agency constraint is enforced by the database and surfaces as a conflict.
pub async fn create_agency_user(
    state: &AppState,
    user: &AuthUser,
    payload: CreateAgencyUserRequest,
) -> AppResult<ApiResponse<AgencyUserCreated>> {
    ensure_admin(user)?;

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "email and password are required".into(),
        ));
    }
    if payload.agency_name.trim().is_empty() {
        return Err(AppError::BadRequest("agency name is required".into()));
    }

    let existing = Users::find()
        .filter(UserCol::Email.eq(payload.email.clone()))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest("Email is already taken".into()));
    }

    let password_hash = auth_service::hash_password(&payload.password)?;

    let txn = state.orm.begin().await?;

    let agency = Agencies::find()
        .filter(AgencyCol::Name.eq(payload.agency_name.clone()))
        .one(&txn)
        .await?;
    let agency = match agency {
        Some(a) => a,
        None => {
            AgencyActive {
                id: Set(Uuid::new_v4()),
                name: Set(payload.agency_name.clone()),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?
        }
    };

    let inserted = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(payload.email.clone()),
        password_hash: Set(password_hash),
        role: Set("agency".to_string()),
        is_active: Set(true),
        agency_id: Set(Some(agency.id)),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await;

    let new_user = match inserted {
        Ok(u) => u,
        Err(err) => {
            if let Some(SqlErr::UniqueConstraintViolation(msg)) = err.sql_err() {
                return Err(if msg.contains("uq_users_agency_role") {
                    AppError::Conflict("agency already has a linked account".into())
                } else {
                    AppError::BadRequest("Email is already taken".into())
                });
            }
            return Err(err.into());
        }
    };

    txn.commit().await?;

    tracing::info!(
        user_id = %new_user.id,
        agency_id = %agency.id,
        "agency user created"
    );

    let data = AgencyUserCreated {
        user: UserDto {
            id: new_user.id,
            email: new_user.email,
            role: new_user.role,
            is_active: new_user.is_active,
            agency_id: new_user.agency_id,
            created_at: new_user.created_at.with_timezone(&Utc),
        },
        agency: Agency {
            id: agency.id,
            name: agency.name,
            created_at: agency.created_at.with_timezone(&Utc),
        },
    };

    Ok(ApiResponse::ok("Agency user created", data))
}

pub async fn list_all_purchases(
    state: &AppState,
    user: &AuthUser,
    query: AdminPurchaseQuery,
) -> AppResult<ApiResponse<AdminPurchaseList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => Some(
            PurchaseStatus::parse(s)
                .ok_or_else(|| AppError::BadRequest(format!("unknown status '{s}'")))?
                .as_str(),
        ),
        None => None,
    };
    let (from, to) = DateRange::new(query.date_from, query.date_to).bounds();

    let items = sqlx::query_as::<_, AdminPurchaseItem>(
        r#"
        SELECT p.id, u.email AS buyer_email, a.name AS agency_name,
               l.brand, l.model, p.quantity, p.unit_price_amount,
               (p.unit_price_amount * p.quantity) AS total_amount,
               p.status, p.created_at
        FROM purchases p
        JOIN users u ON u.id = p.buyer_id
        JOIN listings l ON l.id = p.listing_id
        JOIN agencies a ON a.id = l.agency_id
        WHERE ($1::text IS NULL
               OR u.email ILIKE '%' || $1 || '%'
               OR l.brand ILIKE '%' || $1 || '%'
               OR l.model ILIKE '%' || $1 || '%'
               OR a.name ILIKE '%' || $1 || '%')
          AND ($2::text IS NULL OR p.status = $2)
          AND ($3::timestamptz IS NULL OR p.created_at >= $3)
          AND ($4::timestamptz IS NULL OR p.created_at < $4)
        ORDER BY p.created_at DESC
        LIMIT $5 OFFSET $6
        "#,
    )
    .bind(&query.q)
    .bind(status)
    .bind(from)
    .bind(to)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM purchases p
        JOIN users u ON u.id = p.buyer_id
        JOIN listings l ON l.id = p.listing_id
        JOIN agencies a ON a.id = l.agency_id
        WHERE ($1::text IS NULL
               OR u.email ILIKE '%' || $1 || '%'
               OR l.brand ILIKE '%' || $1 || '%'
               OR l.model ILIKE '%' || $1 || '%'
               OR a.name ILIKE '%' || $1 || '%')
          AND ($2::text IS NULL OR p.status = $2)
          AND ($3::timestamptz IS NULL OR p.created_at >= $3)
          AND ($4::timestamptz IS NULL OR p.created_at < $4)
        "#,
    )
    .bind(&query.q)
    .bind(status)
    .bind(from)
    .bind(to)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Purchases",
        AdminPurchaseList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn list_all_reviews(
    state: &AppState,
    user: &AuthUser,
    query: AdminReviewQuery,
) -> AppResult<ApiResponse<AdminReviewList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();
    let (from, to) = DateRange::new(query.date_from, query.date_to).bounds();

    let items = sqlx::query_as::<_, AdminReviewItem>(
        r#"
        SELECT r.id, u.email AS author_email, c.brand, c.model,
               r.rating, r.comment, r.created_at
        FROM reviews r
        JOIN users u ON u.id = r.author_id
        JOIN car_models c ON c.id = r.car_model_id
        WHERE ($1::text IS NULL
               OR u.email ILIKE '%' || $1 || '%'
               OR c.brand ILIKE '%' || $1 || '%'
               OR c.model ILIKE '%' || $1 || '%'
               OR r.comment ILIKE '%' || $1 || '%')
          AND ($2::int IS NULL OR r.rating >= $2)
          AND ($3::int IS NULL OR r.rating <= $3)
          AND ($4::timestamptz IS NULL OR r.created_at >= $4)
          AND ($5::timestamptz IS NULL OR r.created_at < $5)
        ORDER BY r.created_at DESC
        LIMIT $6 OFFSET $7
        "#,
    )
    .bind(&query.q)
    .bind(query.min_rating)
    .bind(query.max_rating)
    .bind(from)
    .bind(to)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM reviews r
        JOIN users u ON u.id = r.author_id
        JOIN car_models c ON c.id = r.car_model_id
        WHERE ($1::text IS NULL
               OR u.email ILIKE '%' || $1 || '%'
               OR c.brand ILIKE '%' || $1 || '%'
               OR c.model ILIKE '%' || $1 || '%'
               OR r.comment ILIKE '%' || $1 || '%')
          AND ($2::int IS NULL OR r.rating >= $2)
          AND ($3::int IS NULL OR r.rating <= $3)
          AND ($4::timestamptz IS NULL OR r.created_at >= $4)
          AND ($5::timestamptz IS NULL OR r.created_at < $5)
        "#,
    )
    .bind(&query.q)
    .bind(query.min_rating)
    .bind(query.max_rating)
    .bind(from)
    .bind(to)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Reviews",
        AdminReviewList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn list_all_favorites(
    state: &AppState,
    user: &AuthUser,
    query: AdminFavoriteQuery,
) -> AppResult<ApiResponse<AdminFavoriteList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let items = sqlx::query_as::<_, AdminFavoriteItem>(
        r#"
        SELECT f.id, u.email AS customer_email, l.brand, l.model, f.created_at
        FROM favorites f
        JOIN users u ON u.id = f.customer_id
        JOIN listings l ON l.id = f.listing_id
        WHERE ($1::text IS NULL
               OR u.email ILIKE '%' || $1 || '%'
               OR l.brand ILIKE '%' || $1 || '%'
               OR l.model ILIKE '%' || $1 || '%')
        ORDER BY f.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(&query.q)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM favorites f
        JOIN users u ON u.id = f.customer_id
        JOIN listings l ON l.id = f.listing_id
        WHERE ($1::text IS NULL
               OR u.email ILIKE '%' || $1 || '%'
               OR l.brand ILIKE '%' || $1 || '%'
               OR l.model ILIKE '%' || $1 || '%')
        "#,
    )
    .bind(&query.q)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Favorites",
        AdminFavoriteList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn list_all_users(
    state: &AppState,
    user: &AuthUser,
    query: AdminUserQuery,
) -> AppResult<ApiResponse<AdminUserList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let role = query.role.as_deref().filter(|r| !r.is_empty());
    if let Some(role) = role {
        if !["admin", "buyer", "agency"].contains(&role) {
            return Err(AppError::BadRequest(format!("unknown role '{role}'")));
        }
    }

    let items = sqlx::query_as::<_, AdminUserItem>(
        r#"
        SELECT u.id, u.email, u.role, u.is_active, a.name AS agency_name, u.created_at
        FROM users u
        LEFT JOIN agencies a ON a.id = u.agency_id
        WHERE ($1::text IS NULL OR u.email ILIKE '%' || $1 || '%')
          AND ($2::text IS NULL OR u.role = $2)
        ORDER BY u.created_at ASC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(&query.q)
    .bind(role)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM users u
        WHERE ($1::text IS NULL OR u.email ILIKE '%' || $1 || '%')
          AND ($2::text IS NULL OR u.role = $2)
        "#,
    )
    .bind(&query.q)
    .bind(role)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Users",
        AdminUserList { items },
        Some(Meta::new(page, limit, total)),
    ))
}
