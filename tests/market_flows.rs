use axum_car_market_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        admin::CreateAgencyUserRequest,
        auth::{LoginRequest, RegisterRequest},
        inventory::{CreateInventoryRequest, UpdateInventoryRequest},
        listings::{CreateListingRequest, UpdateListingRequest},
        purchases::CreatePurchaseRequest,
        reviews::{CreateReviewRequest, UpdateReviewRequest},
    },
    entity::{
        agencies::ActiveModel as AgencyActive,
        car_models::ActiveModel as CarModelActive,
        listings::{ActiveModel as ListingActive, Entity as Listings},
        purchases::ActiveModel as PurchaseActive,
        users::ActiveModel as UserActive,
    },
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::{
        AdminFavoriteQuery, AdminPurchaseQuery, AdminReviewQuery, AdminUserQuery, CarModelQuery,
        CustomerListQuery, FavoriteListQuery, InventoryListQuery, ListingQuery, ListingSortBy,
        MyReviewQuery, Pagination, ReportQuery, SaleListQuery,
    },
    services::{
        admin_service, auth_service, car_model_service, favorite_service, inventory_service,
        listing_service, purchase_service, report_service, review_service,
    },
    state::AppState,
};
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

// All tests share one database; the lock keeps their TRUNCATE-based setup
// from interleaving.
static DB_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

#[tokio::test]
async fn purchase_cancel_and_reactivate_restore_stock() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let agency_id = create_agency(&state, "Prime Motors").await?;
    create_user(&state, "agency", "prime@example.com", Some(agency_id)).await?;
    let buyer_id = create_user(&state, "buyer", "ben@example.com", None).await?;
    let buyer = buyer_auth(buyer_id);

    let model_id = create_car_model(&state, "BMW", "3 Series").await?;
    let listing_id = create_listing_row(
        &state,
        agency_id,
        model_id,
        "BMW",
        "3 Series",
        Decimal::new(20000, 2),
        5,
    )
    .await?;

    // Buy two units
    let resp = purchase_service::create_purchase(
        &state,
        &buyer,
        CreatePurchaseRequest {
            listing_id,
            quantity: 2,
        },
    )
    .await?;
    assert_eq!(resp.message, "Purchase completed");
    let purchase = resp.data.unwrap();
    assert_eq!(purchase.status, "COMPLETED");
    assert_eq!(purchase.quantity, 2);
    assert_eq!(purchase.unit_price_amount, Decimal::new(20000, 2));
    assert_eq!(listing_stock(&state, listing_id).await?, 3);

    let mine = purchase_service::list_my_purchases(&state, &buyer).await?;
    assert_eq!(mine.data.unwrap().items.len(), 1);

    // Cancel returns the units
    let cancelled = purchase_service::cancel_purchase(&state, &buyer, purchase.id)
        .await?
        .data
        .unwrap();
    assert_eq!(cancelled.status, "CANCELLED");
    assert_eq!(listing_stock(&state, listing_id).await?, 5);

    let err = purchase_service::cancel_purchase(&state, &buyer, purchase.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    // Reactivate takes them again
    let reactivated = purchase_service::reactivate_purchase(&state, &buyer, purchase.id)
        .await?
        .data
        .unwrap();
    assert_eq!(reactivated.status, "COMPLETED");
    assert_eq!(listing_stock(&state, listing_id).await?, 3);

    let err = purchase_service::reactivate_purchase(&state, &buyer, purchase.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    // History keeps the row through the whole cycle
    let mine = purchase_service::list_my_purchases(&state, &buyer).await?;
    let items = mine.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].status, "COMPLETED");

    Ok(())
}

#[tokio::test]
async fn purchase_stock_guards_hold() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let agency_id = create_agency(&state, "Prime Motors").await?;
    let first_id = create_user(&state, "buyer", "first@example.com", None).await?;
    let second_id = create_user(&state, "buyer", "second@example.com", None).await?;
    let first = buyer_auth(first_id);
    let second = buyer_auth(second_id);

    let model_id = create_car_model(&state, "Ford", "Mustang").await?;
    let listing_id = create_listing_row(
        &state,
        agency_id,
        model_id,
        "Ford",
        "Mustang",
        Decimal::new(10000, 2),
        1,
    )
    .await?;

    // Asking for more than the stock fails and leaves the stock alone
    let err = purchase_service::create_purchase(
        &state,
        &first,
        CreatePurchaseRequest {
            listing_id,
            quantity: 2,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
    assert_eq!(listing_stock(&state, listing_id).await?, 1);

    let err = purchase_service::create_purchase(
        &state,
        &first,
        CreatePurchaseRequest {
            listing_id,
            quantity: 0,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = purchase_service::create_purchase(
        &state,
        &first,
        CreatePurchaseRequest {
            listing_id: Uuid::new_v4(),
            quantity: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    // First buyer drains the listing
    let purchase = purchase_service::create_purchase(
        &state,
        &first,
        CreatePurchaseRequest {
            listing_id,
            quantity: 1,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(listing_stock(&state, listing_id).await?, 0);

    let err = purchase_service::create_purchase(
        &state,
        &second,
        CreatePurchaseRequest {
            listing_id,
            quantity: 1,
        },
    )
    .await
    .unwrap_err();
    match err {
        AppError::InvalidState(msg) => assert!(msg.contains("no stock")),
        other => panic!("expected InvalidState, got {other:?}"),
    }

    // Cancelling frees the unit for the second buyer
    purchase_service::cancel_purchase(&state, &first, purchase.id).await?;
    assert_eq!(listing_stock(&state, listing_id).await?, 1);
    purchase_service::create_purchase(
        &state,
        &second,
        CreatePurchaseRequest {
            listing_id,
            quantity: 1,
        },
    )
    .await?;
    assert_eq!(listing_stock(&state, listing_id).await?, 0);

    // The first buyer cannot reactivate into a drained listing
    let err = purchase_service::reactivate_purchase(&state, &first, purchase.id)
        .await
        .unwrap_err();
    match err {
        AppError::InvalidState(msg) => assert!(msg.contains("not enough stock")),
        other => panic!("expected InvalidState, got {other:?}"),
    }
    assert_eq!(listing_stock(&state, listing_id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn concurrent_purchases_cannot_oversell() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let agency_id = create_agency(&state, "Prime Motors").await?;
    let first_id = create_user(&state, "buyer", "first@example.com", None).await?;
    let second_id = create_user(&state, "buyer", "second@example.com", None).await?;
    let first = buyer_auth(first_id);
    let second = buyer_auth(second_id);

    let model_id = create_car_model(&state, "Ford", "Mustang").await?;
    let listing_id = create_listing_row(
        &state,
        agency_id,
        model_id,
        "Ford",
        "Mustang",
        Decimal::new(10000, 2),
        1,
    )
    .await?;

    // Both buyers grab the last unit at once; the row lock picks one winner
    let (first_result, second_result) = tokio::join!(
        purchase_service::create_purchase(
            &state,
            &first,
            CreatePurchaseRequest {
                listing_id,
                quantity: 1,
            },
        ),
        purchase_service::create_purchase(
            &state,
            &second,
            CreatePurchaseRequest {
                listing_id,
                quantity: 1,
            },
        ),
    );

    let err = match (first_result, second_result) {
        (Ok(_), Err(err)) | (Err(err), Ok(_)) => err,
        (Ok(_), Ok(_)) => panic!("both purchases succeeded on a single unit"),
        (Err(first_err), Err(second_err)) => {
            panic!("both purchases failed: {first_err:?} / {second_err:?}")
        }
    };
    match err {
        AppError::InvalidState(msg) => assert!(msg.contains("no stock")),
        other => panic!("expected InvalidState, got {other:?}"),
    }
    assert_eq!(listing_stock(&state, listing_id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn purchase_ownership_and_roles_are_enforced() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let agency_id = create_agency(&state, "Prime Motors").await?;
    let agency_user_id = create_user(&state, "agency", "prime@example.com", Some(agency_id)).await?;
    let owner_id = create_user(&state, "buyer", "owner@example.com", None).await?;
    let other_id = create_user(&state, "buyer", "other@example.com", None).await?;
    let admin_id = create_user(&state, "admin", "admin@example.com", None).await?;
    let owner = buyer_auth(owner_id);
    let other = buyer_auth(other_id);

    let model_id = create_car_model(&state, "Kia", "Sportage").await?;
    let listing_id = create_listing_row(
        &state,
        agency_id,
        model_id,
        "Kia",
        "Sportage",
        Decimal::new(9000, 2),
        5,
    )
    .await?;

    let purchase = purchase_service::create_purchase(
        &state,
        &owner,
        CreatePurchaseRequest {
            listing_id,
            quantity: 1,
        },
    )
    .await?
    .data
    .unwrap();

    let err = purchase_service::cancel_purchase(&state, &other, purchase.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = purchase_service::reactivate_purchase(&state, &other, purchase.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // Non-buyer roles are rejected outright
    let err = purchase_service::create_purchase(
        &state,
        &agency_auth(agency_user_id, agency_id),
        CreatePurchaseRequest {
            listing_id,
            quantity: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = purchase_service::cancel_purchase(&state, &admin_auth(admin_id), purchase.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = purchase_service::cancel_purchase(&state, &owner, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}

#[tokio::test]
async fn favorites_are_idempotent_and_toggle() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let agency_id = create_agency(&state, "Prime Motors").await?;
    let agency_user_id = create_user(&state, "agency", "prime@example.com", Some(agency_id)).await?;
    let buyer_id = create_user(&state, "buyer", "maya@example.com", None).await?;
    let buyer = buyer_auth(buyer_id);

    let model_id = create_car_model(&state, "BMW", "3 Series").await?;
    let listing_id = create_listing_row(
        &state,
        agency_id,
        model_id,
        "BMW",
        "3 Series",
        Decimal::new(20000, 2),
        5,
    )
    .await?;

    let first = favorite_service::add_favorite(&state.pool, &buyer, listing_id)
        .await?
        .data
        .unwrap();
    assert_eq!(first.customer_id, buyer_id);
    assert_eq!(first.listing_id, listing_id);

    // Adding again returns the same row
    let again = favorite_service::add_favorite(&state.pool, &buyer, listing_id)
        .await?
        .data
        .unwrap();
    assert_eq!(again.id, first.id);

    let favorites =
        favorite_service::list_favorites(&state.pool, &buyer, favorite_query()).await?;
    let items = favorites.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].brand, "BMW");

    let filtered = favorite_service::list_favorites(
        &state.pool,
        &buyer,
        FavoriteListQuery {
            brand: Some("toy".into()),
            ..favorite_query()
        },
    )
    .await?;
    assert!(filtered.data.unwrap().items.is_empty());

    let removed = favorite_service::remove_favorite(&state.pool, &buyer, listing_id)
        .await?
        .data
        .unwrap();
    assert!(removed.removed);
    let removed = favorite_service::remove_favorite(&state.pool, &buyer, listing_id)
        .await?
        .data
        .unwrap();
    assert!(!removed.removed);

    let status = favorite_service::toggle_favorite(&state.pool, &buyer, listing_id)
        .await?
        .data
        .unwrap();
    assert!(status.is_favorite);
    let status = favorite_service::toggle_favorite(&state.pool, &buyer, listing_id)
        .await?
        .data
        .unwrap();
    assert!(!status.is_favorite);

    let err = favorite_service::add_favorite(&state.pool, &buyer, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let err = favorite_service::add_favorite(
        &state.pool,
        &agency_auth(agency_user_id, agency_id),
        listing_id,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // Price filters apply to the listing's current price
    favorite_service::add_favorite(&state.pool, &buyer, listing_id).await?;
    let cheap = favorite_service::list_favorites(
        &state.pool,
        &buyer,
        FavoriteListQuery {
            max_price: Some(Decimal::new(50000, 2)),
            ..favorite_query()
        },
    )
    .await?;
    assert_eq!(cheap.data.unwrap().items.len(), 1);
    let pricey = favorite_service::list_favorites(
        &state.pool,
        &buyer,
        FavoriteListQuery {
            min_price: Some(Decimal::new(50000, 2)),
            ..favorite_query()
        },
    )
    .await?;
    assert!(pricey.data.unwrap().items.is_empty());

    Ok(())
}

#[tokio::test]
async fn concurrent_favorite_adds_return_one_row() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let agency_id = create_agency(&state, "Prime Motors").await?;
    let buyer_id = create_user(&state, "buyer", "maya@example.com", None).await?;
    let buyer = buyer_auth(buyer_id);

    let model_id = create_car_model(&state, "BMW", "3 Series").await?;
    let listing_id = create_listing_row(
        &state,
        agency_id,
        model_id,
        "BMW",
        "3 Series",
        Decimal::new(20000, 2),
        5,
    )
    .await?;

    // Concurrent double-taps settle on one surviving row no matter which
    // insert wins the unique constraint
    for _ in 0..5 {
        let (first_add, second_add) = tokio::join!(
            favorite_service::add_favorite(&state.pool, &buyer, listing_id),
            favorite_service::add_favorite(&state.pool, &buyer, listing_id),
        );
        let first_fav = first_add?.data.unwrap();
        let second_fav = second_add?.data.unwrap();
        assert_eq!(first_fav.id, second_fav.id);
        assert_eq!(first_fav.customer_id, buyer_id);

        favorite_service::remove_favorite(&state.pool, &buyer, listing_id).await?;
    }

    Ok(())
}

#[tokio::test]
async fn inventory_consolidates_and_feeds_listings() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let agency_a = create_agency(&state, "Prime Motors").await?;
    let user_a = create_user(&state, "agency", "prime@example.com", Some(agency_a)).await?;
    let agency_b = create_agency(&state, "Velocity Cars").await?;
    let user_b = create_user(&state, "agency", "velocity@example.com", Some(agency_b)).await?;
    let auth_a = agency_auth(user_a, agency_a);
    let auth_b = agency_auth(user_b, agency_b);

    create_car_model(&state, "Toyota", "RAV4").await?;

    let resp = inventory_service::create_or_consolidate_inventory(
        &state,
        &auth_a,
        CreateInventoryRequest {
            brand: "Toyota".into(),
            model: "RAV4".into(),
            quantity: 3,
            is_used: None,
        },
    )
    .await?;
    assert_eq!(resp.message, "Inventory stocked");
    let item = resp.data.unwrap();
    assert_eq!(item.quantity, 3);
    assert!(!item.is_used);

    // Restocking the same model folds into the existing row
    let merged = inventory_service::create_or_consolidate_inventory(
        &state,
        &auth_a,
        CreateInventoryRequest {
            brand: "Toyota".into(),
            model: "RAV4".into(),
            quantity: 2,
            is_used: Some(true),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(merged.id, item.id);
    assert_eq!(merged.quantity, 5);
    assert!(merged.is_used);

    let err = inventory_service::create_or_consolidate_inventory(
        &state,
        &auth_a,
        CreateInventoryRequest {
            brand: "Mazda".into(),
            model: "CX-5".into(),
            quantity: 1,
            is_used: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let err = inventory_service::create_or_consolidate_inventory(
        &state,
        &auth_a,
        CreateInventoryRequest {
            brand: "Toyota".into(),
            model: "RAV4".into(),
            quantity: 0,
            is_used: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let updated = inventory_service::update_inventory(
        &state,
        &auth_a,
        item.id,
        UpdateInventoryRequest {
            quantity: Some(7),
            is_used: Some(false),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(updated.quantity, 7);
    assert!(!updated.is_used);

    // Another agency cannot see or touch the row
    let err = inventory_service::update_inventory(
        &state,
        &auth_b,
        item.id,
        UpdateInventoryRequest {
            quantity: Some(1),
            is_used: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let err = inventory_service::update_inventory(
        &state,
        &auth_a,
        item.id,
        UpdateInventoryRequest {
            quantity: Some(-1),
            is_used: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let listed = inventory_service::list_inventory(
        &state,
        &auth_a,
        InventoryListQuery {
            page: None,
            per_page: None,
            brand: Some("toy".into()),
            model: None,
            is_used: None,
        },
    )
    .await?;
    let listed = listed.data.unwrap().items;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].quantity, 7);

    let used_only = inventory_service::list_inventory(
        &state,
        &auth_a,
        InventoryListQuery {
            page: None,
            per_page: None,
            brand: None,
            model: None,
            is_used: Some(true),
        },
    )
    .await?;
    assert!(used_only.data.unwrap().items.is_empty());

    let other_agency = inventory_service::list_inventory(
        &state,
        &auth_b,
        InventoryListQuery {
            page: None,
            per_page: None,
            brand: None,
            model: None,
            is_used: None,
        },
    )
    .await?;
    assert!(other_agency.data.unwrap().items.is_empty());

    // A listing built from the item snapshots the catalog names
    let listing = listing_service::create_listing(
        &state,
        &auth_a,
        CreateListingRequest {
            inventory_id: item.id,
            price_amount: Decimal::new(15000, 2),
            price_currency: None,
            stock: Some(2),
            seller_notes: Some("clean title".into()),
            expires_on: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(listing.brand, "Toyota");
    assert_eq!(listing.model, "RAV4");
    assert_eq!(listing.price_amount, Decimal::new(15000, 2));
    assert_eq!(listing.price_currency, "USD");
    assert_eq!(listing.stock, 2);
    assert!(listing.is_active);

    let err = listing_service::create_listing(
        &state,
        &auth_b,
        CreateListingRequest {
            inventory_id: item.id,
            price_amount: Decimal::new(15000, 2),
            price_currency: None,
            stock: None,
            seller_notes: None,
            expires_on: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let err = listing_service::create_listing(
        &state,
        &auth_a,
        CreateListingRequest {
            inventory_id: Uuid::new_v4(),
            price_amount: Decimal::new(15000, 2),
            price_currency: None,
            stock: None,
            seller_notes: None,
            expires_on: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let err = listing_service::create_listing(
        &state,
        &auth_a,
        CreateListingRequest {
            inventory_id: item.id,
            price_amount: Decimal::ZERO,
            price_currency: None,
            stock: None,
            seller_notes: None,
            expires_on: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = listing_service::create_listing(
        &state,
        &auth_a,
        CreateListingRequest {
            inventory_id: item.id,
            price_amount: Decimal::new(15000, 2),
            price_currency: Some("USDX".into()),
            stock: None,
            seller_notes: None,
            expires_on: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Deleting the warehouse row does not touch the listing
    let err = inventory_service::delete_inventory(&state, &auth_b, item.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    inventory_service::delete_inventory(&state, &auth_a, item.id).await?;
    let err = inventory_service::delete_inventory(&state, &auth_a, item.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let survived = listing_service::get_my_listing(&state, &auth_a, listing.id).await?;
    assert_eq!(survived.data.unwrap().brand, "Toyota");

    Ok(())
}

#[tokio::test]
async fn listing_updates_are_scoped_to_their_agency() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let agency_a = create_agency(&state, "Prime Motors").await?;
    let user_a = create_user(&state, "agency", "prime@example.com", Some(agency_a)).await?;
    let agency_b = create_agency(&state, "Velocity Cars").await?;
    let user_b = create_user(&state, "agency", "velocity@example.com", Some(agency_b)).await?;
    let buyer_id = create_user(&state, "buyer", "ben@example.com", None).await?;
    let auth_a = agency_auth(user_a, agency_a);
    let auth_b = agency_auth(user_b, agency_b);
    let buyer = buyer_auth(buyer_id);

    let model_id = create_car_model(&state, "BMW", "3 Series").await?;
    let listing_id = create_listing_row(
        &state,
        agency_a,
        model_id,
        "BMW",
        "3 Series",
        Decimal::new(30000, 2),
        3,
    )
    .await?;

    let updated = listing_service::update_listing(
        &state,
        &auth_a,
        listing_id,
        UpdateListingRequest {
            price_amount: Some(Decimal::new(25000, 2)),
            price_currency: None,
            stock: Some(4),
            seller_notes: Some("negotiable".into()),
            is_active: None,
            expires_on: None,
        },
    )
    .await?;
    assert_eq!(updated.message, "Listing updated");
    let updated = updated.data.unwrap();
    assert_eq!(updated.price_amount, Decimal::new(25000, 2));
    assert_eq!(updated.stock, 4);
    assert_eq!(updated.seller_notes.as_deref(), Some("negotiable"));

    let err = listing_service::update_listing(
        &state,
        &auth_b,
        listing_id,
        UpdateListingRequest {
            price_amount: Some(Decimal::new(100, 2)),
            price_currency: None,
            stock: None,
            seller_notes: None,
            is_active: None,
            expires_on: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = listing_service::update_listing(
        &state,
        &auth_a,
        listing_id,
        UpdateListingRequest {
            price_amount: Some(Decimal::new(-100, 2)),
            price_currency: None,
            stock: None,
            seller_notes: None,
            is_active: None,
            expires_on: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = listing_service::update_listing(
        &state,
        &auth_a,
        listing_id,
        UpdateListingRequest {
            price_amount: None,
            price_currency: Some("EU".into()),
            stock: None,
            seller_notes: None,
            is_active: None,
            expires_on: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = listing_service::update_listing(
        &state,
        &auth_a,
        listing_id,
        UpdateListingRequest {
            price_amount: None,
            price_currency: None,
            stock: Some(-1),
            seller_notes: None,
            is_active: None,
            expires_on: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Cancel hides the listing from browse but not from direct lookup
    let err = listing_service::set_listing_active(&state, &auth_b, listing_id, false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let cancelled = listing_service::set_listing_active(&state, &auth_a, listing_id, false).await?;
    assert_eq!(cancelled.message, "Listing cancelled");
    assert!(!cancelled.data.unwrap().is_active);

    let browse = listing_service::browse_listings(&state, None, listing_query()).await?;
    assert!(browse.data.unwrap().items.is_empty());

    let direct = listing_service::get_listing(&state, None, listing_id).await?;
    assert!(!direct.data.unwrap().listing.is_active);

    let activated = listing_service::set_listing_active(&state, &auth_a, listing_id, true).await?;
    assert_eq!(activated.message, "Listing activated");
    let browse = listing_service::browse_listings(&state, None, listing_query()).await?;
    assert_eq!(browse.data.unwrap().items.len(), 1);

    // A sold listing cannot be deleted
    purchase_service::create_purchase(
        &state,
        &buyer,
        CreatePurchaseRequest {
            listing_id,
            quantity: 1,
        },
    )
    .await?;
    let err = listing_service::delete_listing(&state, &auth_a, listing_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let fresh_id = create_listing_row(
        &state,
        agency_a,
        model_id,
        "BMW",
        "3 Series",
        Decimal::new(31000, 2),
        1,
    )
    .await?;
    let deleted = listing_service::delete_listing(&state, &auth_a, fresh_id).await?;
    assert_eq!(deleted.message, "Listing deleted");
    let err = listing_service::get_my_listing(&state, &auth_a, fresh_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    let err = listing_service::get_listing(&state, None, fresh_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let mine = listing_service::list_my_listings(
        &state,
        &auth_a,
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await?;
    assert_eq!(mine.data.unwrap().items.len(), 1);
    let theirs = listing_service::list_my_listings(
        &state,
        &auth_b,
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await?;
    assert!(theirs.data.unwrap().items.is_empty());

    Ok(())
}

#[tokio::test]
async fn browse_cards_carry_favorites_and_ratings() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let agency_id = create_agency(&state, "Prime Motors").await?;
    let agency_user_id = create_user(&state, "agency", "prime@example.com", Some(agency_id)).await?;
    let maya_id = create_user(&state, "buyer", "maya@example.com", None).await?;
    let liam_id = create_user(&state, "buyer", "liam@example.com", None).await?;
    let auth_agency = agency_auth(agency_user_id, agency_id);
    let maya = buyer_auth(maya_id);
    let liam = buyer_auth(liam_id);

    let bmw_model = create_car_model(&state, "BMW", "3 Series").await?;
    let toyota_model = create_car_model(&state, "Toyota", "Corolla").await?;
    let audi_model = create_car_model(&state, "Audi", "A6").await?;

    let bmw_listing = create_listing_row(
        &state,
        agency_id,
        bmw_model,
        "BMW",
        "3 Series",
        Decimal::new(20000, 2),
        5,
    )
    .await?;
    let toyota_listing = create_listing_row(
        &state,
        agency_id,
        toyota_model,
        "Toyota",
        "Corolla",
        Decimal::new(5000, 2),
        5,
    )
    .await?;
    let hidden_listing = create_listing_row(
        &state,
        agency_id,
        audi_model,
        "Audi",
        "A6",
        Decimal::new(40000, 2),
        5,
    )
    .await?;
    listing_service::set_listing_active(&state, &auth_agency, hidden_listing, false).await?;

    favorite_service::add_favorite(&state.pool, &maya, bmw_listing).await?;
    review_service::create_review(
        &state,
        &maya,
        CreateReviewRequest {
            listing_id: bmw_listing,
            rating: 4,
            comment: Some("comfortable".into()),
        },
    )
    .await?;
    review_service::create_review(
        &state,
        &liam,
        CreateReviewRequest {
            listing_id: bmw_listing,
            rating: 5,
            comment: None,
        },
    )
    .await?;

    // Anonymous browse: no favorite flags, ratings still aggregated
    let cards = listing_service::browse_listings(&state, None, listing_query())
        .await?
        .data
        .unwrap()
        .items;
    assert_eq!(cards.len(), 2);
    let bmw_card = cards
        .iter()
        .find(|c| c.listing.id == bmw_listing)
        .expect("bmw card");
    assert!(!bmw_card.is_favorite);
    assert_eq!(bmw_card.avg_rating, Some(4.5));
    assert_eq!(bmw_card.reviews_count, 2);
    let toyota_card = cards
        .iter()
        .find(|c| c.listing.id == toyota_listing)
        .expect("toyota card");
    assert_eq!(toyota_card.avg_rating, None);
    assert_eq!(toyota_card.reviews_count, 0);

    // Favorite flags are per caller
    let cards = listing_service::browse_listings(&state, Some(&maya), listing_query())
        .await?
        .data
        .unwrap()
        .items;
    let bmw_card = cards.iter().find(|c| c.listing.id == bmw_listing).unwrap();
    assert!(bmw_card.is_favorite);
    let toyota_card = cards
        .iter()
        .find(|c| c.listing.id == toyota_listing)
        .unwrap();
    assert!(!toyota_card.is_favorite);

    let cards = listing_service::browse_listings(&state, Some(&liam), listing_query())
        .await?
        .data
        .unwrap()
        .items;
    assert!(cards.iter().all(|c| !c.is_favorite));

    // Agency viewers never get favorite flags
    let cards = listing_service::browse_listings(&state, Some(&auth_agency), listing_query())
        .await?
        .data
        .unwrap()
        .items;
    assert!(cards.iter().all(|c| !c.is_favorite));

    let found = listing_service::browse_listings(
        &state,
        None,
        ListingQuery {
            q: Some("bmw".into()),
            ..listing_query()
        },
    )
    .await?
    .data
    .unwrap()
    .items;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].listing.brand, "BMW");

    let found = listing_service::browse_listings(
        &state,
        None,
        ListingQuery {
            brand: Some("toy".into()),
            ..listing_query()
        },
    )
    .await?
    .data
    .unwrap()
    .items;
    assert_eq!(found.len(), 1);

    let found = listing_service::browse_listings(
        &state,
        None,
        ListingQuery {
            min_price: Some(Decimal::new(10000, 2)),
            ..listing_query()
        },
    )
    .await?
    .data
    .unwrap()
    .items;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].listing.brand, "BMW");

    let found = listing_service::browse_listings(
        &state,
        None,
        ListingQuery {
            max_price: Some(Decimal::new(10000, 2)),
            ..listing_query()
        },
    )
    .await?
    .data
    .unwrap()
    .items;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].listing.brand, "Toyota");

    let found = listing_service::browse_listings(
        &state,
        None,
        ListingQuery {
            agency_id: Some(Uuid::new_v4()),
            ..listing_query()
        },
    )
    .await?
    .data
    .unwrap()
    .items;
    assert!(found.is_empty());

    let sorted = listing_service::browse_listings(
        &state,
        None,
        ListingQuery {
            sort: Some(ListingSortBy::PriceAsc),
            ..listing_query()
        },
    )
    .await?
    .data
    .unwrap()
    .items;
    assert_eq!(sorted[0].listing.brand, "Toyota");
    let sorted = listing_service::browse_listings(
        &state,
        None,
        ListingQuery {
            sort: Some(ListingSortBy::PriceDesc),
            ..listing_query()
        },
    )
    .await?
    .data
    .unwrap()
    .items;
    assert_eq!(sorted[0].listing.brand, "BMW");
    let sorted = listing_service::browse_listings(
        &state,
        None,
        ListingQuery {
            sort: Some(ListingSortBy::Newest),
            ..listing_query()
        },
    )
    .await?
    .data
    .unwrap()
    .items;
    assert_eq!(sorted[0].listing.brand, "Toyota");

    let page = listing_service::browse_listings(
        &state,
        None,
        ListingQuery {
            per_page: Some(1),
            ..listing_query()
        },
    )
    .await?;
    let meta = page.meta.clone().expect("meta");
    assert_eq!(meta.total, Some(2));
    assert_eq!(page.data.unwrap().items.len(), 1);

    let card = listing_service::get_listing(&state, Some(&maya), bmw_listing)
        .await?
        .data
        .unwrap();
    assert!(card.is_favorite);
    assert_eq!(card.avg_rating, Some(4.5));

    let err = listing_service::get_listing(&state, None, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}

#[tokio::test]
async fn reviews_are_shared_across_listings_of_a_model() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let agency_id = create_agency(&state, "Prime Motors").await?;
    let agency_user_id = create_user(&state, "agency", "prime@example.com", Some(agency_id)).await?;
    let maya_id = create_user(&state, "buyer", "maya@example.com", None).await?;
    let liam_id = create_user(&state, "buyer", "liam@example.com", None).await?;
    let admin_id = create_user(&state, "admin", "admin@example.com", None).await?;
    let maya = buyer_auth(maya_id);
    let liam = buyer_auth(liam_id);
    let admin = admin_auth(admin_id);

    let civic = create_car_model(&state, "Honda", "Civic").await?;
    let first_listing = create_listing_row(
        &state,
        agency_id,
        civic,
        "Honda",
        "Civic",
        Decimal::new(12000, 2),
        5,
    )
    .await?;
    let second_listing = create_listing_row(
        &state,
        agency_id,
        civic,
        "Honda",
        "Civic",
        Decimal::new(11500, 2),
        5,
    )
    .await?;

    let review = review_service::create_review(
        &state,
        &maya,
        CreateReviewRequest {
            listing_id: first_listing,
            rating: 5,
            comment: Some("solid".into()),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(review.car_model_id, civic);
    assert_eq!(review.rating, 5);

    for bad_rating in [0, 6] {
        let err = review_service::create_review(
            &state,
            &maya,
            CreateReviewRequest {
                listing_id: first_listing,
                rating: bad_rating,
                comment: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    let err = review_service::create_review(
        &state,
        &maya,
        CreateReviewRequest {
            listing_id: Uuid::new_v4(),
            rating: 3,
            comment: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let err = review_service::create_review(
        &state,
        &agency_auth(agency_user_id, agency_id),
        CreateReviewRequest {
            listing_id: first_listing,
            rating: 3,
            comment: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // The second listing of the same model shows the same review pool
    let pool = review_service::list_listing_reviews(
        &state,
        second_listing,
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await?;
    let items = pool.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].author_email, "maya@example.com");

    review_service::create_review(
        &state,
        &liam,
        CreateReviewRequest {
            listing_id: second_listing,
            rating: 3,
            comment: None,
        },
    )
    .await?;

    let pool = review_service::list_listing_reviews(
        &state,
        first_listing,
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await?;
    let meta = pool.meta.clone().expect("meta");
    assert_eq!(meta.total, Some(2));
    let items = pool.data.unwrap().items;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].rating, 3);

    let empty = review_service::list_listing_reviews(
        &state,
        Uuid::new_v4(),
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await?;
    assert!(empty.data.unwrap().items.is_empty());

    // Only the author may edit
    let err = review_service::update_review(
        &state,
        &liam,
        review.id,
        UpdateReviewRequest {
            rating: Some(1),
            comment: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let edited = review_service::update_review(
        &state,
        &maya,
        review.id,
        UpdateReviewRequest {
            rating: Some(4),
            comment: Some("updated".into()),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(edited.rating, 4);
    assert_eq!(edited.comment.as_deref(), Some("updated"));

    let err = review_service::update_review(
        &state,
        &maya,
        review.id,
        UpdateReviewRequest {
            rating: Some(9),
            comment: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let mine = review_service::list_my_reviews(&state, &maya, my_review_query()).await?;
    let items = mine.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].brand, "Honda");
    assert_eq!(items[0].rating, 4);

    let strict = review_service::list_my_reviews(
        &state,
        &maya,
        MyReviewQuery {
            min_rating: Some(5),
            ..my_review_query()
        },
    )
    .await?;
    assert!(strict.data.unwrap().items.is_empty());

    let by_brand = review_service::list_my_reviews(
        &state,
        &maya,
        MyReviewQuery {
            brand: Some("hon".into()),
            ..my_review_query()
        },
    )
    .await?;
    assert_eq!(by_brand.data.unwrap().items.len(), 1);

    let all = admin_service::list_all_reviews(
        &state,
        &admin,
        AdminReviewQuery {
            q: Some("civic".into()),
            ..admin_review_query()
        },
    )
    .await?;
    assert_eq!(all.data.unwrap().items.len(), 2);

    let good = admin_service::list_all_reviews(
        &state,
        &admin,
        AdminReviewQuery {
            min_rating: Some(4),
            ..admin_review_query()
        },
    )
    .await?;
    assert_eq!(good.data.unwrap().items.len(), 1);

    let bad = admin_service::list_all_reviews(
        &state,
        &admin,
        AdminReviewQuery {
            max_rating: Some(3),
            ..admin_review_query()
        },
    )
    .await?;
    assert_eq!(bad.data.unwrap().items.len(), 1);

    Ok(())
}

#[tokio::test]
async fn agency_sales_and_customer_views() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let agency_a = create_agency(&state, "Prime Motors").await?;
    let user_a = create_user(&state, "agency", "prime@example.com", Some(agency_a)).await?;
    let agency_b = create_agency(&state, "Velocity Cars").await?;
    let user_b = create_user(&state, "agency", "velocity@example.com", Some(agency_b)).await?;
    let anna_id = create_user(&state, "buyer", "anna@example.com", None).await?;
    let zoe_id = create_user(&state, "buyer", "zoe@example.com", None).await?;
    let auth_a = agency_auth(user_a, agency_a);
    let auth_b = agency_auth(user_b, agency_b);
    let anna = buyer_auth(anna_id);
    let zoe = buyer_auth(zoe_id);

    let bmw_model = create_car_model(&state, "BMW", "3 Series").await?;
    let toyota_model = create_car_model(&state, "Toyota", "Corolla").await?;
    let bmw_listing = create_listing_row(
        &state,
        agency_a,
        bmw_model,
        "BMW",
        "3 Series",
        Decimal::new(20000, 2),
        10,
    )
    .await?;
    let toyota_listing = create_listing_row(
        &state,
        agency_a,
        toyota_model,
        "Toyota",
        "Corolla",
        Decimal::new(5000, 2),
        10,
    )
    .await?;

    purchase_service::create_purchase(
        &state,
        &anna,
        CreatePurchaseRequest {
            listing_id: bmw_listing,
            quantity: 1,
        },
    )
    .await?;
    purchase_service::create_purchase(
        &state,
        &anna,
        CreatePurchaseRequest {
            listing_id: toyota_listing,
            quantity: 1,
        },
    )
    .await?;
    let zoe_purchase = purchase_service::create_purchase(
        &state,
        &zoe,
        CreatePurchaseRequest {
            listing_id: bmw_listing,
            quantity: 2,
        },
    )
    .await?
    .data
    .unwrap();

    let sales = purchase_service::list_agency_sales(&state.pool, &auth_a, sale_query()).await?;
    let items = sales.data.unwrap().items;
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].buyer_email, "zoe@example.com");
    assert_eq!(items[0].quantity, 2);
    assert_eq!(items[0].total_amount, Decimal::new(40000, 2));

    let bmw_only = purchase_service::list_agency_sales(
        &state.pool,
        &auth_a,
        SaleListQuery {
            brand: Some("bmw".into()),
            ..sale_query()
        },
    )
    .await?;
    assert_eq!(bmw_only.data.unwrap().items.len(), 2);

    let anna_only = purchase_service::list_agency_sales(
        &state.pool,
        &auth_a,
        SaleListQuery {
            customer: Some("anna".into()),
            ..sale_query()
        },
    )
    .await?;
    assert_eq!(anna_only.data.unwrap().items.len(), 2);

    let future = purchase_service::list_agency_sales(
        &state.pool,
        &auth_a,
        SaleListQuery {
            date_from: Some(NaiveDate::from_ymd_opt(2099, 1, 1).unwrap()),
            ..sale_query()
        },
    )
    .await?;
    assert!(future.data.unwrap().items.is_empty());

    // Another agency sees none of these sales
    let other = purchase_service::list_agency_sales(&state.pool, &auth_b, sale_query()).await?;
    assert!(other.data.unwrap().items.is_empty());

    let customers =
        purchase_service::list_agency_customers(&state.pool, &auth_a, customer_query()).await?;
    let items = customers.data.unwrap().items;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].email, "zoe@example.com");
    assert_eq!(items[0].purchases_count, 1);
    assert_eq!(items[0].total_spent, 400.0);
    assert_eq!(items[1].email, "anna@example.com");
    assert_eq!(items[1].purchases_count, 2);
    assert_eq!(items[1].total_spent, 250.0);

    let repeat = purchase_service::list_agency_customers(
        &state.pool,
        &auth_a,
        CustomerListQuery {
            min_purchases: Some(2),
            ..customer_query()
        },
    )
    .await?;
    let items = repeat.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].email, "anna@example.com");

    let big_spenders = purchase_service::list_agency_customers(
        &state.pool,
        &auth_a,
        CustomerListQuery {
            min_spent: Some(300.0),
            ..customer_query()
        },
    )
    .await?;
    let items = big_spenders.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].email, "zoe@example.com");

    let by_email = purchase_service::list_agency_customers(
        &state.pool,
        &auth_a,
        CustomerListQuery {
            q: Some("ann".into()),
            ..customer_query()
        },
    )
    .await?;
    assert_eq!(by_email.data.unwrap().items.len(), 1);

    // Cancelled purchases drop out of both views
    purchase_service::cancel_purchase(&state, &zoe, zoe_purchase.id).await?;
    let sales = purchase_service::list_agency_sales(&state.pool, &auth_a, sale_query()).await?;
    assert_eq!(sales.data.unwrap().items.len(), 2);
    let customers =
        purchase_service::list_agency_customers(&state.pool, &auth_a, customer_query()).await?;
    let items = customers.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].email, "anna@example.com");

    let err = purchase_service::list_agency_sales(&state.pool, &anna, sale_query())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    Ok(())
}

#[tokio::test]
async fn admin_reports_rank_and_follow_cancellations() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let agency_id = create_agency(&state, "Prime Motors").await?;
    create_agency(&state, "Velocity Cars").await?;
    let buyer_id = create_user(&state, "buyer", "ben@example.com", None).await?;
    let other_id = create_user(&state, "buyer", "maya@example.com", None).await?;
    let admin_id = create_user(&state, "admin", "admin@example.com", None).await?;
    let buyer = buyer_auth(buyer_id);
    let other = buyer_auth(other_id);
    let admin = admin_auth(admin_id);

    let audi_model = create_car_model(&state, "Audi", "A4").await?;
    let bmw_model = create_car_model(&state, "BMW", "3 Series").await?;
    let toyota_model = create_car_model(&state, "Toyota", "Corolla").await?;
    let audi_listing = create_listing_row(
        &state,
        agency_id,
        audi_model,
        "Audi",
        "A4",
        Decimal::new(10000, 2),
        10,
    )
    .await?;
    let bmw_listing = create_listing_row(
        &state,
        agency_id,
        bmw_model,
        "BMW",
        "3 Series",
        Decimal::new(20000, 2),
        10,
    )
    .await?;
    let toyota_listing = create_listing_row(
        &state,
        agency_id,
        toyota_model,
        "Toyota",
        "Corolla",
        Decimal::new(5000, 2),
        10,
    )
    .await?;

    let audi_purchase = purchase_service::create_purchase(
        &state,
        &buyer,
        CreatePurchaseRequest {
            listing_id: audi_listing,
            quantity: 3,
        },
    )
    .await?
    .data
    .unwrap();
    purchase_service::create_purchase(
        &state,
        &buyer,
        CreatePurchaseRequest {
            listing_id: bmw_listing,
            quantity: 2,
        },
    )
    .await?;
    purchase_service::create_purchase(
        &state,
        &buyer,
        CreatePurchaseRequest {
            listing_id: bmw_listing,
            quantity: 1,
        },
    )
    .await?;
    purchase_service::create_purchase(
        &state,
        &buyer,
        CreatePurchaseRequest {
            listing_id: toyota_listing,
            quantity: 1,
        },
    )
    .await?;

    // Ties on units sold break by brand
    let top = report_service::top_sold_cars(&state, &admin, report_query(None, None, None))
        .await?
        .data
        .unwrap()
        .items;
    assert_eq!(top.len(), 3);
    assert_eq!((top[0].brand.as_str(), top[0].units_sold), ("Audi", 3));
    assert_eq!((top[1].brand.as_str(), top[1].units_sold), ("BMW", 3));
    assert_eq!(top[1].total_amount, 600.0);
    assert_eq!((top[2].brand.as_str(), top[2].units_sold), ("Toyota", 1));

    let top = report_service::top_sold_cars(&state, &admin, report_query(None, None, Some(2)))
        .await?
        .data
        .unwrap()
        .items;
    assert_eq!(top.len(), 2);

    let buyers = report_service::top_buyers(&state, &admin, report_query(None, None, None))
        .await?
        .data
        .unwrap()
        .items;
    assert_eq!(buyers.len(), 1);
    assert_eq!(buyers[0].email, "ben@example.com");
    assert_eq!(buyers[0].purchases_count, 4);
    assert_eq!(buyers[0].total_spent, 950.0);

    // Agencies without sales do not appear
    let agencies = report_service::top_agencies(&state, &admin, report_query(None, None, None))
        .await?
        .data
        .unwrap()
        .items;
    assert_eq!(agencies.len(), 1);
    assert_eq!(agencies[0].name, "Prime Motors");
    assert_eq!(agencies[0].sales_count, 4);
    assert_eq!(agencies[0].total_amount, 950.0);

    let err = report_service::top_sold_cars(&state, &buyer, report_query(None, None, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    let err = report_service::top_agencies(&state, &buyer, report_query(None, None, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // Cancelling removes the purchase from every sales report
    purchase_service::cancel_purchase(&state, &buyer, audi_purchase.id).await?;
    let top = report_service::top_sold_cars(&state, &admin, report_query(None, None, None))
        .await?
        .data
        .unwrap()
        .items;
    assert_eq!(top.len(), 2);
    assert_eq!((top[0].brand.as_str(), top[0].units_sold), ("BMW", 3));
    assert_eq!((top[1].brand.as_str(), top[1].units_sold), ("Toyota", 1));

    let agencies = report_service::top_agencies(&state, &admin, report_query(None, None, None))
        .await?
        .data
        .unwrap()
        .items;
    assert_eq!(agencies[0].sales_count, 3);
    assert_eq!(agencies[0].total_amount, 650.0);

    let buyers = report_service::top_buyers(&state, &admin, report_query(None, None, None))
        .await?
        .data
        .unwrap()
        .items;
    assert_eq!(buyers[0].purchases_count, 3);
    assert_eq!(buyers[0].total_spent, 650.0);

    // Favorites rank independently of purchase status
    favorite_service::add_favorite(&state.pool, &buyer, bmw_listing).await?;
    favorite_service::add_favorite(&state.pool, &buyer, toyota_listing).await?;
    favorite_service::add_favorite(&state.pool, &other, bmw_listing).await?;
    let favorites =
        report_service::top_favorited_cars(&state, &admin, report_query(None, None, None))
            .await?
            .data
            .unwrap()
            .items;
    assert_eq!(favorites.len(), 2);
    assert_eq!(
        (favorites[0].brand.as_str(), favorites[0].favorites_count),
        ("BMW", 2)
    );
    assert_eq!(
        (favorites[1].brand.as_str(), favorites[1].favorites_count),
        ("Toyota", 1)
    );

    Ok(())
}

#[tokio::test]
async fn report_windows_cover_whole_days() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let agency_id = create_agency(&state, "Prime Motors").await?;
    let buyer_id = create_user(&state, "buyer", "ben@example.com", None).await?;
    let admin_id = create_user(&state, "admin", "admin@example.com", None).await?;
    let admin = admin_auth(admin_id);

    let model_id = create_car_model(&state, "Volkswagen", "Golf").await?;
    let listing_id = create_listing_row(
        &state,
        agency_id,
        model_id,
        "Volkswagen",
        "Golf",
        Decimal::new(8000, 2),
        10,
    )
    .await?;

    for (day, hour, quantity) in [(10, 18, 1), (11, 9, 2)] {
        PurchaseActive {
            id: Set(Uuid::new_v4()),
            buyer_id: Set(buyer_id),
            listing_id: Set(listing_id),
            unit_price_amount: Set(Decimal::new(8000, 2)),
            unit_price_currency: Set("USD".into()),
            quantity: Set(quantity),
            status: Set("COMPLETED".into()),
            created_at: Set(Utc
                .with_ymd_and_hms(2024, 5, day, hour, 0, 0)
                .unwrap()
                .fixed_offset()),
        }
        .insert(&state.orm)
        .await?;
    }

    let may_10 = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
    let may_11 = NaiveDate::from_ymd_opt(2024, 5, 11).unwrap();
    let may_9 = NaiveDate::from_ymd_opt(2024, 5, 9).unwrap();

    // date_to is inclusive of its whole day
    let top = report_service::top_sold_cars(
        &state,
        &admin,
        report_query(Some(may_10), Some(may_10), None),
    )
    .await?
    .data
    .unwrap()
    .items;
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].units_sold, 1);
    assert_eq!(top[0].total_amount, 80.0);

    let top = report_service::top_sold_cars(
        &state,
        &admin,
        report_query(Some(may_10), Some(may_11), None),
    )
    .await?
    .data
    .unwrap()
    .items;
    assert_eq!(top[0].units_sold, 3);
    assert_eq!(top[0].total_amount, 240.0);

    let top = report_service::top_sold_cars(&state, &admin, report_query(Some(may_11), None, None))
        .await?
        .data
        .unwrap()
        .items;
    assert_eq!(top[0].units_sold, 2);

    let top = report_service::top_sold_cars(&state, &admin, report_query(None, Some(may_9), None))
        .await?
        .data
        .unwrap()
        .items;
    assert!(top.is_empty());

    let buyers = report_service::top_buyers(
        &state,
        &admin,
        report_query(Some(may_10), Some(may_10), None),
    )
    .await?
    .data
    .unwrap()
    .items;
    assert_eq!(buyers.len(), 1);
    assert_eq!(buyers[0].purchases_count, 1);
    assert_eq!(buyers[0].total_spent, 80.0);

    Ok(())
}

#[tokio::test]
async fn admin_provisions_agency_accounts() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let admin_id = create_user(&state, "admin", "admin@example.com", None).await?;
    let admin = admin_auth(admin_id);

    let resp = admin_service::create_agency_user(
        &state,
        &admin,
        CreateAgencyUserRequest {
            email: "dealer@example.com".into(),
            password: "secret123".into(),
            agency_name: "Velocity Cars".into(),
        },
    )
    .await?;
    assert_eq!(resp.message, "Agency user created");
    let created = resp.data.unwrap();
    assert_eq!(created.user.role, "agency");
    assert_eq!(created.user.agency_id, Some(created.agency.id));
    assert_eq!(created.agency.name, "Velocity Cars");

    // One account per agency
    let err = admin_service::create_agency_user(
        &state,
        &admin,
        CreateAgencyUserRequest {
            email: "dealer2@example.com".into(),
            password: "secret123".into(),
            agency_name: "Velocity Cars".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = admin_service::create_agency_user(
        &state,
        &admin,
        CreateAgencyUserRequest {
            email: "dealer@example.com".into(),
            password: "secret123".into(),
            agency_name: "Another Garage".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = admin_service::create_agency_user(
        &state,
        &admin,
        CreateAgencyUserRequest {
            email: "".into(),
            password: "secret123".into(),
            agency_name: "Empty Mail Motors".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = admin_service::create_agency_user(
        &state,
        &admin,
        CreateAgencyUserRequest {
            email: "someone@example.com".into(),
            password: "secret123".into(),
            agency_name: "   ".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = admin_service::create_agency_user(
        &state,
        &buyer_auth(Uuid::new_v4()),
        CreateAgencyUserRequest {
            email: "x@example.com".into(),
            password: "secret123".into(),
            agency_name: "X Motors".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // The provisioned account works as a real agency user
    create_car_model(&state, "Kia", "Sportage").await?;
    let stocked = inventory_service::create_or_consolidate_inventory(
        &state,
        &agency_auth(created.user.id, created.agency.id),
        CreateInventoryRequest {
            brand: "Kia".into(),
            model: "Sportage".into(),
            quantity: 1,
            is_used: None,
        },
    )
    .await?;
    assert_eq!(stocked.data.unwrap().quantity, 1);

    // Self-service registration always lands on the buyer role
    let registered = auth_service::register_user(
        &state.pool,
        RegisterRequest {
            email: "newbuyer@example.com".into(),
            password: "buyerpass".into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(registered.role, "buyer");

    let err = auth_service::register_user(
        &state.pool,
        RegisterRequest {
            email: "newbuyer@example.com".into(),
            password: "buyerpass".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = auth_service::login_user(
        &state.pool,
        LoginRequest {
            email: "newbuyer@example.com".into(),
            password: "wrong".into(),
        },
    )
    .await
    .unwrap_err();
    match err {
        AppError::BadRequest(msg) => assert_eq!(msg, "Invalid email or password"),
        other => panic!("expected BadRequest, got {other:?}"),
    }
    let err = auth_service::login_user(
        &state.pool,
        LoginRequest {
            email: "ghost@example.com".into(),
            password: "whatever".into(),
        },
    )
    .await
    .unwrap_err();
    match err {
        AppError::BadRequest(msg) => assert_eq!(msg, "Invalid email or password"),
        other => panic!("expected BadRequest, got {other:?}"),
    }

    let me = auth_service::me(&state.pool, &buyer_auth(registered.id)).await?;
    assert_eq!(me.data.unwrap().email, "newbuyer@example.com");

    let agencies = admin_service::list_all_users(
        &state,
        &admin,
        AdminUserQuery {
            role: Some("agency".into()),
            ..admin_user_query()
        },
    )
    .await?;
    let items = agencies.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].agency_name.as_deref(), Some("Velocity Cars"));

    let err = admin_service::list_all_users(
        &state,
        &admin,
        AdminUserQuery {
            role: Some("superuser".into()),
            ..admin_user_query()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let found = admin_service::list_all_users(
        &state,
        &admin,
        AdminUserQuery {
            q: Some("dealer".into()),
            ..admin_user_query()
        },
    )
    .await?;
    assert_eq!(found.data.unwrap().items.len(), 1);

    Ok(())
}

#[tokio::test]
async fn admin_oversight_lists_filter_and_validate() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let agency_id = create_agency(&state, "Prime Motors").await?;
    create_user(&state, "agency", "prime@example.com", Some(agency_id)).await?;
    let liam_id = create_user(&state, "buyer", "liam@example.com", None).await?;
    let admin_id = create_user(&state, "admin", "admin@example.com", None).await?;
    let liam = buyer_auth(liam_id);
    let admin = admin_auth(admin_id);

    let model_id = create_car_model(&state, "BMW", "3 Series").await?;
    let listing_id = create_listing_row(
        &state,
        agency_id,
        model_id,
        "BMW",
        "3 Series",
        Decimal::new(20000, 2),
        5,
    )
    .await?;

    purchase_service::create_purchase(
        &state,
        &liam,
        CreatePurchaseRequest {
            listing_id,
            quantity: 1,
        },
    )
    .await?;
    let second = purchase_service::create_purchase(
        &state,
        &liam,
        CreatePurchaseRequest {
            listing_id,
            quantity: 1,
        },
    )
    .await?
    .data
    .unwrap();
    purchase_service::cancel_purchase(&state, &liam, second.id).await?;
    favorite_service::add_favorite(&state.pool, &liam, listing_id).await?;

    let all = admin_service::list_all_purchases(&state, &admin, admin_purchase_query()).await?;
    let meta = all.meta.clone().expect("meta");
    assert_eq!(meta.total, Some(2));
    let items = all.data.unwrap().items;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].status, "CANCELLED");
    assert_eq!(items[0].agency_name, "Prime Motors");
    assert_eq!(items[0].total_amount, Decimal::new(20000, 2));

    let completed = admin_service::list_all_purchases(
        &state,
        &admin,
        AdminPurchaseQuery {
            status: Some("COMPLETED".into()),
            ..admin_purchase_query()
        },
    )
    .await?;
    assert_eq!(completed.data.unwrap().items.len(), 1);

    let err = admin_service::list_all_purchases(
        &state,
        &admin,
        AdminPurchaseQuery {
            status: Some("weird".into()),
            ..admin_purchase_query()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let by_email = admin_service::list_all_purchases(
        &state,
        &admin,
        AdminPurchaseQuery {
            q: Some("liam".into()),
            ..admin_purchase_query()
        },
    )
    .await?;
    assert_eq!(by_email.data.unwrap().items.len(), 2);

    let future = admin_service::list_all_purchases(
        &state,
        &admin,
        AdminPurchaseQuery {
            date_from: Some(NaiveDate::from_ymd_opt(2099, 1, 1).unwrap()),
            ..admin_purchase_query()
        },
    )
    .await?;
    assert!(future.data.unwrap().items.is_empty());

    let favorites = admin_service::list_all_favorites(
        &state,
        &admin,
        AdminFavoriteQuery {
            q: Some("bmw".into()),
            ..admin_favorite_query()
        },
    )
    .await?;
    let items = favorites.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].customer_email, "liam@example.com");

    let err = admin_service::list_all_favorites(&state, &liam, admin_favorite_query())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    Ok(())
}

#[tokio::test]
async fn car_model_search_matches_brand_and_model() -> anyhow::Result<()> {
    let _guard = DB_LOCK.lock().await;
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    create_car_model(&state, "Toyota", "Corolla").await?;
    create_car_model(&state, "Toyota", "RAV4").await?;
    create_car_model(&state, "Honda", "Civic").await?;

    let all = car_model_service::search_car_models(
        &state,
        CarModelQuery {
            q: None,
            limit: None,
        },
    )
    .await?;
    let items = all.data.unwrap().items;
    assert_eq!(items.len(), 3);
    assert_eq!((items[0].brand.as_str(), items[0].model.as_str()), ("Honda", "Civic"));
    assert_eq!((items[2].brand.as_str(), items[2].model.as_str()), ("Toyota", "RAV4"));

    let toyotas = car_model_service::search_car_models(
        &state,
        CarModelQuery {
            q: Some("toy".into()),
            limit: None,
        },
    )
    .await?;
    assert_eq!(toyotas.data.unwrap().items.len(), 2);

    let by_model = car_model_service::search_car_models(
        &state,
        CarModelQuery {
            q: Some("rav".into()),
            limit: None,
        },
    )
    .await?;
    let items = by_model.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].model, "RAV4");

    let blank = car_model_service::search_car_models(
        &state,
        CarModelQuery {
            q: Some("".into()),
            limit: None,
        },
    )
    .await?;
    assert_eq!(blank.data.unwrap().items.len(), 3);

    let capped = car_model_service::search_car_models(
        &state,
        CarModelQuery {
            q: None,
            limit: Some(1),
        },
    )
    .await?;
    assert_eq!(capped.data.unwrap().items.len(), 1);

    Ok(())
}

// Allow skipping when no DB is configured in the environment.
async fn test_state() -> anyhow::Result<Option<AppState>> {
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
                );
                return Ok(None);
            }
        };
    Ok(Some(setup_state(&database_url).await?))
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url, 5).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&pool).await?;

    // Clean tables between runs
    sqlx::query(
        "TRUNCATE TABLE reviews, favorites, purchases, listings, inventory_items, users, car_models, agencies RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await?;

    Ok(AppState::new(pool, orm))
}

async fn create_agency(state: &AppState, name: &str) -> anyhow::Result<Uuid> {
    let agency = AgencyActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(agency.id)
}

async fn create_user(
    state: &AppState,
    role: &str,
    email: &str,
    agency_id: Option<Uuid>,
) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.into()),
        is_active: Set(true),
        agency_id: Set(agency_id),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(user.id)
}

async fn create_car_model(state: &AppState, brand: &str, model: &str) -> anyhow::Result<Uuid> {
    let car_model = CarModelActive {
        id: Set(Uuid::new_v4()),
        brand: Set(brand.into()),
        model: Set(model.into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(car_model.id)
}

async fn create_listing_row(
    state: &AppState,
    agency_id: Uuid,
    car_model_id: Uuid,
    brand: &str,
    model: &str,
    price: Decimal,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let listing = ListingActive {
        id: Set(Uuid::new_v4()),
        agency_id: Set(agency_id),
        car_model_id: Set(car_model_id),
        brand: Set(brand.into()),
        model: Set(model.into()),
        current_price_amount: Set(price),
        current_price_currency: Set("USD".into()),
        stock: Set(stock),
        seller_notes: Set(None),
        is_active: Set(true),
        expires_on: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(listing.id)
}

async fn listing_stock(state: &AppState, listing_id: Uuid) -> anyhow::Result<i32> {
    let listing = Listings::find_by_id(listing_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("listing {listing_id} not found"))?;
    Ok(listing.stock)
}

fn buyer_auth(user_id: Uuid) -> AuthUser {
    AuthUser {
        user_id,
        role: "buyer".into(),
        agency_id: None,
    }
}

fn agency_auth(user_id: Uuid, agency_id: Uuid) -> AuthUser {
    AuthUser {
        user_id,
        role: "agency".into(),
        agency_id: Some(agency_id),
    }
}

fn admin_auth(user_id: Uuid) -> AuthUser {
    AuthUser {
        user_id,
        role: "admin".into(),
        agency_id: None,
    }
}

fn listing_query() -> ListingQuery {
    ListingQuery {
        page: None,
        per_page: None,
        q: None,
        brand: None,
        model: None,
        agency_id: None,
        min_price: None,
        max_price: None,
        sort: None,
    }
}

fn favorite_query() -> FavoriteListQuery {
    FavoriteListQuery {
        brand: None,
        model: None,
        agency_id: None,
        min_price: None,
        max_price: None,
    }
}

fn sale_query() -> SaleListQuery {
    SaleListQuery {
        brand: None,
        model: None,
        customer: None,
        date_from: None,
        date_to: None,
    }
}

fn customer_query() -> CustomerListQuery {
    CustomerListQuery {
        q: None,
        min_purchases: None,
        min_spent: None,
    }
}

fn my_review_query() -> MyReviewQuery {
    MyReviewQuery {
        brand: None,
        model: None,
        min_rating: None,
        date_from: None,
        date_to: None,
    }
}

fn report_query(
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    limit: Option<i64>,
) -> ReportQuery {
    ReportQuery {
        date_from,
        date_to,
        limit,
    }
}

fn admin_purchase_query() -> AdminPurchaseQuery {
    AdminPurchaseQuery {
        page: None,
        per_page: None,
        q: None,
        status: None,
        date_from: None,
        date_to: None,
    }
}

fn admin_review_query() -> AdminReviewQuery {
    AdminReviewQuery {
        page: None,
        per_page: None,
        q: None,
        min_rating: None,
        max_rating: None,
        date_from: None,
        date_to: None,
    }
}

fn admin_favorite_query() -> AdminFavoriteQuery {
    AdminFavoriteQuery {
        page: None,
        per_page: None,
        q: None,
    }
}

fn admin_user_query() -> AdminUserQuery {
    AdminUserQuery {
        page: None,
        per_page: None,
        q: None,
        role: None,
    }
}
