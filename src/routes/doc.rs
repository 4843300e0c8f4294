use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{
            AdminFavoriteItem, AdminFavoriteList, AdminPurchaseItem, AdminPurchaseList,
            AdminReviewItem, AdminReviewList, AdminUserItem, AdminUserList, AgencyUserCreated,
            CreateAgencyUserRequest,
        },
        auth::{LoginRequest, LoginResponse, RegisterRequest, UserDto},
        car_models::CarModelList,
        favorites::{
            FavoriteListingItem, FavoriteListingList, FavoriteStatus, RemoveFavoriteResponse,
        },
        inventory::{
            CreateInventoryRequest, InventoryItemWithModel, InventoryList, UpdateInventoryRequest,
        },
        listings::{
            CreateListingRequest, ListingCard, ListingCardList, ListingList, UpdateListingRequest,
        },
        purchases::{
            CreatePurchaseRequest, CustomerList, CustomerSummary, PurchaseList, SaleItem, SaleList,
        },
        reports::{
            TopAgency, TopAgencyList, TopBuyer, TopBuyerList, TopFavoriteCar, TopFavoriteCarList,
            TopSoldCar, TopSoldCarList,
        },
        reviews::{
            CreateReviewRequest, ListingReviewItem, ListingReviewList, MyReviewItem, MyReviewList,
            UpdateReviewRequest,
        },
    },
    models::{Agency, CarModel, Favorite, InventoryItem, Listing, Purchase, Review},
    response::{ApiResponse, Meta},
    routes::{admin, agencies, auth, car_models, favorites, health, listings, params, purchases, reviews},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        listings::browse_listings,
        listings::get_listing,
        listings::create_listing,
        listings::update_listing,
        listings::cancel_listing,
        listings::activate_listing,
        listings::delete_listing,
        favorites::add_favorite,
        favorites::remove_favorite,
        favorites::toggle_favorite,
        favorites::list_favorites,
        purchases::create_purchase,
        purchases::list_my_purchases,
        purchases::cancel_purchase,
        purchases::reactivate_purchase,
        reviews::create_review,
        reviews::list_listing_reviews,
        reviews::update_review,
        reviews::list_my_reviews,
        car_models::search_car_models,
        agencies::create_agency_user,
        agencies::list_my_listings,
        agencies::get_my_listing,
        agencies::list_my_sales,
        agencies::list_my_customers,
        agencies::list_inventory,
        agencies::create_inventory,
        agencies::update_inventory,
        agencies::delete_inventory,
        admin::top_sold_cars,
        admin::top_buyers,
        admin::top_agencies,
        admin::top_favorited_cars,
        admin::list_all_purchases,
        admin::list_all_reviews,
        admin::list_all_favorites,
        admin::list_all_users
    ),
    components(
        schemas(
            Agency,
            CarModel,
            Listing,
            Favorite,
            Purchase,
            InventoryItem,
            Review,
            UserDto,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateListingRequest,
            UpdateListingRequest,
            ListingCard,
            ListingCardList,
            ListingList,
            FavoriteListingItem,
            FavoriteListingList,
            FavoriteStatus,
            RemoveFavoriteResponse,
            CreatePurchaseRequest,
            PurchaseList,
            SaleItem,
            SaleList,
            CustomerSummary,
            CustomerList,
            CreateReviewRequest,
            UpdateReviewRequest,
            ListingReviewItem,
            ListingReviewList,
            MyReviewItem,
            MyReviewList,
            CreateInventoryRequest,
            UpdateInventoryRequest,
            InventoryItemWithModel,
            InventoryList,
            CarModelList,
            TopSoldCar,
            TopSoldCarList,
            TopBuyer,
            TopBuyerList,
            TopAgency,
            TopAgencyList,
            TopFavoriteCar,
            TopFavoriteCarList,
            CreateAgencyUserRequest,
            AgencyUserCreated,
            AdminPurchaseItem,
            AdminPurchaseList,
            AdminReviewItem,
            AdminReviewList,
            AdminFavoriteItem,
            AdminFavoriteList,
            AdminUserItem,
            AdminUserList,
            params::Pagination,
            Meta,
            ApiResponse<Listing>,
            ApiResponse<ListingCardList>,
            ApiResponse<PurchaseList>,
            ApiResponse<CarModelList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Listings", description = "Listing catalog endpoints"),
        (name = "Favorites", description = "Favorite endpoints"),
        (name = "Purchases", description = "Purchase endpoints"),
        (name = "Reviews", description = "Review endpoints"),
        (name = "CarModels", description = "Car model catalog endpoints"),
        (name = "Agencies", description = "Agency workspace endpoints"),
        (name = "Admin", description = "Admin reports and oversight endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
