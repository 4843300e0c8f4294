pub mod admin_service;
pub mod auth_service;
pub mod car_model_service;
pub mod favorite_service;
pub mod inventory_service;
pub mod listing_service;
pub mod purchase_service;
pub mod report_service;
pub mod review_service;
