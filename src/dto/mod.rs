pub mod admin;
pub mod auth;
pub mod car_models;
pub mod favorites;
pub mod inventory;
pub mod listings;
pub mod purchases;
pub mod reports;
pub mod reviews;
