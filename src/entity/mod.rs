pub mod agencies;
pub mod car_models;
pub mod favorites;
pub mod inventory_items;
pub mod listings;
pub mod purchases;
pub mod reviews;
pub mod users;

pub use agencies::Entity as Agencies;
pub use car_models::Entity as CarModels;
pub use favorites::Entity as Favorites;
pub use inventory_items::Entity as InventoryItems;
pub use listings::Entity as Listings;
pub use purchases::Entity as Purchases;
pub use reviews::Entity as Reviews;
pub use users::Entity as Users;
