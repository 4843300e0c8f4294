use sea_orm::entity::prelude::*;

/// Brand and model are snapshotted from the car model at creation time, so a
/// listing keeps its wording even if the catalog row changes later.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "listings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub agency_id: Uuid,
    pub car_model_id: Uuid,
    pub brand: String,
    pub model: String,
    pub current_price_amount: Decimal,
    pub current_price_currency: String,
    pub stock: i32,
    pub seller_notes: Option<String>,
    pub is_active: bool,
    pub expires_on: Option<Date>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::agencies::Entity",
        from = "Column::AgencyId",
        to = "super::agencies::Column::Id"
    )]
    Agencies,
    #[sea_orm(
        belongs_to = "super::car_models::Entity",
        from = "Column::CarModelId",
        to = "super::car_models::Column::Id"
    )]
    CarModels,
    #[sea_orm(has_many = "super::favorites::Entity")]
    Favorites,
    #[sea_orm(has_many = "super::purchases::Entity")]
    Purchases,
}

impl Related<super::agencies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Agencies.def()
    }
}

impl Related<super::car_models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CarModels.def()
    }
}

impl Related<super::favorites::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Favorites.def()
    }
}

impl Related<super::purchases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
