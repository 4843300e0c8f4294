use serde::Serialize;
use utoipa::ToSchema;

use crate::models::CarModel;

#[derive(Debug, Serialize, ToSchema)]
pub struct CarModelList {
    pub items: Vec<CarModel>,
}
