use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{PricePolicy, User};

/// Body shared by create, update and upsert. A `None` price or rate means "use the product default".
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PricePolicyRequest {
    pub product_id: Uuid,
    pub user_id: Uuid,
    #[validate(range(min = 0, max = 1_000_000_000))]
    pub price: Option<i64>,
    #[validate(range(min = 0, max = 100))]
    pub reduction_rate: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdatePricePolicyRequest {
    #[validate(range(min = 0, max = 1_000_000_000))]
    pub price: Option<i64>,
    #[validate(range(min = 0, max = 100))]
    pub reduction_rate: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PricePolicyList {
    pub items: Vec<PricePolicy>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SavePriceResult {
    /// Set when both values were empty and the override was removed.
    pub deleted: bool,
    pub policy: Option<PricePolicy>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MatrixProduct {
    pub id: Uuid,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub base_price: i64,
    pub reduction_rate: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MatrixCell {
    pub product_id: Uuid,
    pub price: Option<i64>,
    pub reduction_rate: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MatrixRow {
    pub user: User,
    pub configured_count: usize,
    pub cells: Vec<MatrixCell>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PriceMatrix {
    pub products: Vec<MatrixProduct>,
    pub rows: Vec<MatrixRow>,
}
