use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::schema::FieldSchema,
    models::{Category, Product},
};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub icon: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 50))]
    pub icon: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderCategoriesRequest {
    /// Category ids in their new display order.
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryList {
    pub items: Vec<Category>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateProductRequest {
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0, max = 1_000_000_000))]
    pub cost_price: i64,
    #[validate(range(min = 0, max = 1_000_000_000))]
    pub base_price: i64,
    #[serde(default)]
    pub schema: FieldSchema,
    #[validate(range(min = 1))]
    pub min_work_days: i32,
    #[validate(range(min = 1))]
    pub max_work_days: i32,
    #[serde(default)]
    #[validate(range(min = 0, max = 100))]
    pub reduction_rate: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateProductRequest {
    #[serde(default, deserialize_with = "super::nullable")]
    #[schema(value_type = Option<Uuid>)]
    pub category_id: Option<Option<Uuid>>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, max = 1_000_000_000))]
    pub cost_price: Option<i64>,
    #[validate(range(min = 0, max = 1_000_000_000))]
    pub base_price: Option<i64>,
    pub schema: Option<FieldSchema>,
    #[validate(range(min = 1))]
    pub min_work_days: Option<i32>,
    #[validate(range(min = 1))]
    pub max_work_days: Option<i32>,
    #[validate(range(min = 0, max = 100))]
    pub reduction_rate: Option<i32>,
    pub is_active: Option<bool>,
}

/// A product as seen by one user, with the unit price that user pays.
#[derive(Debug, Serialize, ToSchema)]
pub struct PricedProduct {
    #[serde(flatten)]
    pub product: Product,
    pub price: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<PricedProduct>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductSchemaResponse {
    pub product_id: Uuid,
    pub name: String,
    pub description: String,
    pub schema: FieldSchema,
    pub price: i64,
    pub min_work_days: i32,
    pub max_work_days: i32,
}
