use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::schema::OrderRow,
    entity::sea_orm_active_enums::{ItemStatus, OrderStatus},
    models::{Order, OrderItem},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub product_id: Uuid,
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<OrderRow>,
    #[serde(default)]
    pub memo: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderReceipt {
    pub order_id: Uuid,
    pub order_number: String,
    pub item_count: i32,
    pub total_quantity: i64,
    pub unit_price: i64,
    pub supply_amount: i64,
    pub vat_amount: i64,
    pub total_amount: i64,
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct BulkStatusRequest {
    #[validate(length(min = 1, max = 500))]
    pub ids: Vec<Uuid>,
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkStatusResult {
    pub updated: u64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDeadlineRequest {
    /// `null` clears the deadline.
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    pub status: ItemStatus,
    pub result_message: Option<String>,
}
