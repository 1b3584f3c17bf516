use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::{pricing::days_left, schema::FieldSchema},
    entity::{
        balance_transactions, categories, notices, notifications, order_items, orders,
        price_policies, products,
        sea_orm_active_enums::{ItemStatus, OrderStatus, Role, TxType},
        users,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub parent_id: Option<Uuid>,
    pub balance: i64,
    pub company_name: String,
    pub contact_name: String,
    pub phone: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            role: model.role,
            parent_id: model.parent_id,
            balance: model.balance,
            company_name: model.company_name,
            contact_name: model.contact_name,
            phone: model.phone,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub icon: String,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<categories::Model> for Category {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            icon: model.icon,
            display_order: model.display_order,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    /// Only present for admins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_price: Option<i64>,
    pub base_price: i64,
    pub schema: FieldSchema,
    pub min_work_days: i32,
    pub max_work_days: i32,
    pub reduction_rate: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn without_cost(mut self) -> Self {
        self.cost_price = None;
        self
    }
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Self {
            id: model.id,
            category_id: model.category_id,
            name: model.name,
            description: model.description,
            cost_price: Some(model.cost_price),
            base_price: model.base_price,
            schema: model.schema,
            min_work_days: model.min_work_days,
            max_work_days: model.max_work_days,
            reduction_rate: model.reduction_rate,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PricePolicy {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub price: Option<i64>,
    pub reduction_rate: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<price_policies::Model> for PricePolicy {
    fn from(model: price_policies::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            user_id: model.user_id,
            price: model.price,
            reduction_rate: model.reduction_rate,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub status: OrderStatus,
    pub status_label: String,
    pub unit_price: i64,
    pub total_amount: i64,
    pub item_count: i32,
    pub total_quantity: i64,
    pub reduction_rate: i32,
    pub deadline: Option<NaiveDate>,
    /// Days until the deadline as of the business date; negative once overdue.
    pub days_left: Option<i64>,
    pub memo: String,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn from_model(model: orders::Model, today: NaiveDate) -> Self {
        Self {
            id: model.id,
            order_number: model.order_number,
            user_id: model.user_id,
            product_id: model.product_id,
            status: model.status,
            status_label: model.status.label().to_string(),
            unit_price: model.unit_price,
            total_amount: model.total_amount,
            item_count: model.item_count,
            total_quantity: model.total_quantity,
            reduction_rate: model.reduction_rate,
            deadline: model.deadline,
            days_left: model.deadline.map(|d| days_left(d, today)),
            memo: model.memo,
            confirmed_at: model.confirmed_at.map(|dt| dt.with_timezone(&Utc)),
            confirmed_by: model.confirmed_by,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub row_number: i32,
    #[schema(value_type = Object)]
    pub data: Value,
    pub unit_price: i64,
    pub status: ItemStatus,
    pub result_message: String,
    pub created_at: DateTime<Utc>,
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            row_number: model.row_number,
            data: model.data,
            unit_price: model.unit_price,
            status: model.status,
            result_message: model.result_message,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tx_type: TxType,
    pub amount: i64,
    pub balance_after: i64,
    pub order_id: Option<Uuid>,
    pub description: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<balance_transactions::Model> for BalanceTransaction {
    fn from(model: balance_transactions::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            tx_type: model.tx_type,
            amount: model.amount,
            balance_after: model.balance_after,
            order_id: model.order_id,
            description: model.description,
            created_by: model.created_by,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notice {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub is_pinned: bool,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<notices::Model> for Notice {
    fn from(model: notices::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            content: model.content,
            is_pinned: model.is_pinned,
            is_active: model.is_active,
            created_by: model.created_by,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub link: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<notifications::Model> for Notification {
    fn from(model: notifications::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            message: model.message,
            link: model.link,
            is_read: model.is_read,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
