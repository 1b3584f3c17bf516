use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::hierarchy::UserNode,
    entity::sea_orm_active_enums::{Role, TxType},
    models::BalanceTransaction,
};

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
    /// Only honoured for admins; managers always create agencies and agencies sellers.
    pub role: Option<Role>,
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub company_name: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub contact_name: String,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub phone: String,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1))]
    pub password: Option<String>,
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "super::nullable")]
    #[schema(value_type = Option<Uuid>)]
    pub parent_id: Option<Option<Uuid>>,
    #[validate(length(max = 100))]
    pub company_name: Option<String>,
    #[validate(length(max = 50))]
    pub contact_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserTree {
    pub items: Vec<UserNode>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct BalanceAdjustRequest {
    pub tx_type: TxType,
    #[validate(range(min = 1))]
    pub amount: i64,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub description: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceTransactionList {
    pub items: Vec<BalanceTransaction>,
}
