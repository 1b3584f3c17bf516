use sea_orm::entity::prelude::*;

use crate::domain::schema::FieldSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    /// Price paid upstream; the admin's default unit price.
    pub cost_price: i64,
    /// Default unit price for everyone without a price policy.
    pub base_price: i64,
    #[sea_orm(column_type = "JsonBinary")]
    pub schema: FieldSchema,
    pub min_work_days: i32,
    pub max_work_days: i32,
    pub reduction_rate: i32,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_delete = "SetNull"
    )]
    Categories,
    #[sea_orm(has_many = "super::price_policies::Entity")]
    PricePolicies,
    #[sea_orm(has_many = "super::orders::Entity")]
    Orders,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl Related<super::price_policies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PricePolicies.def()
    }
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
