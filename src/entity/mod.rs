pub mod audit_logs;
pub mod balance_transactions;
pub mod categories;
pub mod notices;
pub mod notifications;
pub mod order_items;
pub mod orders;
pub mod price_policies;
pub mod products;
pub mod sea_orm_active_enums;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use balance_transactions::Entity as BalanceTransactions;
pub use categories::Entity as Categories;
pub use notices::Entity as Notices;
pub use notifications::Entity as Notifications;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use price_policies::Entity as PricePolicies;
pub use products::Entity as Products;
pub use users::Entity as Users;
