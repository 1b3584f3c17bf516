pub mod auth_service;
pub mod category_service;
pub mod notice_service;
pub mod notification_service;
pub mod order_service;
pub mod price_policy_service;
pub mod product_service;
pub mod settlement_service;
pub mod user_service;
