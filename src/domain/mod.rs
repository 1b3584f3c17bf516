pub mod hierarchy;
pub mod pricing;
pub mod schema;
