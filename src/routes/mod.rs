use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod categories;
pub mod doc;
pub mod health;
pub mod notices;
pub mod notifications;
pub mod orders;
pub mod params;
pub mod price_policies;
pub mod products;
pub mod settlements;
pub mod users;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/categories", categories::router())
        .nest("/products", products::router())
        .nest("/price-policies", price_policies::router())
        .nest("/orders", orders::router())
        .nest("/settlements", settlements::router())
        .nest("/notices", notices::router())
        .nest("/notifications", notifications::router())
}
