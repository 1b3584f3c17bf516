#![allow(dead_code)]

use std::sync::Arc;

use reseller_order_desk::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{sea_orm_active_enums::Role, users::ActiveModel as UserActive},
    middleware::auth::AuthUser,
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use uuid::Uuid;

pub const SETTLEMENT_PASSWORD: &str = "open-sesame";

/// Database-backed state, or `None` when no database is configured.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests.");
            return Ok(None);
        }
    };

    let orm = create_orm_conn(&database_url, 5).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE notifications, balance_transactions, order_items, orders, price_policies, \
         products, categories, notices, audit_logs, users CASCADE",
    ))
    .await?;

    let config = AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        jwt_ttl_hours: 1,
        db_max_connections: 5,
        order_max_items: 100,
        settlement_password: Some(SETTLEMENT_PASSWORD.into()),
        business_utc_offset_hours: 9,
    };
    Ok(Some(AppState {
        orm,
        config: Arc::new(config),
    }))
}

pub async fn create_user(
    state: &AppState,
    username: &str,
    role: Role,
    parent_id: Option<Uuid>,
) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role),
        parent_id: Set(parent_id),
        balance: Set(0),
        company_name: Set(username.to_uppercase()),
        contact_name: Set(String::new()),
        phone: Set(String::new()),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role: user.role,
    })
}
