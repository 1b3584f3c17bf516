use reseller_order_desk::{
    config::AppConfig,
    db::{DbPool, run_migrations},
    services::auth_service::hash_password,
    state::AppState,
};
use serde_json::json;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let state = AppState::connect(config).await?;
    // Ensure migrations are applied.
    run_migrations(&state.orm).await?;
    let pool = state.pool();

    let admin_id = ensure_user(pool, "admin", "admin123", "admin", None, "Head Office").await?;
    let agency_id =
        ensure_user(pool, "agency", "agency123", "agency", Some(admin_id), "Blue Agency").await?;
    let seller_id =
        ensure_user(pool, "seller", "seller123", "seller", Some(agency_id), "Corner Shop").await?;

    let category_id = ensure_category(pool, "Blog Reviews", "pen", 1).await?;
    let product_id = ensure_product(
        pool,
        category_id,
        "Blog Review Post",
        700,
        1000,
        json!([
            {"name": "url", "label": "Blog URL", "type": "url", "required": true},
            {"name": "keyword", "label": "Keyword", "type": "text", "required": true},
            {"name": "qty", "label": "Quantity", "type": "number", "required": true, "is_quantity": true},
            {"name": "start", "label": "Start date", "type": "date"},
        ]),
        20,
    )
    .await?;
    ensure_product(
        pool,
        category_id,
        "Place Listing Save",
        300,
        500,
        json!([
            {"name": "place_url", "label": "Place URL", "type": "url", "required": true},
            {"name": "memo", "label": "Memo", "type": "text"},
        ]),
        0,
    )
    .await?;

    ensure_policy(pool, product_id, agency_id, Some(900), Some(25)).await?;
    ensure_policy(pool, product_id, seller_id, Some(950), None).await?;

    println!("Seed completed. Admin ID: {admin_id}, Agency ID: {agency_id}, Seller ID: {seller_id}");
    Ok(())
}

async fn ensure_user(
    pool: &DbPool,
    username: &str,
    password: &str,
    role: &str,
    parent_id: Option<Uuid>,
    company_name: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, password_hash, role, parent_id, company_name)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (username) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(password_hash)
    .bind(role)
    .bind(parent_id)
    .bind(company_name)
    .fetch_optional(pool)
    .await?;

    // If user already exists, fetch id
    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE username = $1")
                .bind(username)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {username} (role={role})");
    Ok(user_id)
}

async fn ensure_category(pool: &DbPool, name: &str, icon: &str, order: i32) -> anyhow::Result<Uuid> {
    if let Some((id,)) = sqlx::query_as::<_, (Uuid,)>("SELECT id FROM categories WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?
    {
        return Ok(id);
    }

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO categories (id, name, icon, display_order) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(name)
        .bind(icon)
        .bind(order)
        .execute(pool)
        .await?;
    println!("Seeded category {name}");
    Ok(id)
}

async fn ensure_product(
    pool: &DbPool,
    category_id: Uuid,
    name: &str,
    cost_price: i64,
    base_price: i64,
    schema: serde_json::Value,
    reduction_rate: i32,
) -> anyhow::Result<Uuid> {
    if let Some((id,)) = sqlx::query_as::<_, (Uuid,)>("SELECT id FROM products WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?
    {
        return Ok(id);
    }

    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO products
            (id, category_id, name, cost_price, base_price, schema, min_work_days, max_work_days, reduction_rate)
        VALUES ($1, $2, $3, $4, $5, $6, 1, 3, $7)
        "#,
    )
    .bind(id)
    .bind(category_id)
    .bind(name)
    .bind(cost_price)
    .bind(base_price)
    .bind(schema)
    .bind(reduction_rate)
    .execute(pool)
    .await?;
    println!("Seeded product {name}");
    Ok(id)
}

async fn ensure_policy(
    pool: &DbPool,
    product_id: Uuid,
    user_id: Uuid,
    price: Option<i64>,
    reduction_rate: Option<i32>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO price_policies (id, product_id, user_id, price, reduction_rate)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (product_id, user_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(product_id)
    .bind(user_id)
    .bind(price)
    .bind(reduction_rate)
    .execute(pool)
    .await?;
    Ok(())
}
