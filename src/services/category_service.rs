use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use uuid::Uuid;

use crate::{
    audit,
    dto::products::{
        CategoryList, CreateCategoryRequest, ProductList, ReorderCategoriesRequest,
        UpdateCategoryRequest,
    },
    entity::{
        categories::{ActiveModel, Column, Entity as Categories},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Category,
    response::{ApiResponse, Meta},
    services::product_service::price_products,
    state::AppState,
};

pub async fn list_categories(
    state: &AppState,
    auth: &AuthUser,
) -> AppResult<ApiResponse<CategoryList>> {
    let mut finder = Categories::find();
    if !auth.is_admin() {
        finder = finder.filter(Column::IsActive.eq(true));
    }
    let items: Vec<Category> = finder
        .order_by_asc(Column::DisplayOrder)
        .order_by_asc(Column::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();
    let total = items.len() as i64;

    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::unpaged(total)),
    ))
}

pub async fn create_category(
    state: &AppState,
    auth: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(auth)?;
    let category = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        icon: Set(payload.icon),
        display_order: Set(payload.display_order),
        is_active: Set(payload.is_active),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        state,
        auth.user_id,
        "category_create",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::success("Category created", category.into(), Some(Meta::empty())))
}

pub async fn update_category(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    payload: UpdateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(auth)?;
    let existing = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(icon) = payload.icon {
        active.icon = Set(icon);
    }
    if let Some(display_order) = payload.display_order {
        active.display_order = Set(display_order);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    let category = active.update(&state.orm).await?;

    Ok(ApiResponse::success("Category updated", category.into(), Some(Meta::empty())))
}

pub async fn delete_category(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(auth)?;
    let existing = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    // products fall back to no category via ON DELETE SET NULL
    Categories::delete_by_id(id).exec(&state.orm).await?;

    audit::record(
        state,
        auth.user_id,
        "category_delete",
        "categories",
        serde_json::json!({ "category_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Category deleted", existing.into(), Some(Meta::empty())))
}

/// Renumber categories so `display_order` matches the position in `ids`. Unknown ids are skipped.
pub async fn reorder_categories(
    state: &AppState,
    auth: &AuthUser,
    payload: ReorderCategoriesRequest,
) -> AppResult<ApiResponse<CategoryList>> {
    ensure_admin(auth)?;
    let txn = state.orm.begin().await?;
    for (position, id) in payload.ids.iter().enumerate() {
        Categories::update_many()
            .col_expr(Column::DisplayOrder, Expr::value(position as i32))
            .filter(Column::Id.eq(*id))
            .exec(&txn)
            .await?;
    }
    txn.commit().await?;
    tracing::debug!(count = payload.ids.len(), "categories reordered");

    list_categories(state, auth).await
}

/// Active products of an active category, priced for the caller.
pub async fn category_products(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<ProductList>> {
    let category = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .filter(|c| c.is_active)
        .ok_or(AppError::NotFound)?;

    let products = Products::find()
        .filter(ProdCol::CategoryId.eq(category.id))
        .filter(ProdCol::IsActive.eq(true))
        .order_by_asc(ProdCol::Name)
        .all(&state.orm)
        .await?;
    let items = price_products(&state.orm, auth, products).await?;
    let total = items.len() as i64;

    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::unpaged(total)),
    ))
}
