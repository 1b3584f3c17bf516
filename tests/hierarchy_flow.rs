mod common;

use reseller_order_desk::{
    dto::users::{BalanceAdjustRequest, CreateUserRequest, UpdateUserRequest},
    entity::sea_orm_active_enums::{Role, TxType},
    error::AppError,
    routes::params::Pagination,
    services::user_service,
};

// Integration flow: tree building, scope resolution and admin-only balance posting.
#[tokio::test]
async fn hierarchy_scope_and_balance_flow() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let admin = common::create_user(&state, "admin", Role::Admin, None).await?;
    let manager = common::create_user(&state, "manager", Role::Manager, Some(admin.user_id)).await?;
    let agency_a = common::create_user(&state, "agency-a", Role::Agency, Some(manager.user_id)).await?;
    let agency_b = common::create_user(&state, "agency-b", Role::Agency, Some(manager.user_id)).await?;
    let seller_b = common::create_user(&state, "seller-b", Role::Seller, Some(agency_b.user_id)).await?;

    // An agency always creates sellers under itself, whatever the body says.
    let seller_a = user_service::create_user(
        &state,
        &agency_a,
        CreateUserRequest {
            username: "seller-a".into(),
            password: "pw".into(),
            role: Some(Role::Admin),
            parent_id: Some(admin.user_id),
            company_name: "Shop A".into(),
            contact_name: String::new(),
            phone: String::new(),
        },
    )
    .await?
    .data
    .expect("user");
    assert_eq!(seller_a.role, Role::Seller);
    assert_eq!(seller_a.parent_id, Some(agency_a.user_id));

    let duplicate = user_service::create_user(
        &state,
        &admin,
        CreateUserRequest {
            username: "seller-a".into(),
            password: "pw".into(),
            role: Some(Role::Seller),
            parent_id: None,
            company_name: String::new(),
            contact_name: String::new(),
            phone: String::new(),
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

    let mut below_manager = user_service::descendant_ids(&state.orm, manager.user_id).await?;
    below_manager.sort();
    let mut expected = vec![agency_a.user_id, agency_b.user_id, seller_b.user_id, seller_a.id];
    expected.sort();
    assert_eq!(below_manager, expected);

    let scope = user_service::order_scope(&state.orm, &agency_a).await?;
    assert!(scope.covers(agency_a.user_id));
    assert!(scope.covers(seller_a.id));
    assert!(!scope.covers(seller_b.user_id));

    // The manager's tree is rooted at its agencies.
    let tree = user_service::list_users(&state, &manager).await?.data.expect("tree");
    assert_eq!(tree.items.len(), 2);
    assert_eq!(tree.items[0].user.id, agency_a.user_id);
    assert_eq!(tree.items[0].children[0].user.id, seller_a.id);

    // Users outside the caller's reach read as missing.
    let foreign = user_service::get_user(&state, &agency_a, seller_b.user_id).await;
    assert!(matches!(foreign, Err(AppError::NotFound)));
    let seller_view = user_service::list_users(&state, &seller_b).await;
    assert!(matches!(seller_view, Err(AppError::Forbidden)));

    // No cycles, and no junior parents.
    let cycle = user_service::update_user(
        &state,
        &admin,
        agency_a.user_id,
        UpdateUserRequest {
            parent_id: Some(Some(seller_a.id)),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(cycle, Err(AppError::BadRequest(_))));

    let moved = user_service::update_user(
        &state,
        &admin,
        seller_b.user_id,
        UpdateUserRequest {
            parent_id: Some(Some(agency_a.user_id)),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("user");
    assert_eq!(moved.parent_id, Some(agency_a.user_id));

    // Balance: admin only, never negative.
    let adjust = |tx_type, amount| BalanceAdjustRequest {
        tx_type,
        amount,
        description: "test".into(),
    };
    let denied =
        user_service::adjust_balance(&state, &manager, seller_a.id, adjust(TxType::Deposit, 100)).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));
    let overdraw =
        user_service::adjust_balance(&state, &admin, seller_a.id, adjust(TxType::Withdraw, 1)).await;
    assert!(matches!(overdraw, Err(AppError::BadRequest(_))));

    user_service::adjust_balance(&state, &admin, seller_a.id, adjust(TxType::Deposit, 1000)).await?;
    let entry = user_service::adjust_balance(&state, &admin, seller_a.id, adjust(TxType::Withdraw, 300))
        .await?
        .data
        .expect("entry");
    assert_eq!(entry.balance_after, 700);

    let ledger = user_service::list_balance_transactions(&state, &agency_a, seller_a.id, Pagination::new(1, 10))
        .await?
        .data
        .expect("ledger");
    assert_eq!(ledger.items.len(), 2);

    // Nobody deletes themselves.
    let own = user_service::delete_user(&state, &admin, admin.user_id).await;
    assert!(matches!(own, Err(AppError::BadRequest(_))));

    Ok(())
}
