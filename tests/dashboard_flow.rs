mod common;

use reseller_order_desk::{
    dto::{
        dashboard::{CreateNoticeRequest, UpdateNoticeRequest},
        products::{CreateCategoryRequest, ReorderCategoriesRequest, UpdateCategoryRequest},
    },
    entity::{notifications::ActiveModel as NotificationActive, sea_orm_active_enums::Role},
    error::AppError,
    routes::params::Pagination,
    services::{category_service, notice_service, notification_service},
};
use sea_orm::ActiveModelTrait;
use sea_orm::ActiveValue::{NotSet, Set};
use uuid::Uuid;

// Integration flow: catalogue ordering, the notice board and per-user notifications.
#[tokio::test]
async fn categories_notices_and_notifications_flow() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let admin = common::create_user(&state, "admin", Role::Admin, None).await?;
    let agency = common::create_user(&state, "agency", Role::Agency, Some(admin.user_id)).await?;
    let seller = common::create_user(&state, "seller", Role::Seller, Some(agency.user_id)).await?;

    // Reordering renumbers categories to match the submitted sequence.
    let mut ids = Vec::new();
    for name in ["Blog", "Place", "Cafe"] {
        let category = category_service::create_category(
            &state,
            &admin,
            CreateCategoryRequest {
                name: name.into(),
                icon: String::new(),
                display_order: 0,
                is_active: true,
            },
        )
        .await?
        .data
        .expect("category");
        ids.push(category.id);
    }
    let reorder = ReorderCategoriesRequest {
        ids: vec![ids[2], ids[0], ids[1]],
    };
    let denied = category_service::reorder_categories(&state, &seller, reorder).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let listed = category_service::reorder_categories(
        &state,
        &admin,
        ReorderCategoriesRequest {
            ids: vec![ids[2], ids[0], ids[1]],
        },
    )
    .await?
    .data
    .expect("categories");
    let order: Vec<(Uuid, i32)> = listed.items.iter().map(|c| (c.id, c.display_order)).collect();
    assert_eq!(order, vec![(ids[2], 0), (ids[0], 1), (ids[1], 2)]);

    // Hidden categories drop out for everyone but admins.
    category_service::update_category(
        &state,
        &admin,
        ids[0],
        UpdateCategoryRequest {
            name: None,
            icon: None,
            display_order: None,
            is_active: Some(false),
        },
    )
    .await?;
    let seller_view = category_service::list_categories(&state, &seller)
        .await?
        .data
        .expect("categories");
    assert_eq!(seller_view.items.len(), 2);
    let admin_meta = category_service::list_categories(&state, &admin)
        .await?
        .meta
        .expect("meta");
    assert_eq!(admin_meta.total, Some(3));
    assert_eq!(admin_meta.per_page, None);

    // Notices: pinned first, then newest; inactive ones only for admins.
    let mut notice_ids = Vec::new();
    for (title, is_pinned, is_active) in [
        ("welcome", false, true),
        ("price change", true, true),
        ("holiday", false, true),
        ("draft", false, false),
    ] {
        let notice = notice_service::create_notice(
            &state,
            &admin,
            CreateNoticeRequest {
                title: title.into(),
                content: String::new(),
                is_pinned,
                is_active,
            },
        )
        .await?
        .data
        .expect("notice");
        notice_ids.push(notice.id);
    }
    let titles = |items: Vec<reseller_order_desk::models::Notice>| -> Vec<String> {
        items.into_iter().map(|n| n.title).collect()
    };

    let admin_board = notice_service::list_notices(&state, &admin, Pagination::new(1, 20))
        .await?
        .data
        .expect("notices");
    assert_eq!(titles(admin_board.items), ["price change", "draft", "holiday", "welcome"]);

    let seller_board = notice_service::list_notices(&state, &seller, Pagination::new(1, 20))
        .await?
        .data
        .expect("notices");
    assert_eq!(titles(seller_board.items), ["price change", "holiday", "welcome"]);

    let draft = notice_service::get_notice(&state, &seller, notice_ids[3]).await;
    assert!(matches!(draft, Err(AppError::NotFound)));
    let edit = notice_service::update_notice(
        &state,
        &seller,
        notice_ids[0],
        UpdateNoticeRequest {
            title: Some("mine now".into()),
            content: None,
            is_pinned: None,
            is_active: None,
        },
    )
    .await;
    assert!(matches!(edit, Err(AppError::Forbidden)));

    // Notifications belong to one user; others cannot even see that they exist.
    let mut notification_ids = Vec::new();
    for message in ["first", "second"] {
        let notification = NotificationActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(seller.user_id),
            message: Set(message.into()),
            link: Set(String::new()),
            is_read: Set(false),
            created_at: NotSet,
        }
        .insert(&state.orm)
        .await?;
        notification_ids.push(notification.id);
    }

    let foreign = notification_service::mark_read(&state, &agency, notification_ids[0]).await;
    assert!(matches!(foreign, Err(AppError::NotFound)));

    let read = notification_service::mark_read(&state, &seller, notification_ids[0])
        .await?
        .data
        .expect("notification");
    assert!(read.is_read);

    let rest = notification_service::mark_all_read(&state, &seller)
        .await?
        .data
        .expect("result");
    assert_eq!(rest.updated, 1);

    let inbox = notification_service::list_notifications(&state, &seller, Pagination::new(1, 20))
        .await?
        .data
        .expect("notifications");
    assert_eq!(inbox.unread_count, 0);
    assert_eq!(inbox.items.len(), 2);

    Ok(())
}
