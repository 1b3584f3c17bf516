use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    domain::{
        hierarchy::UserNode,
        pricing::ReductionFigures,
        schema::{FieldSchema, FieldType, RowError, SchemaField},
    },
    dto::{
        auth::{LoginRequest, LoginResponse},
        dashboard::{CreateNoticeRequest, MarkReadResult, NoticeList, NotificationList, UpdateNoticeRequest},
        orders::{
            BulkStatusRequest, BulkStatusResult, CreateOrderRequest, OrderList, OrderReceipt,
            OrderWithItems, UpdateDeadlineRequest, UpdateItemRequest, UpdateStatusRequest,
        },
        price_policies::{
            MatrixCell, MatrixProduct, MatrixRow, PriceMatrix, PricePolicyList, PricePolicyRequest,
            SavePriceResult, UpdatePricePolicyRequest,
        },
        products::{
            CategoryList, CreateCategoryRequest, CreateProductRequest, PricedProduct, ProductList,
            ProductSchemaResponse, ReorderCategoriesRequest, UpdateCategoryRequest,
            UpdateProductRequest,
        },
        settlements::{ReductionReport, ReductionRow, ReductionSummary, SettlementList, SettlementSummary},
        users::{BalanceAdjustRequest, BalanceTransactionList, CreateUserRequest, UpdateUserRequest, UserTree},
    },
    entity::sea_orm_active_enums::{ItemStatus, OrderStatus, Role, TxType},
    models::{BalanceTransaction, Category, Notice, Notification, Order, OrderItem, PricePolicy, Product, User},
    response::{ApiResponse, Meta},
    routes::{
        auth, categories, health, notices, notifications, orders, params, price_policies, products,
        settlements, users,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::current_user,
        users::list_users,
        users::create_user,
        users::get_user,
        users::update_user,
        users::delete_user,
        users::adjust_balance,
        users::list_balance_transactions,
        categories::list_categories,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        categories::reorder_categories,
        categories::category_products,
        products::list_products,
        products::create_product,
        products::get_product,
        products::update_product,
        products::delete_product,
        products::product_schema,
        price_policies::list_policies,
        price_policies::create_policy,
        price_policies::update_policy,
        price_policies::delete_policy,
        price_policies::save_price,
        price_policies::price_matrix,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        orders::confirm_payment,
        orders::cancel_order,
        orders::update_status,
        orders::bulk_update_status,
        orders::update_deadline,
        orders::update_item_status,
        orders::delete_order,
        settlements::settlement_list,
        settlements::reduction_analysis,
        notices::list_notices,
        notices::get_notice,
        notices::create_notice,
        notices::update_notice,
        notices::delete_notice,
        notifications::list_notifications,
        notifications::mark_read,
        notifications::mark_all_read
    ),
    components(
        schemas(
            Role,
            OrderStatus,
            ItemStatus,
            TxType,
            User,
            UserNode,
            UserTree,
            CreateUserRequest,
            UpdateUserRequest,
            BalanceAdjustRequest,
            BalanceTransaction,
            BalanceTransactionList,
            LoginRequest,
            LoginResponse,
            Category,
            CategoryList,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            ReorderCategoriesRequest,
            FieldType,
            SchemaField,
            FieldSchema,
            Product,
            PricedProduct,
            ProductList,
            ProductSchemaResponse,
            CreateProductRequest,
            UpdateProductRequest,
            PricePolicy,
            PricePolicyList,
            PricePolicyRequest,
            UpdatePricePolicyRequest,
            SavePriceResult,
            MatrixProduct,
            MatrixCell,
            MatrixRow,
            PriceMatrix,
            RowError,
            Order,
            OrderItem,
            OrderList,
            OrderWithItems,
            OrderReceipt,
            CreateOrderRequest,
            UpdateStatusRequest,
            BulkStatusRequest,
            BulkStatusResult,
            UpdateDeadlineRequest,
            UpdateItemRequest,
            SettlementSummary,
            SettlementList,
            ReductionFigures,
            ReductionRow,
            ReductionSummary,
            ReductionReport,
            Notice,
            NoticeList,
            CreateNoticeRequest,
            UpdateNoticeRequest,
            Notification,
            NotificationList,
            MarkReadResult,
            params::Pagination,
            params::SortOrder,
            params::OrderListQuery,
            params::ProductQuery,
            params::PricePolicyQuery,
            params::SettlementPeriod,
            params::SettlementQuery,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<ProductList>,
            ApiResponse<SettlementList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Users", description = "Organisation tree and balances"),
        (name = "Categories", description = "Product categories"),
        (name = "Products", description = "Product catalogue and order forms"),
        (name = "Price Policies", description = "Per-user price overrides"),
        (name = "Orders", description = "Order submission and processing"),
        (name = "Settlements", description = "Confirmed order reporting"),
        (name = "Dashboard", description = "Notices and notifications"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
