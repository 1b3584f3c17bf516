use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, FromQueryResult, QueryFilter, QueryOrder, QuerySelect,
};
use sea_orm::sea_query::Expr;
use subtle::ConstantTimeEq;

use crate::{
    domain::pricing::reduction_figures,
    dto::settlements::{
        ReductionReport, ReductionRow, ReductionSummary, SettlementList, SettlementSummary,
    },
    entity::{
        orders::{Column as OrderCol, Entity as Orders},
        sea_orm_active_enums::OrderStatus,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Order,
    response::{ApiResponse, Meta},
    routes::params::{Pagination, SettlementPeriod, SettlementQuery},
    state::AppState,
};

/// Half-open confirmation window in business-local dates: `[from, until)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedWindow {
    pub from: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

/// An explicit `date_from` wins; otherwise the month view (the default) starts on the
/// first of the current month unless a `date_to` is given. `date_to` is inclusive.
pub fn confirmed_window(query: &SettlementQuery, today: NaiveDate) -> ConfirmedWindow {
    let period = query.period.unwrap_or_default();
    let from = match query.date_from {
        Some(from) => Some(from),
        None if period == SettlementPeriod::Month && query.date_to.is_none() => today.with_day(1),
        None => None,
    };
    let until = query
        .date_to
        .map(|to| to.checked_add_days(Days::new(1)).unwrap_or(to));
    ConfirmedWindow { from, until }
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    date.and_time(NaiveTime::MIN)
        .and_local_timezone(offset)
        .single()
}

fn settlement_condition(window: ConfirmedWindow, offset: FixedOffset) -> Condition {
    let mut condition =
        Condition::all().add(OrderCol::Status.is_in(OrderStatus::settled()));
    if let Some(from) = window.from.and_then(|d| local_midnight(d, offset)) {
        condition = condition.add(OrderCol::ConfirmedAt.gte(from));
    }
    if let Some(until) = window.until.and_then(|d| local_midnight(d, offset)) {
        condition = condition.add(OrderCol::ConfirmedAt.lt(until));
    }
    condition
}

#[derive(Debug, FromQueryResult)]
struct Totals {
    count: i64,
    total_amount: i64,
}

pub async fn settlement_list(
    state: &AppState,
    auth: &AuthUser,
    query: SettlementQuery,
    pagination: Pagination,
) -> AppResult<ApiResponse<SettlementList>> {
    ensure_admin(auth)?;
    let (page, limit, offset) = pagination.normalize();
    let window = confirmed_window(&query, state.config.business_today());
    let condition = settlement_condition(window, state.config.business_offset());

    let totals = Orders::find()
        .select_only()
        .column_as(Expr::cust("COUNT(*)"), "count")
        .column_as(Expr::cust("COALESCE(SUM(total_amount), 0)::BIGINT"), "total_amount")
        .filter(condition.clone())
        .into_model::<Totals>()
        .one(&state.orm)
        .await?
        .unwrap_or(Totals {
            count: 0,
            total_amount: 0,
        });

    let today = state.config.business_today();
    let items = Orders::find()
        .filter(condition)
        .order_by_desc(OrderCol::ConfirmedAt)
        .order_by_desc(OrderCol::CreatedAt)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|o| Order::from_model(o, today))
        .collect();

    Ok(ApiResponse::success(
        "Settlements",
        SettlementList {
            items,
            summary: SettlementSummary {
                count: totals.count,
                total_amount: totals.total_amount,
            },
        },
        Some(Meta::new(page, limit, totals.count)),
    ))
}

fn check_settlement_password(expected: Option<&str>, supplied: Option<&str>) -> AppResult<()> {
    let Some(expected) = expected else {
        return Err(AppError::Forbidden);
    };
    let supplied = supplied.unwrap_or_default();
    if bool::from(supplied.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(AppError::Unauthorized("Invalid settlement password".into()))
    }
}

/// Reduction-rate profit report over the same window as the settlement list.
pub async fn reduction_analysis(
    state: &AppState,
    auth: &AuthUser,
    query: SettlementQuery,
    password: Option<&str>,
) -> AppResult<ApiResponse<ReductionReport>> {
    ensure_admin(auth)?;
    check_settlement_password(state.config.settlement_password.as_deref(), password)?;

    let window = confirmed_window(&query, state.config.business_today());
    let orders = Orders::find()
        .filter(settlement_condition(window, state.config.business_offset()))
        .order_by_desc(OrderCol::ConfirmedAt)
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let mut summary = ReductionSummary::default();
    let items: Vec<ReductionRow> = orders
        .into_iter()
        .map(|order| {
            let figures =
                reduction_figures(order.total_amount, order.total_quantity, order.reduction_rate);
            summary.add(&figures);
            ReductionRow {
                order_id: order.id,
                order_number: order.order_number,
                user_id: order.user_id,
                confirmed_at: order.confirmed_at.map(|dt| dt.to_utc()),
                figures,
            }
        })
        .collect();

    tracing::info!(orders = summary.count, "reduction report generated");
    Ok(ApiResponse::success(
        "Reduction analysis",
        ReductionReport { items, summary },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_view_is_the_default() {
        let window = confirmed_window(&SettlementQuery::default(), day(2026, 5, 17));
        assert_eq!(window.from, Some(day(2026, 5, 1)));
        assert_eq!(window.until, None);
    }

    #[test]
    fn date_to_alone_disables_the_month_start() {
        let query = SettlementQuery {
            date_to: Some(day(2026, 4, 30)),
            ..Default::default()
        };
        let window = confirmed_window(&query, day(2026, 5, 17));
        assert_eq!(window.from, None);
        assert_eq!(window.until, Some(day(2026, 5, 1)));
    }

    #[test]
    fn explicit_range_and_all_period() {
        let query = SettlementQuery {
            date_from: Some(day(2026, 1, 10)),
            date_to: Some(day(2026, 1, 20)),
            period: Some(SettlementPeriod::All),
        };
        let window = confirmed_window(&query, day(2026, 5, 17));
        assert_eq!(window.from, Some(day(2026, 1, 10)));
        assert_eq!(window.until, Some(day(2026, 1, 21)));

        let all = SettlementQuery {
            period: Some(SettlementPeriod::All),
            ..Default::default()
        };
        assert_eq!(
            confirmed_window(&all, day(2026, 5, 17)),
            ConfirmedWindow { from: None, until: None }
        );
    }

    #[test]
    fn settlement_password_rules() {
        assert!(matches!(
            check_settlement_password(None, Some("x")),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            check_settlement_password(Some("open-sesame"), Some("nope")),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            check_settlement_password(Some("open-sesame"), None),
            Err(AppError::Unauthorized(_))
        ));
        assert!(check_settlement_password(Some("open-sesame"), Some("open-sesame")).is_ok());
    }

    #[test]
    fn window_bounds_use_business_midnight() {
        let offset = FixedOffset::east_opt(9 * 3600).unwrap();
        let start = local_midnight(day(2026, 5, 1), offset).unwrap();
        assert_eq!(start.to_rfc3339(), "2026-05-01T00:00:00+09:00");
    }
}
