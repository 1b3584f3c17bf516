//! Order pricing and settlement arithmetic.
//!
//! All amounts are whole currency units. Rounding follows banker's rounding
//! (half to even) wherever a fraction can appear.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// VAT applied on top of the supply amount, in percent.
pub const VAT_PERCENT: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct AmountBreakdown {
    pub supply_amount: i64,
    pub vat_amount: i64,
    pub total_amount: i64,
}

/// `numerator / denominator` rounded half to even. Both must be non-negative, denominator non-zero.
pub fn div_round_half_even(numerator: i64, denominator: i64) -> i64 {
    let rounded = div_round_half_even_wide(i128::from(numerator), i128::from(denominator));
    // |rounded| <= |numerator| whenever denominator >= 1
    i64::try_from(rounded).unwrap_or(numerator)
}

fn div_round_half_even_wide(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    let twice = remainder * 2;
    if twice > denominator || (twice == denominator && quotient % 2 == 1) {
        quotient + 1
    } else {
        quotient
    }
}

/// Upper bound on any configured unit price.
pub const MAX_UNIT_PRICE: i64 = 1_000_000_000;

/// Largest VAT-inclusive amount an order may carry. Keeps every derived figure well inside `i64`.
pub const MAX_ORDER_AMOUNT: i64 = 1_000_000_000_000_000;

/// Price an order: supply = unit × quantity, VAT on top.
pub fn quote(unit_price: i64, total_quantity: i64) -> AppResult<AmountBreakdown> {
    if unit_price < 0 || total_quantity < 0 {
        return Err(AppError::BadRequest("Price and quantity must not be negative".into()));
    }
    let too_large = || AppError::BadRequest("Order amount is too large".into());
    let supply_amount = unit_price.checked_mul(total_quantity).ok_or_else(too_large)?;
    let vat_amount = supply_amount
        .checked_mul(VAT_PERCENT)
        .map(|v| div_round_half_even(v, 100))
        .ok_or_else(too_large)?;
    let total_amount = supply_amount.checked_add(vat_amount).ok_or_else(too_large)?;
    if total_amount > MAX_ORDER_AMOUNT {
        return Err(too_large());
    }
    Ok(AmountBreakdown {
        supply_amount,
        vat_amount,
        total_amount,
    })
}

/// Recover the supply/VAT split from a VAT-inclusive total.
pub fn split_total(total_amount: i64) -> AmountBreakdown {
    let total = total_amount.max(0);
    let supply = div_round_half_even_wide(i128::from(total) * 100, i128::from(100 + VAT_PERCENT));
    // supply never exceeds total, so it fits back into i64
    let supply_amount = i64::try_from(supply).unwrap_or(total);
    AmountBreakdown {
        supply_amount,
        vat_amount: total - supply_amount,
        total_amount: total,
    }
}

/// Unit price a user pays: their override when one is set, otherwise cost price
/// for admins and base price for everyone else.
pub fn unit_price_for(cost_price: i64, base_price: i64, is_admin: bool, override_price: Option<i64>) -> i64 {
    override_price.unwrap_or(if is_admin { cost_price } else { base_price })
}

pub fn effective_reduction_rate(product_rate: i32, override_rate: Option<i32>) -> i32 {
    override_rate.unwrap_or(product_rate)
}

pub fn deadline_from(today: NaiveDate, max_work_days: i32) -> NaiveDate {
    today
        .checked_add_days(Days::new(max_work_days.max(0) as u64))
        .unwrap_or(today)
}

/// Signed number of days until the deadline; negative once expired.
pub fn days_left(deadline: NaiveDate, today: NaiveDate) -> i64 {
    (deadline - today).num_days()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReductionFigures {
    pub total_quantity: i64,
    pub reduction_rate: i32,
    pub reduced_quantity: i64,
    pub actual_quantity: i64,
    pub supply_amount: i64,
    pub vat_amount: i64,
    pub total_amount: i64,
    pub reduced_profit: i64,
}

/// Profit carried by the non-billable share of an order's quantity.
pub fn reduction_figures(total_amount: i64, total_quantity: i64, reduction_rate: i32) -> ReductionFigures {
    let split = split_total(total_amount);
    let total_quantity = total_quantity.max(0);
    let rate = i64::from(reduction_rate.clamp(0, 100));
    // rate <= 100, so the reduced share never exceeds the total
    let reduced_quantity = i64::try_from(i128::from(total_quantity) * i128::from(rate) / 100)
        .unwrap_or(total_quantity);
    let reduced_profit = if total_quantity > 0 {
        let wide = i128::from(reduced_quantity) * i128::from(split.supply_amount)
            / i128::from(total_quantity);
        i64::try_from(wide).unwrap_or(split.supply_amount)
    } else {
        0
    };
    ReductionFigures {
        total_quantity,
        reduction_rate: rate as i32,
        reduced_quantity,
        actual_quantity: total_quantity - reduced_quantity,
        supply_amount: split.supply_amount,
        vat_amount: split.vat_amount,
        total_amount: split.total_amount,
        reduced_profit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_even_rounding() {
        assert_eq!(div_round_half_even(25, 10), 2);
        assert_eq!(div_round_half_even(35, 10), 4);
        assert_eq!(div_round_half_even(26, 10), 3);
        assert_eq!(div_round_half_even(24, 10), 2);
        assert_eq!(div_round_half_even(0, 7), 0);
    }

    #[test]
    fn quote_adds_ten_percent_vat() {
        let q = quote(1000, 5).unwrap();
        assert_eq!(q.supply_amount, 5000);
        assert_eq!(q.vat_amount, 500);
        assert_eq!(q.total_amount, 5500);
    }

    #[test]
    fn quote_rounds_vat_half_even() {
        // 125 * 0.1 = 12.5 -> 12, 135 * 0.1 = 13.5 -> 14
        assert_eq!(quote(125, 1).unwrap().vat_amount, 12);
        assert_eq!(quote(135, 1).unwrap().vat_amount, 14);
    }

    #[test]
    fn quote_rejects_overflow() {
        assert!(quote(i64::MAX, 2).is_err());
        assert!(matches!(
            quote(5, 1_000_000_000_000_000_000),
            Err(AppError::BadRequest(_))
        ));
        assert!(quote(100_000_000_000_000_000, 1).is_err());
    }

    #[test]
    fn quote_accepts_the_largest_allowed_amount() {
        let q = quote(MAX_ORDER_AMOUNT / 11, 10).unwrap();
        assert!(q.total_amount <= MAX_ORDER_AMOUNT);
        assert!(quote(MAX_ORDER_AMOUNT / 10, 10).is_err());
    }

    #[test]
    fn wide_totals_split_and_reduce_without_overflow() {
        let split = split_total(i64::MAX);
        assert_eq!(split.supply_amount + split.vat_amount, i64::MAX);
        assert!(split.supply_amount > split.vat_amount);

        let r = reduction_figures(i64::MAX, i64::MAX, 100);
        assert_eq!(r.reduced_quantity, i64::MAX);
        assert_eq!(r.actual_quantity, 0);
        assert_eq!(r.reduced_profit, r.supply_amount);

        assert_eq!(div_round_half_even(i64::MAX, i64::MAX - 1), 1);
    }

    #[test]
    fn split_total_inverts_quote() {
        let q = quote(1000, 5).unwrap();
        assert_eq!(split_total(q.total_amount), q);

        let odd = split_total(1001);
        assert_eq!(odd.supply_amount, 910);
        assert_eq!(odd.vat_amount, 91);
    }

    #[test]
    fn override_wins_over_defaults() {
        assert_eq!(unit_price_for(700, 1000, true, None), 700);
        assert_eq!(unit_price_for(700, 1000, false, None), 1000);
        assert_eq!(unit_price_for(700, 1000, false, Some(850)), 850);
        assert_eq!(unit_price_for(700, 1000, true, Some(0)), 0);
        assert_eq!(effective_reduction_rate(20, None), 20);
        assert_eq!(effective_reduction_rate(20, Some(35)), 35);
    }

    #[test]
    fn deadline_counts_work_days() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 26).unwrap();
        assert_eq!(deadline_from(today, 3), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(days_left(NaiveDate::from_ymd_opt(2026, 2, 24).unwrap(), today), -2);
    }

    #[test]
    fn reduction_profit_uses_supply_per_unit() {
        // total 11000 -> supply 10000 for 100 units; 30% reduced = 30 units * 100
        let r = reduction_figures(11_000, 100, 30);
        assert_eq!(r.supply_amount, 10_000);
        assert_eq!(r.vat_amount, 1_000);
        assert_eq!(r.reduced_quantity, 30);
        assert_eq!(r.actual_quantity, 70);
        assert_eq!(r.reduced_profit, 3_000);
    }

    #[test]
    fn reduction_truncates_and_handles_zero_quantity() {
        let r = reduction_figures(1_100, 7, 33);
        assert_eq!(r.reduced_quantity, 2);
        assert_eq!(r.reduced_profit, 2 * 1_000 / 7);

        let empty = reduction_figures(0, 0, 50);
        assert_eq!(empty.reduced_profit, 0);
        assert_eq!(empty.actual_quantity, 0);
    }
}
