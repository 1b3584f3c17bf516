use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{domain::pricing::ReductionFigures, models::Order};

#[derive(Debug, Serialize, ToSchema)]
pub struct SettlementSummary {
    pub count: i64,
    pub total_amount: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SettlementList {
    pub items: Vec<Order>,
    pub summary: SettlementSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReductionRow {
    pub order_id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub figures: ReductionFigures,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReductionSummary {
    pub count: i64,
    pub total_quantity: i64,
    pub reduced_quantity: i64,
    pub actual_quantity: i64,
    pub supply_amount: i64,
    pub vat_amount: i64,
    pub total_amount: i64,
    pub reduced_profit: i64,
}

impl ReductionSummary {
    pub fn add(&mut self, figures: &ReductionFigures) {
        self.count = self.count.saturating_add(1);
        self.total_quantity = self.total_quantity.saturating_add(figures.total_quantity);
        self.reduced_quantity = self.reduced_quantity.saturating_add(figures.reduced_quantity);
        self.actual_quantity = self.actual_quantity.saturating_add(figures.actual_quantity);
        self.supply_amount = self.supply_amount.saturating_add(figures.supply_amount);
        self.vat_amount = self.vat_amount.saturating_add(figures.vat_amount);
        self.total_amount = self.total_amount.saturating_add(figures.total_amount);
        self.reduced_profit = self.reduced_profit.saturating_add(figures.reduced_profit);
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReductionReport {
    pub items: Vec<ReductionRow>,
    pub summary: ReductionSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pricing::reduction_figures;

    #[test]
    fn summary_sums_every_column() {
        let mut summary = ReductionSummary::default();
        summary.add(&reduction_figures(11_000, 100, 30));
        summary.add(&reduction_figures(5_500, 5, 0));
        assert_eq!(summary.count, 2);
        assert_eq!(summary.total_amount, 16_500);
        assert_eq!(summary.supply_amount, 15_000);
        assert_eq!(summary.reduced_quantity, 30);
        assert_eq!(summary.actual_quantity, 75);
        assert_eq!(summary.reduced_profit, 3_000);
    }
}
