use crate::api::Reducer;
use crate::wire::{Count, Revenue};
use serde::Serialize;
use std::fmt;

/// Field order of a summary line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SummaryLayout {
    /// `KEY\tN`
    CountOnly,
    /// `KEY\tOrders: N\tTotal_Revenue: X\tAvg_Revenue: Y`
    OrdersFirst,
    /// `KEY\tTotal_Revenue: X\tOrders: N\tAvg_Revenue: Y`
    RevenueFirst,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CountSummary {
    pub key: String,
    pub orders: u64,
}

impl fmt::Display for CountSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.key, self.orders)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RevenueSummary {
    pub key: String,
    pub orders: u64,
    pub total_revenue: f64,
    pub avg_revenue: f64,
    #[serde(skip)]
    pub layout: SummaryLayout,
}

impl fmt::Display for RevenueSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.layout {
            SummaryLayout::RevenueFirst => write!(
                f,
                "{}\tTotal_Revenue: {:.2}\tOrders: {}\tAvg_Revenue: {:.2}",
                self.key, self.total_revenue, self.orders, self.avg_revenue
            ),
            SummaryLayout::OrdersFirst | SummaryLayout::CountOnly => write!(
                f,
                "{}\tOrders: {}\tTotal_Revenue: {:.2}\tAvg_Revenue: {:.2}",
                self.key, self.orders, self.total_revenue, self.avg_revenue
            ),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CountReducer;

impl Reducer for CountReducer {
    type ValueIn = Count;
    type Acc = u64;
    type Out = CountSummary;

    fn open(&self, first: Count) -> u64 {
        first.0
    }

    fn fold(&self, acc: &mut u64, value: Count) {
        *acc = acc.saturating_add(value.0);
    }

    fn finish(&self, key: &str, orders: u64) -> Option<CountSummary> {
        (orders > 0).then(|| CountSummary { key: key.to_string(), orders })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RevenueAcc {
    pub total_revenue: f64,
    pub orders: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct RevenueReducer {
    pub layout: SummaryLayout,
}

impl RevenueReducer {
    pub fn new(layout: SummaryLayout) -> Self {
        Self { layout }
    }
}

impl Default for RevenueReducer {
    fn default() -> Self {
        Self::new(SummaryLayout::OrdersFirst)
    }
}

impl Reducer for RevenueReducer {
    type ValueIn = Revenue;
    type Acc = RevenueAcc;
    type Out = RevenueSummary;

    fn open(&self, first: Revenue) -> RevenueAcc {
        RevenueAcc { total_revenue: first.revenue, orders: first.count }
    }

    fn fold(&self, acc: &mut RevenueAcc, value: Revenue) {
        acc.total_revenue += value.revenue;
        acc.orders = acc.orders.saturating_add(value.count);
    }

    fn finish(&self, key: &str, acc: RevenueAcc) -> Option<RevenueSummary> {
        if acc.orders == 0 {
            return None;
        }
        Some(RevenueSummary {
            key: key.to_string(),
            orders: acc.orders,
            total_revenue: acc.total_revenue,
            avg_revenue: acc.total_revenue / acc.orders as f64,
            layout: self.layout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reduce<R: Reducer>(r: &R, key: &str, values: Vec<R::ValueIn>) -> Vec<String> {
        let mut out = Vec::new();
        r.do_reduce(key, values, &mut |s| out.push(s.to_string()));
        out
    }

    #[test]
    fn count_group() {
        let out = reduce(&CountReducer, "Asia", vec![Count(1), Count(1), Count(3)]);
        assert_eq!(out, vec!["Asia\t5"]);
    }

    #[test]
    fn zero_count_group_is_suppressed() {
        assert!(reduce(&CountReducer, "Asia", vec![Count(0)]).is_empty());
        let r = RevenueReducer::default();
        assert!(reduce(&r, "India", vec![Revenue { revenue: 12.0, count: 0 }]).is_empty());
    }

    #[test]
    fn revenue_layouts() {
        let values = || vec![Revenue::single(100.0), Revenue::single(50.0)];
        let out = reduce(&RevenueReducer::new(SummaryLayout::OrdersFirst), "India", values());
        assert_eq!(out, vec!["India\tOrders: 2\tTotal_Revenue: 150.00\tAvg_Revenue: 75.00"]);
        let out = reduce(&RevenueReducer::new(SummaryLayout::RevenueFirst), "Snacks", values());
        assert_eq!(out, vec!["Snacks\tTotal_Revenue: 150.00\tOrders: 2\tAvg_Revenue: 75.00"]);
    }

    #[test]
    fn average_keeps_full_precision_until_display() {
        let r = RevenueReducer::default();
        let mut acc = r.open(Revenue::single(0.1));
        r.fold(&mut acc, Revenue::single(0.2));
        r.fold(&mut acc, Revenue::single(0.004));
        let s = r.finish("k", acc).unwrap();
        assert!((s.total_revenue - 0.304).abs() < 1e-12);
        assert_eq!(s.to_string(), "k\tOrders: 3\tTotal_Revenue: 0.30\tAvg_Revenue: 0.10");
    }

    #[test]
    fn empty_group_emits_nothing() {
        assert!(reduce(&CountReducer, "k", vec![]).is_empty());
    }
}
