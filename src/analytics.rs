//! Typed records for the admin analytics endpoints.
//!
//! The backend's analytics responses are sparse: fields appear as the
//! reporting jobs fill them in. Every record here decodes leniently —
//! a missing or null field becomes its default instead of failing the
//! response — so the dashboard renders zeros rather than an error
//! state.

use serde::Deserialize;

/// Optional date-range scope accepted by most analytics endpoints.
///
/// Dates travel as `YYYY-MM-DD` strings; only set bounds become query
/// parameters.
#[derive(Debug, Clone, Default)]
pub struct DateRange {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl DateRange {
    /// The query pairs to send, in a stable order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(start) = &self.start_date {
            pairs.push(("startDate", start.clone()));
        }
        if let Some(end) = &self.end_date {
            pairs.push(("endDate", end.clone()));
        }
        pairs
    }
}

/// `GET /admin/analytics/summary` — the KPI cards.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsSummary {
    pub total_orders: u64,
    pub total_revenue: f64,
    pub avg_order_value: f64,
    pub total_items_sold: u64,
}

/// One point of `GET /admin/analytics/orders/daily`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyOrdersPoint {
    /// Day label, `YYYY-MM-DD`.
    pub date: String,
    pub orders: u64,
    pub revenue: f64,
}

/// One point of `GET /admin/analytics/orders/hourly`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HourlyOrdersPoint {
    /// Hour of day, 0-23.
    pub hour: u32,
    pub orders: u64,
}

/// `GET /admin/analytics/veg-vs-nonveg`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VegSplit {
    pub veg: u64,
    pub non_veg: u64,
}

/// One row of `GET /admin/analytics/items/top`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopItem {
    pub name: String,
    pub qty_sold: u64,
    pub revenue: f64,
}

/// One row of `GET /admin/analytics/sales/category`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategorySales {
    pub category: String,
    pub orders: u64,
    pub revenue: f64,
}

/// `GET /admin/analytics/customers/repeat`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepeatCustomers {
    pub repeat_customers: u64,
    pub total_customers: u64,
}

/// One row of `GET /admin/analytics/items/profitable`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfitableItem {
    pub name: String,
    pub revenue: f64,
    pub profit: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_decodes_sparse_payload_with_defaults() {
        let json = serde_json::json!({"totalOrders": 42});
        let summary: AnalyticsSummary = serde_json::from_value(json).expect("decode");
        assert_eq!(summary.total_orders, 42);
        assert_eq!(summary.total_revenue, 0.0);
        assert_eq!(summary.avg_order_value, 0.0);
        assert_eq!(summary.total_items_sold, 0);
    }

    #[test]
    fn summary_decodes_empty_object() {
        let summary: AnalyticsSummary =
            serde_json::from_value(serde_json::json!({})).expect("decode");
        assert_eq!(summary.total_orders, 0);
    }

    #[test]
    fn daily_points_decode_from_array() {
        let json = serde_json::json!([
            {"date": "2025-11-01", "orders": 12, "revenue": 4800.0},
            {"date": "2025-11-02"}
        ]);
        let points: Vec<DailyOrdersPoint> = serde_json::from_value(json).expect("decode");
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].orders, 12);
        assert_eq!(points[1].orders, 0);
        assert_eq!(points[1].revenue, 0.0);
    }

    #[test]
    fn veg_split_decodes_camel_case() {
        let json = serde_json::json!({"veg": 30, "nonVeg": 70});
        let split: VegSplit = serde_json::from_value(json).expect("decode");
        assert_eq!(split.veg, 30);
        assert_eq!(split.non_veg, 70);
    }

    #[test]
    fn top_item_ignores_unknown_fields() {
        let json = serde_json::json!({
            "name": "Dal",
            "qtySold": 91,
            "revenue": 10920.0,
            "rank": 1
        });
        let item: TopItem = serde_json::from_value(json).expect("decode");
        assert_eq!(item.name, "Dal");
        assert_eq!(item.qty_sold, 91);
    }

    #[test]
    fn date_range_query_pairs() {
        let range = DateRange {
            start_date: Some("2025-11-01".to_string()),
            end_date: None,
        };
        assert_eq!(
            range.query_pairs(),
            vec![("startDate", "2025-11-01".to_string())]
        );
        assert!(DateRange::default().query_pairs().is_empty());
    }
}
