//! Pure derivations over already-fetched cost data. No I/O, no state:
//! identical input always produces identical output.

use crate::models::{
    ComparisonResult, CostPoint, DerivedMetrics, DimensionBreakdown, Recommendation,
};
use std::cmp::Ordering;

/// How many ranked services the headline metrics carry.
pub const TOP_SERVICES: usize = 5;

pub fn total_cost(trends: &[CostPoint]) -> f64 {
    trends.iter().map(|p| p.amount).sum()
}

/// Average cost per data point; 0 for an empty series rather than a
/// division error.
pub fn avg_daily_cost(trends: &[CostPoint]) -> f64 {
    if trends.is_empty() {
        return 0.0;
    }
    total_cost(trends) / trends.len() as f64
}

/// Percentage change between two period totals. `None` when the previous
/// total is not positive: the change is undefined and callers render it
/// as such instead of dividing by zero.
pub fn percentage_change(previous_total: f64, current_total: f64) -> Option<f64> {
    if previous_total > 0.0 {
        Some((current_total - previous_total) / previous_total * 100.0)
    } else {
        None
    }
}

/// Recomputes each entry's share of the breakdown total. Backend-supplied
/// percentages are display hints only and are never trusted for ranking.
pub fn recompute_shares(breakdown: &[DimensionBreakdown]) -> Vec<DimensionBreakdown> {
    let total: f64 = breakdown.iter().map(|b| b.amount).sum();
    breakdown
        .iter()
        .map(|b| DimensionBreakdown {
            key: b.key.clone(),
            amount: b.amount,
            percentage: if total > 0.0 {
                b.amount / total * 100.0
            } else {
                0.0
            },
        })
        .collect()
}

/// Top `n` entries by amount, descending. Ties break by key ascending so
/// the ranking is deterministic.
pub fn top_n(breakdown: &[DimensionBreakdown], n: usize) -> Vec<DimensionBreakdown> {
    let mut ranked = recompute_shares(breakdown);
    ranked.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });
    ranked.truncate(n);
    ranked
}

pub fn total_potential_savings(recommendations: &[Recommendation]) -> f64 {
    recommendations
        .iter()
        .map(|r| r.estimated_monthly_savings)
        .sum()
}

/// Headline metrics computed from whichever dimensions a cycle managed to
/// fetch. Missing dimensions contribute zeros, never fabricated values.
pub fn derive(
    trends: &[CostPoint],
    services: &[DimensionBreakdown],
    comparison: Option<&ComparisonResult>,
    recommendations: Option<&[Recommendation]>,
) -> DerivedMetrics {
    DerivedMetrics {
        total_cost: total_cost(trends),
        avg_daily_cost: avg_daily_cost(trends),
        data_points: trends.len(),
        active_services: services.len(),
        top_services: top_n(services, TOP_SERVICES),
        recommendation_count: recommendations.map_or(0, <[Recommendation]>::len),
        total_potential_savings: recommendations.map_or(0.0, total_potential_savings),
        cost_change_percentage: comparison.and_then(|c| {
            percentage_change(c.previous_period.total_cost, c.current_period.total_cost)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn point(day: u32, amount: f64) -> CostPoint {
        CostPoint {
            date: NaiveDate::from_ymd_opt(2024, 6, day).expect("valid test date"),
            amount,
        }
    }

    fn slice(key: &str, amount: f64, percentage: f64) -> DimensionBreakdown {
        DimensionBreakdown {
            key: key.to_string(),
            amount,
            percentage,
        }
    }

    #[test]
    fn avg_daily_cost_handles_empty_single_and_many() {
        assert_eq!(avg_daily_cost(&[]), 0.0);
        assert_eq!(avg_daily_cost(&[point(1, 10.0)]), 10.0);
        assert_eq!(avg_daily_cost(&[point(1, 10.0), point(2, 20.0)]), 15.0);
    }

    #[test]
    fn percentage_change_computes_signed_change() {
        assert_eq!(percentage_change(100.0, 150.0), Some(50.0));
        assert_eq!(percentage_change(100.0, 75.0), Some(-25.0));
    }

    #[test]
    fn percentage_change_is_undefined_for_zero_previous_total() {
        assert_eq!(percentage_change(0.0, 50.0), None);
        assert_eq!(percentage_change(-1.0, 50.0), None);
    }

    #[test]
    fn top_n_ranks_by_amount_descending() {
        let breakdown = vec![
            slice("ec2", 10.0, 0.0),
            slice("s3", 40.0, 0.0),
            slice("rds", 25.0, 0.0),
        ];
        let top = top_n(&breakdown, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].key, "s3");
        assert_eq!(top[1].key, "rds");
    }

    #[test]
    fn top_n_breaks_amount_ties_by_key_ascending() {
        let breakdown = vec![
            slice("lambda", 5.0, 0.0),
            slice("dynamodb", 5.0, 0.0),
            slice("athena", 5.0, 0.0),
        ];
        let top = top_n(&breakdown, 3);
        assert_eq!(top[0].key, "athena");
        assert_eq!(top[1].key, "dynamodb");
        assert_eq!(top[2].key, "lambda");
    }

    #[test]
    fn top_n_recomputes_shares_and_ignores_backend_percentages() {
        let breakdown = vec![slice("ec2", 75.0, 1.0), slice("s3", 25.0, 99.0)];
        let top = top_n(&breakdown, 2);
        assert_eq!(top[0].key, "ec2");
        assert!((top[0].percentage - 75.0).abs() < 1e-9);
        assert!((top[1].percentage - 25.0).abs() < 1e-9);
    }

    #[test]
    fn recompute_shares_of_empty_total_yields_zero_percentages() {
        let shares = recompute_shares(&[slice("ec2", 0.0, 50.0)]);
        assert_eq!(shares[0].percentage, 0.0);
    }

    #[test]
    fn derive_is_deterministic_for_identical_input() {
        let trends = vec![point(1, 10.0), point(2, 20.0), point(3, 12.5)];
        let services = vec![slice("ec2", 30.0, 0.0), slice("s3", 12.5, 0.0)];
        let first = derive(&trends, &services, None, None);
        let second = derive(&trends, &services, None, None);
        assert_eq!(first, second);
        assert_eq!(first.total_cost, 42.5);
        assert_eq!(first.data_points, 3);
        assert_eq!(first.active_services, 2);
    }
}
