//! Derived ratios. Every ratio is 0 when its denominator is 0.

use serde::{Deserialize, Serialize};

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// clicks / impressions × 100
pub fn ctr(clicks: i64, impressions: i64) -> f64 {
    ratio(clicks as f64, impressions as f64) * 100.0
}

/// conversions / clicks × 100
pub fn conversion_rate(conversions: i64, clicks: i64) -> f64 {
    ratio(conversions as f64, clicks as f64) * 100.0
}

pub fn cpc(spend: f64, clicks: i64) -> f64 {
    ratio(spend, clicks as f64)
}

pub fn cpa(spend: f64, conversions: i64) -> f64 {
    ratio(spend, conversions as f64)
}

/// spend / impressions × 1000
pub fn cpm(spend: f64, impressions: i64) -> f64 {
    ratio(spend, impressions as f64) * 1000.0
}

pub fn roas(revenue: f64, spend: f64) -> f64 {
    ratio(revenue, spend)
}

/// Campaign-level totals plus derived ratios.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignMetrics {
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub spend: f64,
    pub revenue: f64,
    pub ctr: f64,
    pub conversion_rate: f64,
    pub cpc: f64,
    pub cpa: f64,
    pub cpm: f64,
    pub roas: f64,
}

impl CampaignMetrics {
    pub fn from_totals(impressions: i64, clicks: i64, conversions: i64, spend: f64, revenue: f64) -> Self {
        Self {
            impressions,
            clicks,
            conversions,
            spend,
            revenue,
            ctr: ctr(clicks, impressions),
            conversion_rate: conversion_rate(conversions, clicks),
            cpc: cpc(spend, clicks),
            cpa: cpa(spend, conversions),
            cpm: cpm(spend, impressions),
            roas: roas(revenue, spend),
        }
    }

    pub fn is_finite(&self) -> bool {
        [
            self.spend,
            self.revenue,
            self.ctr,
            self.conversion_rate,
            self.cpc,
            self.cpa,
            self.cpm,
            self.roas,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    High,
    Medium,
    Low,
}

impl PerformanceTier {
    pub fn classify(ctr: f64, high_threshold: f64, medium_threshold: f64) -> Self {
        if ctr >= high_threshold {
            Self::High
        } else if ctr >= medium_threshold {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_denominators_yield_zero() {
        let m = CampaignMetrics::from_totals(0, 0, 0, 12.5, 0.0);
        assert_eq!(m.ctr, 0.0);
        assert_eq!(m.conversion_rate, 0.0);
        assert_eq!(m.cpc, 0.0);
        assert_eq!(m.cpa, 0.0);
        assert_eq!(m.cpm, 0.0);
        assert!(m.is_finite());

        assert_eq!(roas(100.0, 0.0), 0.0);
    }

    #[test]
    fn test_ratios() {
        let m = CampaignMetrics::from_totals(3000, 25, 5, 50.0, 150.0);
        assert!((m.ctr - 25.0 / 3000.0 * 100.0).abs() < 1e-12);
        assert!((m.conversion_rate - 20.0).abs() < 1e-12);
        assert!((m.cpc - 2.0).abs() < 1e-12);
        assert!((m.cpa - 10.0).abs() < 1e-12);
        assert!((m.cpm - 50.0 / 3.0).abs() < 1e-9);
        assert!((m.roas - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(PerformanceTier::classify(2.0, 2.0, 1.0), PerformanceTier::High);
        assert_eq!(PerformanceTier::classify(1.99, 2.0, 1.0), PerformanceTier::Medium);
        assert_eq!(PerformanceTier::classify(1.0, 2.0, 1.0), PerformanceTier::Medium);
        assert_eq!(PerformanceTier::classify(0.5, 2.0, 1.0), PerformanceTier::Low);
    }
}
