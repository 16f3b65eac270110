//! Campaign analytics: aggregate metrics, trends and rule-based recommendations
//! computed on demand from a tenant's creatives and daily metric buckets.

#![warn(clippy::unwrap_used)]

pub mod aggregator;
pub mod formulas;
pub mod recommendations;
pub mod trends;

pub use aggregator::{
    AnalyticsAggregator, CampaignAnalytics, CreativeStats, DateRange, MultiCampaignAnalytics, SkippedCampaign,
};
pub use formulas::{CampaignMetrics, PerformanceTier};
pub use recommendations::{Recommendation, RecommendationKind};
pub use trends::{GrowthRates, TrendAnalysis, TrendBucket};
