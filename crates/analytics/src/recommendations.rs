//! Fixed optimization rules evaluated over campaign metrics.

use crate::formulas::CampaignMetrics;
use adgenius_core::config::AnalyticsConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Creative,
    Targeting,
    Budget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub impact_score: u8,
    pub confidence: u8,
    pub actions: Vec<String>,
}

fn rule(
    kind: RecommendationKind,
    priority: Priority,
    title: &str,
    description: String,
    impact_score: u8,
    confidence: u8,
    actions: &[&str],
) -> Recommendation {
    Recommendation {
        kind,
        priority,
        title: title.to_string(),
        description,
        impact_score,
        confidence,
        actions: actions.iter().map(|a| a.to_string()).collect(),
    }
}

/// Rules only fire on campaigns with data: the CTR rule needs impressions,
/// the CPA rule needs conversions, the ROAS rule needs spend.
pub fn recommend(metrics: &CampaignMetrics, config: &AnalyticsConfig) -> Vec<Recommendation> {
    let mut out = Vec::new();

    if metrics.impressions > 0 && metrics.ctr < config.low_ctr_recommendation_threshold {
        out.push(rule(
            RecommendationKind::Creative,
            Priority::High,
            "Improve Creative Performance",
            format!(
                "CTR is {:.2}%, below the {:.1}% benchmark. Refresh creatives to lift engagement.",
                metrics.ctr, config.low_ctr_recommendation_threshold
            ),
            85,
            92,
            &[
                "A/B test new headlines",
                "Try different visual styles",
                "Update call-to-action buttons",
            ],
        ));
    }

    if metrics.conversions > 0 && metrics.cpa > config.high_cpa_threshold {
        out.push(rule(
            RecommendationKind::Targeting,
            Priority::High,
            "Optimize Targeting to Reduce Costs",
            format!(
                "Cost per acquisition is ${:.2}, above the ${:.2} target.",
                metrics.cpa, config.high_cpa_threshold
            ),
            78,
            88,
            &[
                "Narrow audience demographics",
                "Add interest-based targeting",
                "Exclude low-performing locations",
            ],
        ));
    }

    if metrics.spend > 0.0 && metrics.roas < config.low_roas_threshold {
        out.push(rule(
            RecommendationKind::Budget,
            Priority::Medium,
            "Improve Return on Ad Spend",
            format!(
                "ROAS is {:.2}x, below the {:.1}x target. Shift budget toward what converts.",
                metrics.roas, config.low_roas_threshold
            ),
            65,
            81,
            &[
                "Pause underperforming creatives",
                "Increase budget for top performers",
                "Optimize bidding strategy",
            ],
        ));
    }

    out
}
