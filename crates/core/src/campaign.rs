//! Campaign and creative documents stored in a tenant's isolated store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ─── Campaign ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
}

impl CampaignStatus {
    /// Lifecycle: draft → active → paused/completed, paused → active, completed is terminal.
    pub fn can_transition_to(self, next: CampaignStatus) -> bool {
        use CampaignStatus::*;
        matches!(
            (self, next),
            (Draft, Active) | (Active, Paused) | (Paused, Active) | (Active, Completed) | (Paused, Completed)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub total_amount: f64,
    #[serde(default)]
    pub daily_amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub spent_amount: f64,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            total_amount: 0.0,
            daily_amount: 0.0,
            currency: default_currency(),
            spent_amount: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetAudience {
    #[serde(default)]
    pub age_range: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
}

impl TargetAudience {
    /// Flat descriptor handed to the generation engine.
    pub fn describe(&self) -> String {
        let or_any = |v: &Option<String>| v.clone().unwrap_or_else(|| "any".to_string());
        format!(
            "Target: {}, {}, interests: [{}], location: {}",
            or_any(&self.age_range),
            or_any(&self.gender),
            self.interests.join(", "),
            or_any(&self.location),
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BrandAssetKind {
    Logo,
    ColorPalette,
    Font,
    Image,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandAsset {
    pub name: String,
    pub kind: BrandAssetKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub status: CampaignStatus,
    pub budget: Budget,
    pub target_audience: TargetAudience,
    pub brand_assets: Vec<BrandAsset>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub launched_at: Option<DateTime<Utc>>,
}

// ─── Creative ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CreativeType {
    Text,
    Image,
    Video,
}

impl CreativeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// Creative state machine: `generating` → `completed` | `failed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CreativeStatus {
    Generating,
    Completed,
    Failed,
}

impl CreativeStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, CreativeStatus::Generating)
    }
}

/// Generated payload, one variant per creative type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CreativeContent {
    Text {
        text: String,
        headline: Option<String>,
    },
    Image {
        image_url: String,
        aspect_ratio: String,
        enhanced_prompt: Option<String>,
    },
    Video {
        video_url: String,
        duration_seconds: u32,
        enhanced_prompt: Option<String>,
    },
}

impl CreativeContent {
    pub fn creative_type(&self) -> CreativeType {
        match self {
            Self::Text { .. } => CreativeType::Text,
            Self::Image { .. } => CreativeType::Image,
            Self::Video { .. } => CreativeType::Video,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentData {
    pub content: CreativeContent,
    pub model_used: String,
    pub generated_at: DateTime<Utc>,
}

/// Performance snapshot fed by the reporting pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub spend: f64,
    /// Attributed conversion value.
    #[serde(default)]
    pub revenue: f64,
    pub ctr: f64,
    pub conversion_rate: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creative {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub kind: CreativeType,
    pub source_prompt: String,
    pub status: CreativeStatus,
    pub content: Option<ContentData>,
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub performance: PerformanceMetrics,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-campaign daily performance bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyMetricRecord {
    pub campaign_id: Uuid,
    pub date: NaiveDate,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub spend: f64,
    #[serde(default)]
    pub revenue: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_campaign_lifecycle_transitions() {
        use CampaignStatus::*;
        assert!(Draft.can_transition_to(Active));
        assert!(Active.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Active));
        assert!(Paused.can_transition_to(Completed));
        assert!(!Draft.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Active));
    }

    #[test]
    fn test_content_is_tagged_by_type() {
        let content = CreativeContent::Video {
            video_url: "https://cdn.example.com/v.mp4".into(),
            duration_seconds: 15,
            enhanced_prompt: None,
        };
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["type"], "video");
        assert_eq!(content.creative_type(), CreativeType::Video);
    }

    #[test]
    fn test_target_audience_descriptor() {
        let audience = TargetAudience {
            age_range: Some("25-34".into()),
            interests: vec!["running".into(), "outdoors".into()],
            ..Default::default()
        };
        assert_eq!(
            audience.describe(),
            "Target: 25-34, any, interests: [running, outdoors], location: any"
        );
    }
}
