//! The external generation collaborator boundary.
//!
//! Each creative type carries its own request shape. Implementations may take
//! an arbitrary amount of wall-clock time; the orchestrator bounds every call
//! with a timeout.

use adgenius_core::campaign::{CreativeContent, CreativeType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Inputs shared by every creative type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationContext {
    pub prompt: String,
    pub style: Option<String>,
    /// Flattened brand assets of the owning campaign.
    pub brand_guidelines: Vec<String>,
    pub target_audience: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationRequest {
    Text {
        context: GenerationContext,
        max_length: usize,
    },
    Image {
        context: GenerationContext,
        aspect_ratio: String,
    },
    Video {
        context: GenerationContext,
        aspect_ratio: String,
        duration_seconds: u32,
    },
}

impl GenerationRequest {
    pub fn creative_type(&self) -> CreativeType {
        match self {
            Self::Text { .. } => CreativeType::Text,
            Self::Image { .. } => CreativeType::Image,
            Self::Video { .. } => CreativeType::Video,
        }
    }

    pub fn context(&self) -> &GenerationContext {
        match self {
            Self::Text { context, .. } | Self::Image { context, .. } | Self::Video { context, .. } => context,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedCreative {
    pub content: CreativeContent,
    pub model_used: String,
}

/// Creative-generation engine.
#[async_trait]
pub trait CreativeGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<GeneratedCreative>;

    /// Identifier used in logs.
    fn provider_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Simulated generator
// ---------------------------------------------------------------------------

/// Development stand-in that answers every request locally after a fixed delay.
pub struct SimulatedGenerator {
    latency: Duration,
    cdn_base: String,
}

impl SimulatedGenerator {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            cdn_base: "https://cdn.adgenius.local/generated".to_string(),
        }
    }

    fn enhance(context: &GenerationContext) -> String {
        match &context.style {
            Some(style) => format!("{} | style: {} | {}", context.prompt, style, context.target_audience),
            None => format!("{} | {}", context.prompt, context.target_audience),
        }
    }
}

impl Default for SimulatedGenerator {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

#[async_trait]
impl CreativeGenerator for SimulatedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<GeneratedCreative> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let id = Uuid::new_v4();
        let generated = match request {
            GenerationRequest::Text { context, max_length } => {
                let text: String = context.prompt.chars().take(*max_length).collect();
                let headline = context.prompt.split_whitespace().take(6).collect::<Vec<_>>().join(" ");
                GeneratedCreative {
                    content: CreativeContent::Text {
                        text,
                        headline: (!headline.is_empty()).then_some(headline),
                    },
                    model_used: "simulated-text-v1".to_string(),
                }
            }
            GenerationRequest::Image { context, aspect_ratio } => GeneratedCreative {
                content: CreativeContent::Image {
                    image_url: format!("{}/{id}.png", self.cdn_base),
                    aspect_ratio: aspect_ratio.clone(),
                    enhanced_prompt: Some(Self::enhance(context)),
                },
                model_used: "simulated-image-v1".to_string(),
            },
            GenerationRequest::Video {
                context,
                duration_seconds,
                ..
            } => GeneratedCreative {
                content: CreativeContent::Video {
                    video_url: format!("{}/{id}.mp4", self.cdn_base),
                    duration_seconds: *duration_seconds,
                    enhanced_prompt: Some(Self::enhance(context)),
                },
                model_used: "simulated-video-v1".to_string(),
            },
        };
        Ok(generated)
    }

    fn provider_name(&self) -> &str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(prompt: &str) -> GenerationContext {
        GenerationContext {
            prompt: prompt.to_string(),
            style: Some("bold".into()),
            brand_guidelines: Vec::new(),
            target_audience: "Target: any, any, interests: [], location: any".into(),
        }
    }

    #[tokio::test]
    async fn test_simulated_text_respects_max_length() {
        let generator = SimulatedGenerator::new(Duration::ZERO);
        let out = generator
            .generate(&GenerationRequest::Text {
                context: context("Fresh roasted coffee delivered to your door every week"),
                max_length: 12,
            })
            .await
            .unwrap();
        match out.content {
            CreativeContent::Text { text, headline } => {
                assert_eq!(text, "Fresh roaste");
                assert_eq!(headline.as_deref(), Some("Fresh roasted coffee delivered to your"));
            }
            other => panic!("unexpected content {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_simulated_output_matches_request_type() {
        let generator = SimulatedGenerator::new(Duration::ZERO);
        let request = GenerationRequest::Video {
            context: context("launch teaser"),
            aspect_ratio: "9:16".into(),
            duration_seconds: 15,
        };
        let out = generator.generate(&request).await.unwrap();
        assert_eq!(out.content.creative_type(), request.creative_type());
        assert_eq!(out.model_used, "simulated-video-v1");
    }
}
