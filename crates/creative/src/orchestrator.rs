//! Creative generation workflow.
//!
//! 1. load the campaign
//! 2. insert the creative as `generating`
//! 3. reserve `creative` + `ai_generation` capacity (denial fails the creative)
//! 4. call the generator under a timeout
//! 5. complete the creative and commit the reservation, or fail it and release
//!
//! Steps 4 and 5 run on a spawned task, so a caller that goes away mid-call
//! does not strand the creative in `generating` or leak the reservation.

use crate::generator::{CreativeGenerator, GenerationContext, GenerationRequest};
use adgenius_billing::{Reservation, UsageMeter};
use adgenius_core::billing::ResourceType;
use adgenius_core::campaign::{
    Campaign, ContentData, Creative, CreativeContent, CreativeStatus, CreativeType, PerformanceMetrics,
};
use adgenius_core::config::GenerationConfig;
use adgenius_core::{AdGeniusError, AdGeniusResult};
use adgenius_store::CreativeTransition;
use adgenius_tenancy::TenantContext;
use anyhow::anyhow;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const MAX_VIDEO_SECONDS: u32 = 120;

fn default_image_aspect_ratio() -> String {
    "1:1".to_string()
}
fn default_video_aspect_ratio() -> String {
    "16:9".to_string()
}
fn default_video_duration() -> u32 {
    15
}

/// Type-specific generation parameters supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CreativeParams {
    Text {
        #[serde(default)]
        max_length: Option<usize>,
    },
    Image {
        #[serde(default = "default_image_aspect_ratio")]
        aspect_ratio: String,
    },
    Video {
        #[serde(default = "default_video_aspect_ratio")]
        aspect_ratio: String,
        #[serde(default = "default_video_duration")]
        duration_seconds: u32,
    },
}

impl CreativeParams {
    pub fn creative_type(&self) -> CreativeType {
        match self {
            Self::Text { .. } => CreativeType::Text,
            Self::Image { .. } => CreativeType::Image,
            Self::Video { .. } => CreativeType::Video,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateCreative {
    pub campaign_id: Uuid,
    pub prompt: String,
    #[serde(default)]
    pub style: Option<String>,
    pub params: CreativeParams,
}

impl GenerateCreative {
    fn validate(&self) -> AdGeniusResult<()> {
        if self.prompt.trim().is_empty() {
            return Err(AdGeniusError::Validation("prompt is required".into()));
        }
        match &self.params {
            CreativeParams::Text { max_length: Some(0) } => {
                Err(AdGeniusError::Validation("max_length must be positive".into()))
            }
            CreativeParams::Video { duration_seconds, .. }
                if *duration_seconds == 0 || *duration_seconds > MAX_VIDEO_SECONDS =>
            {
                Err(AdGeniusError::Validation(format!(
                    "duration_seconds must be between 1 and {MAX_VIDEO_SECONDS}"
                )))
            }
            _ => Ok(()),
        }
    }
}

pub struct CreativeOrchestrator {
    generator: Arc<dyn CreativeGenerator>,
    meter: UsageMeter,
    timeout: Duration,
    text_max_length: usize,
}

impl CreativeOrchestrator {
    pub fn new(generator: Arc<dyn CreativeGenerator>, meter: UsageMeter, config: &GenerationConfig) -> Self {
        Self {
            generator,
            meter,
            timeout: Duration::from_secs(config.timeout_secs),
            text_max_length: config.text_max_length,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn build_request(&self, campaign: &Campaign, request: &GenerateCreative) -> GenerationRequest {
        let brand_guidelines = campaign
            .brand_assets
            .iter()
            .map(|asset| match &asset.url {
                Some(url) => format!("{:?}: {} ({url})", asset.kind, asset.name),
                None => format!("{:?}: {}", asset.kind, asset.name),
            })
            .collect();
        let context = GenerationContext {
            prompt: request.prompt.trim().to_string(),
            style: request.style.clone(),
            brand_guidelines,
            target_audience: campaign.target_audience.describe(),
        };
        match &request.params {
            CreativeParams::Text { max_length } => GenerationRequest::Text {
                context,
                max_length: max_length.unwrap_or(self.text_max_length),
            },
            CreativeParams::Image { aspect_ratio } => GenerationRequest::Image {
                context,
                aspect_ratio: aspect_ratio.clone(),
            },
            CreativeParams::Video {
                aspect_ratio,
                duration_seconds,
            } => GenerationRequest::Video {
                context,
                aspect_ratio: aspect_ratio.clone(),
                duration_seconds: *duration_seconds,
            },
        }
    }

    pub async fn generate_creative(
        &self,
        ctx: &TenantContext,
        request: GenerateCreative,
    ) -> AdGeniusResult<Creative> {
        request.validate()?;
        let campaign = ctx
            .store
            .get_campaign(request.campaign_id)?
            .ok_or(AdGeniusError::CampaignNotFound(request.campaign_id))?;

        let now = Utc::now();
        let creative = Creative {
            id: Uuid::new_v4(),
            campaign_id: campaign.id,
            kind: request.params.creative_type(),
            source_prompt: request.prompt.clone(),
            status: CreativeStatus::Generating,
            content: None,
            failure_reason: None,
            performance: PerformanceMetrics::default(),
            created_at: now,
            updated_at: now,
        };
        let creative_id = creative.id;
        ctx.store.insert_creative(creative)?;

        let reservation = match self.meter.reserve(
            ctx,
            &[(ResourceType::Creative, 1), (ResourceType::AiGeneration, 1)],
        ) {
            Ok(reservation) => reservation,
            Err(e) => {
                fail_creative(ctx, creative_id, e.to_string());
                metrics::counter!("creative.generation.failed", "reason" => "admission").increment(1);
                return Err(e);
            }
        };

        let job = GenerationJob {
            ctx: ctx.clone(),
            generator: self.generator.clone(),
            meter: self.meter.clone(),
            timeout: self.timeout,
            creative_id,
            reservation,
            request: self.build_request(&campaign, &request),
        };
        debug!(
            tenant_id = %ctx.tenant_id(),
            campaign_id = %campaign.id,
            creative_id = %creative_id,
            provider = self.generator.provider_name(),
            "Dispatching creative generation"
        );

        match tokio::spawn(job.run()).await {
            Ok(result) => result,
            Err(e) => {
                error!(creative_id = %creative_id, error = %e, "Generation task aborted");
                Err(AdGeniusError::Internal(anyhow::Error::new(e)))
            }
        }
    }
}

/// Marks the creative failed. A creative that already reached a terminal
/// state is left as is.
fn fail_creative(ctx: &TenantContext, creative_id: Uuid, reason: String) {
    match ctx
        .store
        .transition_creative(creative_id, CreativeTransition::Failed(reason))
    {
        Ok(_) => {}
        Err(AdGeniusError::Conflict(_)) => {
            debug!(creative_id = %creative_id, "Creative already terminal");
        }
        Err(e) => {
            error!(
                tenant_id = %ctx.tenant_id(),
                creative_id = %creative_id,
                error = %e,
                "Failed to mark creative as failed"
            );
        }
    }
}

struct GenerationJob {
    ctx: TenantContext,
    generator: Arc<dyn CreativeGenerator>,
    meter: UsageMeter,
    timeout: Duration,
    creative_id: Uuid,
    reservation: Reservation,
    request: GenerationRequest,
}

impl GenerationJob {
    async fn run(self) -> AdGeniusResult<Creative> {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.generator.generate(&self.request)).await;
        metrics::histogram!("creative.generation.latency_ms")
            .record(started.elapsed().as_secs_f64() * 1000.0);

        let failure = match outcome {
            Ok(Ok(generated)) if generated.content.creative_type() == self.request.creative_type() => {
                return self.complete(generated.content, generated.model_used);
            }
            Ok(Ok(generated)) => anyhow!(
                "generator returned {} content for a {} request",
                generated.content.creative_type().as_str(),
                self.request.creative_type().as_str()
            ),
            Ok(Err(e)) => e,
            Err(_) => {
                metrics::counter!("creative.generation.timeout").increment(1);
                anyhow!("generation timed out after {}s", self.timeout.as_secs_f64())
            }
        };
        Err(self.fail(failure))
    }

    fn complete(
        self,
        content: CreativeContent,
        model_used: String,
    ) -> AdGeniusResult<Creative> {
        let ctx = &self.ctx;
        let transition = CreativeTransition::Completed(ContentData {
            content,
            model_used: model_used.clone(),
            generated_at: Utc::now(),
        });
        let creative = match ctx.store.transition_creative(self.creative_id, transition) {
            Ok(creative) => creative,
            Err(e) => {
                // Swept or otherwise finalized while generating: nothing is charged.
                warn!(creative_id = %self.creative_id, error = %e, "Could not complete creative");
                if let Err(release_err) = self.meter.release(ctx, self.reservation) {
                    error!(creative_id = %self.creative_id, error = %release_err, "Failed to release reservation");
                }
                return Err(e);
            }
        };

        if let Err(e) = self.meter.commit(ctx, self.reservation, Some(self.creative_id)) {
            error!(
                tenant_id = %ctx.tenant_id(),
                creative_id = %self.creative_id,
                error = %e,
                "Usage commit failed after generation"
            );
            return Err(e);
        }

        metrics::counter!("creative.generation.completed", "type" => creative.kind.as_str()).increment(1);
        info!(
            tenant_id = %ctx.tenant_id(),
            campaign_id = %creative.campaign_id,
            creative_id = %creative.id,
            model = %model_used,
            "Creative generated"
        );
        Ok(creative)
    }

    fn fail(self, cause: anyhow::Error) -> AdGeniusError {
        let ctx = &self.ctx;
        if let Err(e) = self.meter.release(ctx, self.reservation) {
            error!(creative_id = %self.creative_id, error = %e, "Failed to release reservation");
        }
        fail_creative(ctx, self.creative_id, cause.to_string());
        metrics::counter!("creative.generation.failed", "reason" => "engine").increment(1);
        warn!(
            tenant_id = %ctx.tenant_id(),
            creative_id = %self.creative_id,
            error = %cause,
            "Creative generation failed"
        );
        AdGeniusError::ai_engine(cause)
    }
}
