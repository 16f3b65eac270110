//! Campaigns, creatives and the creative-generation workflow.
//!
//! Generation itself is delegated to a [`CreativeGenerator`] collaborator;
//! this crate owns the state machine, admission and usage accounting around it.

#![warn(clippy::unwrap_used)]

pub mod campaigns;
pub mod generator;
pub mod orchestrator;
pub mod sweeper;

pub use campaigns::{CampaignService, NewCampaign, PerformanceUpdate};
pub use generator::{
    CreativeGenerator, GeneratedCreative, GenerationContext, GenerationRequest, SimulatedGenerator,
};
pub use orchestrator::{CreativeOrchestrator, CreativeParams, GenerateCreative};
pub use sweeper::OrphanSweeper;
