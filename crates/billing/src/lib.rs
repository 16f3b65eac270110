//! Subscriptions, usage metering and invoicing for AdGenius.
//!
//! Usage counters live on the tenant's active subscription document and are
//! only ever changed through a single atomic update of that document.

#![warn(clippy::unwrap_used)]

pub mod billing;
pub mod metering;
pub mod onboarding;
pub mod plans;

pub use billing::BillingEngine;
pub use metering::{Reservation, UsageMeter, MAX_USAGE_QUANTITY};
pub use onboarding::OnboardingEngine;
pub use plans::PlanCatalog;
