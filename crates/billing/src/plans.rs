//! Built-in plan catalog.

use adgenius_core::billing::{BillingInterval, OverageRates, Plan, PlanLimits, UNLIMITED};
use adgenius_core::{AdGeniusError, AdGeniusResult};
use std::collections::BTreeMap;

pub struct PlanCatalog {
    plans: BTreeMap<String, Plan>,
}

impl PlanCatalog {
    pub fn builtin(currency: &str) -> Self {
        let rates = OverageRates {
            campaign: 5.0,
            creative: 0.50,
            ai_generation: 0.10,
            api_call: 0.001,
            user: 10.0,
            storage_mb: 0.0005,
        };
        let plan = |id: &str, name: &str, description: &str, price: f64, limits: PlanLimits, features: &[&str]| Plan {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            price,
            currency: currency.to_string(),
            interval: BillingInterval::Monthly,
            limits,
            overage_rates: rates.clone(),
            features: features.iter().map(|f| f.to_string()).collect(),
        };

        let plans = [
            plan(
                "starter",
                "Starter",
                "Small businesses getting started with AI advertising",
                29.99,
                PlanLimits {
                    campaigns: 5,
                    creatives_per_month: 50,
                    ai_generations_per_month: 100,
                    storage_mb: 1024,
                    api_calls_per_month: 1000,
                    users: 2,
                    advanced_analytics: false,
                    priority_support: false,
                    white_label: false,
                },
                &["basic_analytics", "email_support"],
            ),
            plan(
                "professional",
                "Professional",
                "Growing teams that need advanced features",
                99.99,
                PlanLimits {
                    campaigns: 25,
                    creatives_per_month: 500,
                    ai_generations_per_month: 1000,
                    storage_mb: 10 * 1024,
                    api_calls_per_month: 10_000,
                    users: 10,
                    advanced_analytics: true,
                    priority_support: true,
                    white_label: false,
                },
                &["advanced_analytics", "priority_support", "api_access"],
            ),
            plan(
                "enterprise",
                "Enterprise",
                "Large organizations with custom needs",
                299.99,
                PlanLimits {
                    campaigns: UNLIMITED,
                    creatives_per_month: UNLIMITED,
                    ai_generations_per_month: UNLIMITED,
                    storage_mb: 100 * 1024,
                    api_calls_per_month: 100_000,
                    users: UNLIMITED,
                    advanced_analytics: true,
                    priority_support: true,
                    white_label: true,
                },
                &[
                    "advanced_analytics",
                    "white_label",
                    "dedicated_support",
                    "custom_integrations",
                ],
            ),
        ];

        Self {
            plans: plans.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    /// Catalog with extra or overridden plans, mostly for tests.
    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plans.insert(plan.id.clone(), plan);
        self
    }

    pub fn get(&self, plan_id: &str) -> AdGeniusResult<Plan> {
        self.plans
            .get(plan_id)
            .cloned()
            .ok_or_else(|| AdGeniusError::InvalidPlan(plan_id.to_string()))
    }

    pub fn list(&self) -> Vec<Plan> {
        let mut plans: Vec<Plan> = self.plans.values().cloned().collect();
        plans.sort_by(|a, b| a.price.total_cmp(&b.price));
        plans
    }
}
