//! Collection layout created in every isolated tenant database.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSpec {
    pub field: &'static str,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionSpec {
    pub name: &'static str,
    pub indexes: Vec<IndexSpec>,
}

impl CollectionSpec {
    /// Owner-key index plus creation-timestamp-descending index.
    fn owned(name: &'static str, owner_field: &'static str, created_field: &'static str) -> Self {
        Self {
            name,
            indexes: vec![
                IndexSpec {
                    field: owner_field,
                    descending: false,
                },
                IndexSpec {
                    field: created_field,
                    descending: true,
                },
            ],
        }
    }
}

pub const CAMPAIGNS: &str = "campaigns";
pub const CREATIVES: &str = "creatives";
pub const DAILY_METRICS: &str = "daily_metrics";
pub const USAGE: &str = "usage";
pub const SUBSCRIPTIONS: &str = "subscriptions";
pub const INVOICES: &str = "invoices";
pub const BILLING_EVENTS: &str = "billing_events";

pub fn tenant_collections() -> Vec<CollectionSpec> {
    vec![
        CollectionSpec::owned(CAMPAIGNS, "owner_id", "created_at"),
        CollectionSpec::owned(CREATIVES, "campaign_id", "created_at"),
        CollectionSpec::owned(DAILY_METRICS, "campaign_id", "date"),
        CollectionSpec::owned(USAGE, "tenant_id", "timestamp"),
        CollectionSpec::owned(SUBSCRIPTIONS, "tenant_id", "created_at"),
        CollectionSpec::owned(INVOICES, "tenant_id", "issued_at"),
        CollectionSpec::owned(BILLING_EVENTS, "tenant_id", "created_at"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_collection_has_owner_and_recency_index() {
        let specs = tenant_collections();
        assert_eq!(specs.len(), 7);
        for spec in specs {
            assert_eq!(spec.indexes.len(), 2, "{}", spec.name);
            assert!(!spec.indexes[0].descending);
            assert!(spec.indexes[1].descending);
        }
    }
}
