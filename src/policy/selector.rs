//! Pure mapping from request classification to a timeout policy kind.
//!
//! # Rules (first match wins)
//! ```text
//! QueryPlan on Document        → ControlPlaneHotPath (unavailable on exhaustion)
//! PartitionKeyRange            → ControlPlaneHotPath (pass-through)
//! read-only                    → Default (unavailable on exhaustion)
//! write                        → Default (pass-through)
//! ```

use crate::policy::classify::{OperationKind, ResourceKind};
use crate::policy::timeout::PolicyKind;

/// Select the policy for a request. Deterministic, no side effects.
pub fn select_policy_kind(
    resource: ResourceKind,
    operation: OperationKind,
    read_only: bool,
) -> PolicyKind {
    if operation == OperationKind::QueryPlan && resource == ResourceKind::Document {
        return PolicyKind::ControlPlaneHotPath {
            unavailable_on_exhaustion: true,
        };
    }

    if resource == ResourceKind::PartitionKeyRange {
        return PolicyKind::ControlPlaneHotPath {
            unavailable_on_exhaustion: false,
        };
    }

    // Metadata and data requests currently resolve to the same policy; the
    // classification is still traced so the split is visible when it changes.
    tracing::trace!(
        resource = %resource,
        operation = %operation,
        is_metadata = is_metadata_request(resource, operation),
        read_only,
        "Selecting default timeout policy"
    );

    PolicyKind::Default {
        unavailable_on_exhaustion: read_only,
    }
}

/// True for requests against anything other than document data, except the
/// execution of a stored procedure's script.
pub fn is_metadata_request(resource: ResourceKind, operation: OperationKind) -> bool {
    let executes_script = resource == ResourceKind::StoredProcedure
        && operation == OperationKind::ExecuteStoredProcedure;
    resource != ResourceKind::Document && !executes_script
}

/// Gateway V2 policy for an operation, if the operation has one.
pub fn gateway_v2_kind(operation: OperationKind) -> Option<PolicyKind> {
    match operation {
        OperationKind::Read => Some(PolicyKind::GatewayV2PointRead),
        OperationKind::Query | OperationKind::ReadFeed => {
            Some(PolicyKind::GatewayV2QueryOrChangeFeed)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOT_THROW: PolicyKind = PolicyKind::ControlPlaneHotPath {
        unavailable_on_exhaustion: true,
    };
    const HOT_PASS: PolicyKind = PolicyKind::ControlPlaneHotPath {
        unavailable_on_exhaustion: false,
    };
    const DEFAULT_THROW: PolicyKind = PolicyKind::Default {
        unavailable_on_exhaustion: true,
    };
    const DEFAULT_PASS: PolicyKind = PolicyKind::Default {
        unavailable_on_exhaustion: false,
    };

    #[test]
    fn query_plan_on_documents_uses_hot_path() {
        assert_eq!(
            select_policy_kind(ResourceKind::Document, OperationKind::QueryPlan, true),
            HOT_THROW
        );
        // The read/write flag does not matter for this rule.
        assert_eq!(
            select_policy_kind(ResourceKind::Document, OperationKind::QueryPlan, false),
            HOT_THROW
        );
    }

    #[test]
    fn query_plan_on_other_resources_falls_through() {
        assert_eq!(
            select_policy_kind(ResourceKind::DocumentCollection, OperationKind::QueryPlan, true),
            DEFAULT_THROW
        );
    }

    #[test]
    fn partition_key_ranges_use_hot_path_without_unavailability() {
        for op in [OperationKind::ReadFeed, OperationKind::Read, OperationKind::Create] {
            assert_eq!(
                select_policy_kind(ResourceKind::PartitionKeyRange, op, op.is_read_only()),
                HOT_PASS
            );
        }
    }

    #[test]
    fn reads_and_writes_split_the_default_policy() {
        let cases = [
            (ResourceKind::Document, OperationKind::Read, true, DEFAULT_THROW),
            (ResourceKind::Database, OperationKind::Read, true, DEFAULT_THROW),
            (ResourceKind::Document, OperationKind::Create, false, DEFAULT_PASS),
            (ResourceKind::DocumentCollection, OperationKind::Replace, false, DEFAULT_PASS),
            (
                ResourceKind::StoredProcedure,
                OperationKind::ExecuteStoredProcedure,
                false,
                DEFAULT_PASS,
            ),
        ];
        for (resource, operation, read_only, expected) in cases {
            assert_eq!(
                select_policy_kind(resource, operation, read_only),
                expected,
                "{resource}/{operation}"
            );
        }
    }

    #[test]
    fn metadata_predicate_truth_table() {
        assert!(!is_metadata_request(ResourceKind::Document, OperationKind::Read));
        assert!(!is_metadata_request(ResourceKind::Document, OperationKind::QueryPlan));
        assert!(is_metadata_request(ResourceKind::DocumentCollection, OperationKind::Read));
        assert!(is_metadata_request(ResourceKind::PartitionKeyRange, OperationKind::ReadFeed));
        assert!(is_metadata_request(ResourceKind::StoredProcedure, OperationKind::Create));
        assert!(!is_metadata_request(
            ResourceKind::StoredProcedure,
            OperationKind::ExecuteStoredProcedure
        ));
    }

    #[test]
    fn gateway_v2_kinds() {
        assert_eq!(gateway_v2_kind(OperationKind::Read), Some(PolicyKind::GatewayV2PointRead));
        assert_eq!(
            gateway_v2_kind(OperationKind::Query),
            Some(PolicyKind::GatewayV2QueryOrChangeFeed)
        );
        assert_eq!(
            gateway_v2_kind(OperationKind::ReadFeed),
            Some(PolicyKind::GatewayV2QueryOrChangeFeed)
        );
        assert_eq!(gateway_v2_kind(OperationKind::Create), None);
    }
}
