//! Immutable registry of the process-wide timeout policies.

use std::time::Duration;

use crate::config::PolicyConfig;
use crate::http::LogicalRequest;
use crate::policy::classify::{OperationKind, ResourceKind};
use crate::policy::selector::{gateway_v2_kind, select_policy_kind};
use crate::policy::timeout::{PolicyKind, TimeoutPolicy};

/// One `TimeoutPolicy` per [`PolicyKind`], built once and shared by reference.
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    policies: Vec<TimeoutPolicy>,
    maximum_retry_time_limit: Duration,
}

impl PolicyRegistry {
    pub fn new(config: &PolicyConfig) -> Self {
        let limit = config.max_retry_time_limit();
        let policies = PolicyKind::ALL
            .into_iter()
            .map(|kind| TimeoutPolicy::new(kind, limit))
            .collect();
        Self {
            policies,
            maximum_retry_time_limit: limit,
        }
    }

    pub fn get(&self, kind: PolicyKind) -> &TimeoutPolicy {
        &self.policies[kind.index()]
    }

    /// Policy for a request classification (see `selector`).
    pub fn select(
        &self,
        resource: ResourceKind,
        operation: OperationKind,
        read_only: bool,
    ) -> &TimeoutPolicy {
        self.get(select_policy_kind(resource, operation, read_only))
    }

    /// Policy for a logical request: its assigned policy, or the selected one.
    pub fn for_request(&self, request: &LogicalRequest) -> &TimeoutPolicy {
        match request.assigned_policy() {
            Some(kind) => self.get(kind),
            None => self.select(
                request.resource_kind(),
                request.operation_kind(),
                request.is_read_only(),
            ),
        }
    }

    pub fn gateway_v2(&self, operation: OperationKind) -> Option<&TimeoutPolicy> {
        gateway_v2_kind(operation).map(|kind| self.get(kind))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeoutPolicy> {
        self.policies.iter()
    }

    pub fn maximum_retry_time_limit(&self) -> Duration {
        self.maximum_retry_time_limit
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::new(&PolicyConfig::default())
    }
}
