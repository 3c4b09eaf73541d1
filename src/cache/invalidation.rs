//! Cache invalidation triggered by upstream data changes
//!
//! Invalidation is namespace-wide. Keys are digests of the producer's
//! arguments, so there is no way to find the entries derived from one
//! employee; an update to that employee clears every namespace whose results
//! could have depended on it.

use crate::cache::{manager::CacheManager, types::Namespace};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Namespaces whose results depend on an employee's profile
pub const EMPLOYEE_DEPENDENT: [Namespace; 5] = [
    Namespace::RoleMatch,
    Namespace::Leadership,
    Namespace::Roadmap,
    Namespace::Narrative,
    Namespace::AiResponse,
];

/// Namespaces whose results depend on the role catalogue
pub const ROLE_DEPENDENT: [Namespace; 2] = [Namespace::RoleMatch, Namespace::Roadmap];

/// Reason for cache invalidation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvalidationReason {
    /// Explicit clear of one namespace
    Manual,

    /// An employee profile changed
    EmployeeUpdated { employee_id: String },

    /// Role definitions changed
    RoleDataChanged,
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidationReason::Manual => write!(f, "manual invalidation"),
            InvalidationReason::EmployeeUpdated { employee_id } => {
                write!(f, "employee updated: {}", employee_id)
            }
            InvalidationReason::RoleDataChanged => write!(f, "role data changed"),
        }
    }
}

/// Record of one invalidation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationEvent {
    pub reason: InvalidationReason,

    /// Namespaces that were cleared
    pub namespaces: Vec<Namespace>,

    pub timestamp: DateTime<Utc>,
}

impl InvalidationEvent {
    pub fn new(reason: InvalidationReason, namespaces: Vec<Namespace>) -> Self {
        Self {
            reason,
            namespaces,
            timestamp: Utc::now(),
        }
    }

    pub fn covers(&self, namespace: Namespace) -> bool {
        self.namespaces.contains(&namespace)
    }
}

impl CacheManager {
    /// Clear an entire namespace
    pub async fn invalidate(&self, namespace: Namespace) -> InvalidationEvent {
        self.clear_namespaces(InvalidationReason::Manual, &[namespace])
            .await
    }

    /// Clear everything that may have been derived from one employee
    pub async fn invalidate_employee(&self, employee_id: &str) -> InvalidationEvent {
        let reason = InvalidationReason::EmployeeUpdated {
            employee_id: employee_id.to_string(),
        };
        self.clear_namespaces(reason, &EMPLOYEE_DEPENDENT).await
    }

    /// Clear everything that may have been derived from role definitions
    pub async fn invalidate_roles(&self) -> InvalidationEvent {
        self.clear_namespaces(InvalidationReason::RoleDataChanged, &ROLE_DEPENDENT)
            .await
    }

    async fn clear_namespaces(
        &self,
        reason: InvalidationReason,
        namespaces: &[Namespace],
    ) -> InvalidationEvent {
        for namespace in namespaces {
            self.clear(Some(*namespace)).await;
        }

        let event = InvalidationEvent::new(reason, namespaces.to_vec());
        info!(
            "Invalidated {} namespace(s) ({}): {:?}",
            event.namespaces.len(),
            event.reason,
            event.namespaces
        );
        event
    }
}
