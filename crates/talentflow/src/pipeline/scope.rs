use serde::Serialize;

use super::domain::{Operator, OperatorId, OperatorRole};
use super::store::{CandidateQuery, JobQuery};

/// Read restriction derived from the operator's role.
///
/// Resolved once per load and threaded explicitly into the loader, job catalog and stats
/// queries; no component inspects the role on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "owner", rename_all = "snake_case")]
pub enum AccessScope {
    /// Only records whose owning tenant is this operator.
    Owned(OperatorId),
    /// Cross-tenant visibility.
    Global,
}

impl AccessScope {
    pub fn resolve(operator: &Operator) -> Self {
        match operator.role {
            OperatorRole::Administrator => Self::Global,
            OperatorRole::Owner => Self::Owned(operator.id.clone()),
        }
    }

    pub fn restrict_to_owner(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    pub fn owner(&self) -> Option<&OperatorId> {
        match self {
            Self::Owned(owner) => Some(owner),
            Self::Global => None,
        }
    }

    pub fn permits(&self, owner: &OperatorId) -> bool {
        self.owner().map_or(true, |scoped| scoped == owner)
    }

    pub fn candidate_query(&self) -> CandidateQuery {
        CandidateQuery {
            owner: self.owner().cloned(),
            ..CandidateQuery::default()
        }
    }

    pub fn job_query(&self) -> JobQuery {
        JobQuery {
            owner: self.owner().cloned(),
            ..JobQuery::default()
        }
    }
}
