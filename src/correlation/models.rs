use crate::models::IncidentId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Identifiers of incidents sharing at least one artifact value with a base incident.
///
/// Membership never includes the base incident or a non-positive id; inserting an id
/// already present is a no-op.
#[derive(Debug, Clone)]
pub struct RelatedIncidentSet {
    base_id: IncidentId,
    ids: HashSet<IncidentId>,
}

impl RelatedIncidentSet {
    pub fn new(base_id: IncidentId) -> Self {
        Self {
            base_id,
            ids: HashSet::new(),
        }
    }

    pub fn base_id(&self) -> IncidentId {
        self.base_id
    }

    /// Add an id; returns whether the set changed
    pub fn insert(&mut self, id: IncidentId) -> bool {
        if id <= 0 || id == self.base_id {
            return false;
        }
        self.ids.insert(id)
    }

    pub fn extend<I: IntoIterator<Item = IncidentId>>(&mut self, ids: I) {
        for id in ids {
            self.insert(id);
        }
    }

    pub fn contains(&self, id: IncidentId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ascending order, independent of insertion order
    pub fn into_sorted(self) -> Vec<IncidentId> {
        let mut ids: Vec<_> = self.ids.into_iter().collect();
        ids.sort_unstable();
        ids
    }
}

/// A correlation query skipped under the lenient policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedQuery {
    /// Artifact value that was being searched
    pub value: String,

    /// Failure description
    pub error: String,
}

/// Result of correlating one base incident
#[derive(Debug, Clone)]
pub struct CorrelationOutcome {
    /// Related incident identifiers
    pub related: RelatedIncidentSet,

    /// Number of artifact values searched
    pub queried_values: usize,

    /// Values whose search failed (lenient policy only)
    pub skipped: Vec<SkippedQuery>,

    /// Values whose search hit the page limit
    pub truncated_values: Vec<String>,
}
