//! Sharing grants.
//!
//! A [`SharingGrant`] captures which activity kinds a counterpart user has
//! been given access to. The sync engine consumes it purely as a fetch
//! filter; granting and revoking access is a cloud-layer concern.

use crate::ActivityKind;
use serde::{Deserialize, Serialize};

/// Which activity kinds a reconciliation pass may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindFilter {
    /// Fetch both kinds, unfiltered.
    All,
    /// Fetch only the given kind.
    Only(ActivityKind),
    /// Nothing is shared; fetch no records at all.
    NoneShared,
}

impl KindFilter {
    /// The per-query filter to pass to the stores, if any records should be
    /// fetched at all.
    #[must_use]
    pub fn query_filter(self) -> Option<Option<ActivityKind>> {
        match self {
            KindFilter::All => Some(None),
            KindFilter::Only(kind) => Some(Some(kind)),
            KindFilter::NoneShared => None,
        }
    }
}

/// Per-kind sharing status between a data owner and a counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharingGrant {
    /// Whether intervention-kind data is shared.
    pub interventions_shared: bool,
    /// Whether assessment-kind data is shared.
    pub assessments_shared: bool,
}

impl SharingGrant {
    /// Creates a grant.
    pub fn new(interventions_shared: bool, assessments_shared: bool) -> Self {
        Self {
            interventions_shared,
            assessments_shared,
        }
    }

    /// The fetch filter this grant permits.
    #[must_use]
    pub fn kind_filter(&self) -> KindFilter {
        match (self.interventions_shared, self.assessments_shared) {
            (true, true) => KindFilter::All,
            (true, false) => KindFilter::Only(ActivityKind::Intervention),
            (false, true) => KindFilter::Only(ActivityKind::Assessment),
            (false, false) => KindFilter::NoneShared,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_maps_grant_combinations() {
        assert_eq!(SharingGrant::new(true, true).kind_filter(), KindFilter::All);
        assert_eq!(
            SharingGrant::new(true, false).kind_filter(),
            KindFilter::Only(ActivityKind::Intervention)
        );
        assert_eq!(
            SharingGrant::new(false, true).kind_filter(),
            KindFilter::Only(ActivityKind::Assessment)
        );
        assert_eq!(
            SharingGrant::new(false, false).kind_filter(),
            KindFilter::NoneShared
        );
    }

    #[test]
    fn query_filter_distinguishes_unfiltered_from_none() {
        assert_eq!(KindFilter::All.query_filter(), Some(None));
        assert_eq!(
            KindFilter::Only(ActivityKind::Assessment).query_filter(),
            Some(Some(ActivityKind::Assessment))
        );
        assert_eq!(KindFilter::NoneShared.query_filter(), None);
    }
}
