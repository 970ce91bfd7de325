// src/domain/stats.rs
use crate::domain::aggregate::{aggregate_records, OverallStatus};
use crate::domain::models::{ChangeRequestDetail, OwnerAssignment};
use crate::domain::status::{LifecycleStatus, ValidationStatus};
use chrono::NaiveDate;
use serde::Serialize;

/// Counts for the change manager dashboard header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub no_applications: usize,
}

pub fn manager_stats<'a, I>(details: I) -> ManagerStats
where
    I: IntoIterator<Item = &'a ChangeRequestDetail>,
{
    let mut stats = ManagerStats::default();
    for d in details {
        stats.total += 1;
        if d.change_request.status == LifecycleStatus::Active {
            stats.active += 1;
        }
        match aggregate_records(d.records()) {
            OverallStatus::Completed => stats.completed += 1,
            OverallStatus::InProgress => stats.in_progress += 1,
            OverallStatus::Pending => stats.pending += 1,
            OverallStatus::NoApplications => stats.no_applications += 1,
        }
    }
    stats
}

/// Counts for the application owner work list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerStats {
    /// Records in active change requests.
    pub total: usize,
    /// Records with a side still pending or in progress.
    pub pending: usize,
    /// Records with a side marked completed on `today`.
    pub completed_today: usize,
}

pub fn owner_stats<'a, I>(assignments: I, today: NaiveDate) -> OwnerStats
where
    I: IntoIterator<Item = &'a OwnerAssignment>,
{
    let open = |s: ValidationStatus| matches!(s, ValidationStatus::Pending | ValidationStatus::InProgress);

    let mut stats = OwnerStats::default();
    for a in assignments {
        let r = &a.record;

        if a.change_request.status == LifecycleStatus::Active {
            stats.total += 1;
            if open(r.pre_status) || open(r.post_status) {
                stats.pending += 1;
            }
        }

        let pre_today = r.pre_status == ValidationStatus::Completed
            && r.pre_updated_at.map(|t| t.date()) == Some(today);
        let post_today = r.post_status == ValidationStatus::Completed
            && r.post_updated_at.map(|t| t.date()) == Some(today);
        if pre_today || post_today {
            stats.completed_today += 1;
        }
    }
    stats
}
