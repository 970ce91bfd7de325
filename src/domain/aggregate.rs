// src/domain/aggregate.rs

//! Status aggregation over the per-application validation records of a
//! change request.
//!
//! Two aggregations live here and are reported separately:
//! - the *effective/overall* status (`effective_status`, `overall_status`),
//!   which drives the change-request badge and the `status` list filter;
//! - the coarser per-side summary (`side_summary`), used for the
//!   "Pre-Change: N/M" style columns.
//!
//! Only `completed` counts toward completion. `not_applicable` and `failed`
//! never satisfy it.

use crate::domain::models::ValidationRecord;
use crate::domain::status::{Side, ValidationStatus};
use chrono::NaiveDateTime;
use serde::Serialize;

/// Status of one attached application, derived from its pre/post pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveStatus {
    Pending,
    InProgress,
    Completed,
}

impl EffectiveStatus {
    pub fn label(self) -> &'static str {
        match self {
            EffectiveStatus::Pending => "Pending",
            EffectiveStatus::InProgress => "In Progress",
            EffectiveStatus::Completed => "Completed",
        }
    }
}

/// Validation aggregate for a whole change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    NoApplications,
    Pending,
    InProgress,
    Completed,
}

impl OverallStatus {
    pub const ALL: &'static [OverallStatus] = &[
        OverallStatus::NoApplications,
        OverallStatus::Pending,
        OverallStatus::InProgress,
        OverallStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OverallStatus::NoApplications => "no_applications",
            OverallStatus::Pending => "pending",
            OverallStatus::InProgress => "in_progress",
            OverallStatus::Completed => "completed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OverallStatus::NoApplications => "No Applications",
            OverallStatus::Pending => "Pending",
            OverallStatus::InProgress => "In Progress",
            OverallStatus::Completed => "Completed",
        }
    }

    /// Accepts the snake_case spelling or the display label, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        let wanted = raw.trim().to_lowercase();
        OverallStatus::ALL.iter().copied().find(|s| {
            s.as_str() == wanted || s.label().to_lowercase() == wanted
        })
    }
}

pub fn effective_status(pre: ValidationStatus, post: ValidationStatus) -> EffectiveStatus {
    use crate::domain::status::ValidationStatus::*;

    if pre == Completed && post == Completed {
        EffectiveStatus::Completed
    } else if pre == InProgress || post == InProgress {
        EffectiveStatus::InProgress
    } else {
        EffectiveStatus::Pending
    }
}

pub fn record_status(record: &ValidationRecord) -> EffectiveStatus {
    effective_status(record.pre_status, record.post_status)
}

/// Priority chain: empty, then all-completed, then any-in-progress, else pending.
pub fn overall_status<I>(statuses: I) -> OverallStatus
where
    I: IntoIterator<Item = EffectiveStatus>,
{
    let mut seen_any = false;
    let mut all_completed = true;
    let mut any_in_progress = false;

    for status in statuses {
        seen_any = true;
        match status {
            EffectiveStatus::Completed => {}
            EffectiveStatus::InProgress => {
                all_completed = false;
                any_in_progress = true;
            }
            EffectiveStatus::Pending => all_completed = false,
        }
    }

    if !seen_any {
        OverallStatus::NoApplications
    } else if all_completed {
        OverallStatus::Completed
    } else if any_in_progress {
        OverallStatus::InProgress
    } else {
        OverallStatus::Pending
    }
}

pub fn aggregate_records<'a, I>(records: I) -> OverallStatus
where
    I: IntoIterator<Item = &'a ValidationRecord>,
{
    overall_status(records.into_iter().map(record_status))
}

/// Share of applications whose pre (resp. post) side is `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRatio {
    pub pre: f64,
    pub post: f64,
}

pub fn completion_ratio<'a, I>(records: I) -> CompletionRatio
where
    I: IntoIterator<Item = &'a ValidationRecord>,
{
    let mut total = 0usize;
    let mut pre_done = 0usize;
    let mut post_done = 0usize;

    for r in records {
        total += 1;
        if r.pre_status == ValidationStatus::Completed {
            pre_done += 1;
        }
        if r.post_status == ValidationStatus::Completed {
            post_done += 1;
        }
    }

    if total == 0 {
        return CompletionRatio { pre: 0.0, post: 0.0 };
    }

    CompletionRatio {
        pre: pre_done as f64 / total as f64,
        post: post_done as f64 / total as f64,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SideLabel {
    #[serde(rename = "N/A")]
    NotApplicable,
    Pending,
    InProgress,
    Completed,
}

impl SideLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            SideLabel::NotApplicable => "N/A",
            SideLabel::Pending => "Pending",
            SideLabel::InProgress => "In Progress",
            SideLabel::Completed => "Completed",
        }
    }
}

/// "Pre-Change: N/M" style summary of one side across all applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SideSummary {
    pub completed: usize,
    pub not_applicable: usize,
    pub total: usize,
    pub label: SideLabel,
}

impl SideSummary {
    pub fn applicable(&self) -> usize {
        self.total - self.not_applicable
    }
}

pub fn side_summary<'a, I>(records: I, side: Side) -> SideSummary
where
    I: IntoIterator<Item = &'a ValidationRecord>,
{
    let mut completed = 0;
    let mut not_applicable = 0;
    let mut total = 0;

    for r in records {
        total += 1;
        match r.status(side) {
            ValidationStatus::Completed => completed += 1,
            ValidationStatus::NotApplicable => not_applicable += 1,
            _ => {}
        }
    }

    let applicable = total - not_applicable;
    let label = if applicable == 0 {
        SideLabel::NotApplicable
    } else if completed == 0 {
        SideLabel::Pending
    } else if completed == applicable {
        SideLabel::Completed
    } else {
        SideLabel::InProgress
    };

    SideSummary {
        completed,
        not_applicable,
        total,
        label,
    }
}

/// Latest pre/post update once every application is completed.
pub fn completion_date<'a, I>(records: I) -> Option<NaiveDateTime>
where
    I: IntoIterator<Item = &'a ValidationRecord> + Clone,
{
    if aggregate_records(records.clone()) != OverallStatus::Completed {
        return None;
    }
    records
        .into_iter()
        .flat_map(|r| [r.pre_updated_at, r.post_updated_at])
        .flatten()
        .max()
}

/// Everything derived for one change request, serialized next to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub overall: OverallStatus,
    pub completion: CompletionRatio,
    pub pre_summary: SideSummary,
    pub post_summary: SideSummary,
    pub completed_at: Option<NaiveDateTime>,
}

pub fn status_report<'a, I>(records: I) -> StatusReport
where
    I: IntoIterator<Item = &'a ValidationRecord> + Clone,
{
    StatusReport {
        overall: aggregate_records(records.clone()),
        completion: completion_ratio(records.clone()),
        pre_summary: side_summary(records.clone(), Side::Pre),
        post_summary: side_summary(records.clone(), Side::Post),
        completed_at: completion_date(records),
    }
}
