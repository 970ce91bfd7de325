// src/domain/schedule.rs
use crate::domain::models::ChangeRequest;
use crate::domain::status::LifecycleStatus;
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

/// Hours ahead of start at which a priority change starts alerting.
pub const PRIORITY_ALERT_HOURS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeWindow {
    Upcoming,
    Open,
    Closed,
}

impl ChangeWindow {
    pub fn of(cr: &ChangeRequest, now: NaiveDateTime) -> Self {
        if now < cr.start_time {
            ChangeWindow::Upcoming
        } else if now <= cr.end_time {
            ChangeWindow::Open
        } else {
            ChangeWindow::Closed
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChangeWindow::Upcoming => "Upcoming",
            ChangeWindow::Open => "Window open",
            ChangeWindow::Closed => "Window closed",
        }
    }
}

/// Active P1/Emergency change starting within the alert horizon, or already
/// past its start.
pub fn needs_priority_alert(cr: &ChangeRequest, now: NaiveDateTime) -> bool {
    cr.change_type.is_priority()
        && cr.status == LifecycleStatus::Active
        && cr.start_time - now <= Duration::hours(PRIORITY_ALERT_HOURS)
}

pub fn priority_alerts<'a, I>(requests: I, now: NaiveDateTime) -> Vec<&'a ChangeRequest>
where
    I: IntoIterator<Item = &'a ChangeRequest>,
{
    let mut out: Vec<&ChangeRequest> = requests
        .into_iter()
        .filter(|cr| needs_priority_alert(cr, now))
        .collect();
    out.sort_by_key(|cr| cr.start_time);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::status::ChangeType;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 20)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn cr(change_type: ChangeType, start: NaiveDateTime) -> ChangeRequest {
        ChangeRequest {
            id: 1,
            change_id: "CR-2024-010".into(),
            title: "Patch".into(),
            description: None,
            change_type,
            status: LifecycleStatus::Active,
            start_time: start,
            end_time: start + Duration::hours(1),
            manager_id: 1,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn window_transitions() {
        let c = cr(ChangeType::Standard, at(10, 0));
        assert_eq!(ChangeWindow::of(&c, at(9, 59)), ChangeWindow::Upcoming);
        assert_eq!(ChangeWindow::of(&c, at(10, 0)), ChangeWindow::Open);
        assert_eq!(ChangeWindow::of(&c, at(11, 0)), ChangeWindow::Open);
        assert_eq!(ChangeWindow::of(&c, at(11, 1)), ChangeWindow::Closed);
    }

    #[test]
    fn alerts_only_for_priority_changes_near_start() {
        let now = at(8, 0);
        let soon = cr(ChangeType::P1, at(9, 30));
        let overdue = cr(ChangeType::Emergency, at(7, 0));
        let later = cr(ChangeType::P1, at(10, 1));
        let routine = cr(ChangeType::Standard, at(8, 30));
        let mut cancelled = cr(ChangeType::P1, at(8, 30));
        cancelled.status = LifecycleStatus::Cancelled;

        let all = [soon.clone(), overdue.clone(), later, routine, cancelled];
        let alerts = priority_alerts(&all, now);
        assert_eq!(alerts, vec![&overdue, &soon]);
    }
}
