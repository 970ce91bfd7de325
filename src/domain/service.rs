// src/domain/service.rs

//! Request-level operations: compose the query, load from the injected
//! store, aggregate, authorize. Used by both the JSON API and the HTML pages.

use crate::domain::access::{self, AccessFilter};
use crate::domain::aggregate::{status_report, StatusReport};
use crate::domain::models::{
    Application, AttachedApplication, ChangeRequest, ChangeRequestDetail, NewApplication,
    NewChangeRequest, OwnerAssignment, ValidationUpdate, Viewer,
};
use crate::domain::query::{compose, ListFilters};
use crate::domain::schedule::priority_alerts;
use crate::domain::stats::{manager_stats, owner_stats, ManagerStats, OwnerStats};
use crate::domain::store::ChangeStore;
use crate::errors::ServerError;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::HashSet;

/// A change request as returned to callers: the stored fields, every
/// attached row, and the derived validation report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequestView {
    #[serde(flatten)]
    pub change_request: ChangeRequest,
    pub applications: Vec<AttachedApplication>,
    pub validation: StatusReport,
}

impl From<ChangeRequestDetail> for ChangeRequestView {
    fn from(detail: ChangeRequestDetail) -> Self {
        let validation = status_report(detail.records());
        ChangeRequestView {
            change_request: detail.change_request,
            applications: detail.applications,
            validation,
        }
    }
}

pub struct TrackerService<'s, S: ChangeStore> {
    store: &'s S,
    access: AccessFilter,
}

impl<'s, S: ChangeStore> TrackerService<'s, S> {
    pub fn new(store: &'s S, access: AccessFilter) -> Self {
        Self { store, access }
    }

    fn visible_details(
        &self,
        viewer: &Viewer,
        filters: &ListFilters,
    ) -> Result<Vec<ChangeRequestDetail>, ServerError> {
        let query = compose(&self.access, viewer, filters);
        let candidates = self.store.list_change_requests(&query.store)?;
        // The store already applied the role scope; re-checking keeps a
        // sloppy store from leaking rows.
        let visible = self.access.filter_visible(viewer, candidates);
        Ok(query.finish(visible))
    }

    pub fn list_change_requests(
        &self,
        viewer: &Viewer,
        filters: &ListFilters,
    ) -> Result<Vec<ChangeRequestView>, ServerError> {
        Ok(self
            .visible_details(viewer, filters)?
            .into_iter()
            .map(ChangeRequestView::from)
            .collect())
    }

    pub fn get_change_request(
        &self,
        viewer: &Viewer,
        id: i64,
    ) -> Result<ChangeRequestView, ServerError> {
        let detail = self
            .store
            .get_change_request(id)?
            .ok_or_else(|| ServerError::NotFound(format!("change request {id}")))?;
        let detail = self.access.authorize_view(viewer, detail)?;
        Ok(detail.into())
    }

    pub fn my_assignments(&self, viewer: &Viewer) -> Result<Vec<OwnerAssignment>, ServerError> {
        self.store.validation_records_for_owner(viewer.user_id)
    }

    pub fn update_validation(
        &self,
        viewer: &Viewer,
        change_request_id: i64,
        application_id: i64,
        update: &ValidationUpdate,
        now: NaiveDateTime,
    ) -> Result<(), ServerError> {
        if let Some(ids) = &update.attachments {
            if ids.iter().any(|id| id.trim().is_empty()) {
                return Err(ServerError::InvalidInput("empty attachment id".into()));
            }
        }
        // Ownership is enforced by the store inside the write itself.
        self.store.update_validation_record(
            change_request_id,
            application_id,
            viewer.user_id,
            update,
            now,
        )
    }

    pub fn create_change_request(
        &self,
        viewer: &Viewer,
        new: &NewChangeRequest,
        now: NaiveDateTime,
    ) -> Result<ChangeRequest, ServerError> {
        access::require(
            access::can_create_change_request(viewer),
            "create change requests",
        )?;

        if new.title.trim().is_empty() {
            return Err(ServerError::InvalidInput("title is required".into()));
        }
        if new.start_time >= new.end_time {
            return Err(ServerError::InvalidInput(
                "start time must be before end time".into(),
            ));
        }
        self.check_attachable(&new.application_ids)?;

        self.store.create_change_request(new, viewer.user_id, now)
    }

    pub fn attach_applications(
        &self,
        viewer: &Viewer,
        change_request_id: i64,
        application_ids: &[i64],
        now: NaiveDateTime,
    ) -> Result<(), ServerError> {
        access::require(
            access::can_attach_applications(viewer),
            "attach applications",
        )?;
        if application_ids.is_empty() {
            return Err(ServerError::InvalidInput("no applications given".into()));
        }
        self.check_attachable(application_ids)?;
        self.store
            .attach_applications(change_request_id, application_ids, now)
    }

    /// Rejects duplicate ids in one request and ids that do not exist.
    fn check_attachable(&self, application_ids: &[i64]) -> Result<(), ServerError> {
        if application_ids.is_empty() {
            return Ok(());
        }

        let mut seen = HashSet::new();
        for id in application_ids {
            if !seen.insert(*id) {
                return Err(ServerError::Conflict(format!(
                    "application {id} listed twice"
                )));
            }
        }

        let known: HashSet<i64> = self
            .store
            .list_applications()?
            .into_iter()
            .map(|a| a.id)
            .collect();
        if let Some(missing) = application_ids.iter().find(|id| !known.contains(id)) {
            return Err(ServerError::NotFound(format!("application {missing}")));
        }
        Ok(())
    }

    pub fn list_applications(&self) -> Result<Vec<Application>, ServerError> {
        self.store.list_applications()
    }

    pub fn create_application(
        &self,
        viewer: &Viewer,
        new: &NewApplication,
        now: NaiveDateTime,
    ) -> Result<Application, ServerError> {
        access::require(access::can_manage_catalog(viewer), "create applications")?;

        if new.name.trim().is_empty() {
            return Err(ServerError::InvalidInput("application name is required".into()));
        }
        if let Some(owner_id) = new.owner_id {
            if self.store.get_user(owner_id)?.is_none() {
                return Err(ServerError::InvalidInput(format!(
                    "unknown owner {owner_id}"
                )));
            }
        }
        self.store.create_application(new, now)
    }

    pub fn manager_stats(&self, viewer: &Viewer) -> Result<ManagerStats, ServerError> {
        access::require(
            access::can_attach_applications(viewer),
            "view change manager statistics",
        )?;
        let details = self.visible_details(viewer, &ListFilters::default())?;
        Ok(manager_stats(&details))
    }

    pub fn owner_stats(&self, viewer: &Viewer, today: NaiveDate) -> Result<OwnerStats, ServerError> {
        let assignments = self.my_assignments(viewer)?;
        Ok(owner_stats(&assignments, today))
    }

    /// Visible priority changes that are about to start or already running.
    pub fn priority_alerts(
        &self,
        viewer: &Viewer,
        now: NaiveDateTime,
    ) -> Result<Vec<ChangeRequest>, ServerError> {
        let details = self.visible_details(viewer, &ListFilters::default())?;
        Ok(priority_alerts(details.iter().map(|d| &d.change_request), now)
            .into_iter()
            .cloned()
            .collect())
    }
}
