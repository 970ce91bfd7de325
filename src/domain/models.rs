// src/domain/models.rs
use crate::domain::status::{ChangeType, LifecycleStatus, Role, Side, ValidationStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub role: Role,
    pub created_at: NaiveDateTime,
}

/// The identity a request is evaluated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: i64,
    pub role: Role,
}

impl Viewer {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }
}

impl From<&User> for Viewer {
    fn from(user: &User) -> Self {
        Viewer::new(user.id, user.role)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

/// Display-only owner details joined onto an application row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRef {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    pub id: i64,
    pub change_id: String,
    pub title: String,
    pub description: Option<String>,
    pub change_type: ChangeType,
    pub status: LifecycleStatus,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub manager_id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRecord {
    pub change_request_id: i64,
    pub application_id: i64,
    pub pre_status: ValidationStatus,
    pub post_status: ValidationStatus,
    pub pre_comments: Option<String>,
    pub post_comments: Option<String>,
    pub pre_attachments: Vec<String>,
    pub post_attachments: Vec<String>,
    pub pre_updated_at: Option<NaiveDateTime>,
    pub post_updated_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl ValidationRecord {
    /// Fresh `pending/pending` record for a newly attached application.
    pub fn pending(change_request_id: i64, application_id: i64, now: NaiveDateTime) -> Self {
        Self {
            change_request_id,
            application_id,
            pre_status: ValidationStatus::Pending,
            post_status: ValidationStatus::Pending,
            pre_comments: None,
            post_comments: None,
            pre_attachments: Vec::new(),
            post_attachments: Vec::new(),
            pre_updated_at: None,
            post_updated_at: None,
            created_at: now,
        }
    }

    pub fn status(&self, side: Side) -> ValidationStatus {
        match side {
            Side::Pre => self.pre_status,
            Side::Post => self.post_status,
        }
    }

    /// Applies an update to the targeted side. Absent comments/attachments
    /// leave the stored values untouched; the side timestamp always moves.
    pub fn apply(&mut self, update: &ValidationUpdate, now: NaiveDateTime) {
        let (status, comments, attachments, updated_at) = match update.side {
            Side::Pre => (
                &mut self.pre_status,
                &mut self.pre_comments,
                &mut self.pre_attachments,
                &mut self.pre_updated_at,
            ),
            Side::Post => (
                &mut self.post_status,
                &mut self.post_comments,
                &mut self.post_attachments,
                &mut self.post_updated_at,
            ),
        };

        *status = update.status;
        if let Some(c) = &update.comments {
            *comments = Some(c.clone());
        }
        if let Some(a) = &update.attachments {
            *attachments = a.clone();
        }
        *updated_at = Some(now);
    }
}

/// One attached application inside a change request, with its record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedApplication {
    pub record: ValidationRecord,
    pub application: Application,
    pub owner: Option<OwnerRef>,
}

/// A change request with every attached application row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequestDetail {
    pub change_request: ChangeRequest,
    pub applications: Vec<AttachedApplication>,
}

impl ChangeRequestDetail {
    pub fn records(&self) -> impl Iterator<Item = &ValidationRecord> + Clone {
        self.applications.iter().map(|a| &a.record)
    }

    pub fn has_application_owned_by(&self, user_id: i64) -> bool {
        self.applications
            .iter()
            .any(|a| a.application.owner_id == Some(user_id))
    }
}

/// A validation record as an application owner sees it on their work list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerAssignment {
    pub record: ValidationRecord,
    pub application: Application,
    pub change_request: ChangeRequest,
    pub manager: Option<OwnerRef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationUpdate {
    pub side: Side,
    pub status: ValidationStatus,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub attachments: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChangeRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub change_type: ChangeType,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    #[serde(default)]
    pub application_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplication {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner_id: Option<i64>,
}
