// src/domain/store.rs
use crate::domain::models::{
    Application, ChangeRequest, ChangeRequestDetail, NewApplication, NewChangeRequest,
    OwnerAssignment, User, ValidationUpdate,
};
use crate::domain::query::StoreFilter;
use crate::errors::ServerError;
use chrono::NaiveDateTime;

/// Everything the tracker core needs from persistence.
///
/// Implementations must keep exactly one validation record per
/// (change request, application) pair and must perform the ownership check
/// of `update_validation_record` atomically with the write.
pub trait ChangeStore {
    /// Candidates matching `filter`, newest first, with every attached row.
    fn list_change_requests(
        &self,
        filter: &StoreFilter,
    ) -> Result<Vec<ChangeRequestDetail>, ServerError>;

    fn get_change_request(&self, id: i64) -> Result<Option<ChangeRequestDetail>, ServerError>;

    /// Records of applications owned by `owner_id` in active change requests.
    fn validation_records_for_owner(
        &self,
        owner_id: i64,
    ) -> Result<Vec<OwnerAssignment>, ServerError>;

    /// `NotFound` when the pair does not exist, `Forbidden` when `caller_id`
    /// does not own the application.
    fn update_validation_record(
        &self,
        change_request_id: i64,
        application_id: i64,
        caller_id: i64,
        update: &ValidationUpdate,
        now: NaiveDateTime,
    ) -> Result<(), ServerError>;

    /// All-or-nothing; `Conflict` if any application is already attached.
    fn attach_applications(
        &self,
        change_request_id: i64,
        application_ids: &[i64],
        now: NaiveDateTime,
    ) -> Result<(), ServerError>;

    /// Also attaches `new.application_ids`, atomically: on any error nothing
    /// is created.
    fn create_change_request(
        &self,
        new: &NewChangeRequest,
        manager_id: i64,
        now: NaiveDateTime,
    ) -> Result<ChangeRequest, ServerError>;

    fn create_application(
        &self,
        new: &NewApplication,
        now: NaiveDateTime,
    ) -> Result<Application, ServerError>;

    fn list_applications(&self) -> Result<Vec<Application>, ServerError>;

    fn get_user(&self, id: i64) -> Result<Option<User>, ServerError>;
}

/// `CR-<year>-<seq>` with at least three digits of sequence.
pub fn format_change_id(year: i32, seq: u32) -> String {
    format!("CR-{year}-{seq:03}")
}

/// Sequence part of a change id of the given year, if it is one.
pub fn change_id_sequence(change_id: &str, year: i32) -> Option<u32> {
    change_id
        .strip_prefix(&format!("CR-{year}-"))
        .and_then(|rest| rest.parse().ok())
}
