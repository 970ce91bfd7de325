// src/db/sqlite_store.rs
use chrono::NaiveDateTime;

use crate::db::connection::Database;
use crate::db::{applications, change_requests, users, validations};
use crate::domain::models::{
    Application, ChangeRequest, ChangeRequestDetail, NewApplication, NewChangeRequest,
    OwnerAssignment, User, ValidationUpdate,
};
use crate::domain::query::StoreFilter;
use crate::domain::store::ChangeStore;
use crate::errors::ServerError;

impl ChangeStore for Database {
    fn list_change_requests(
        &self,
        filter: &StoreFilter,
    ) -> Result<Vec<ChangeRequestDetail>, ServerError> {
        self.with_conn(|conn| change_requests::list_details(conn, filter))
    }

    fn get_change_request(&self, id: i64) -> Result<Option<ChangeRequestDetail>, ServerError> {
        self.with_conn(|conn| change_requests::get_detail(conn, id))
    }

    fn validation_records_for_owner(
        &self,
        owner_id: i64,
    ) -> Result<Vec<OwnerAssignment>, ServerError> {
        self.with_conn(|conn| validations::records_for_owner(conn, owner_id))
    }

    fn update_validation_record(
        &self,
        change_request_id: i64,
        application_id: i64,
        caller_id: i64,
        update: &ValidationUpdate,
        now: NaiveDateTime,
    ) -> Result<(), ServerError> {
        self.with_conn(|conn| {
            validations::update_validation(
                conn,
                change_request_id,
                application_id,
                caller_id,
                update,
                now,
            )
        })
    }

    fn attach_applications(
        &self,
        change_request_id: i64,
        application_ids: &[i64],
        now: NaiveDateTime,
    ) -> Result<(), ServerError> {
        self.with_conn(|conn| {
            validations::attach_applications(conn, change_request_id, application_ids, now)
        })
    }

    fn create_change_request(
        &self,
        new: &NewChangeRequest,
        manager_id: i64,
        now: NaiveDateTime,
    ) -> Result<ChangeRequest, ServerError> {
        self.with_conn(|conn| change_requests::insert_change_request(conn, new, manager_id, now))
    }

    fn create_application(
        &self,
        new: &NewApplication,
        now: NaiveDateTime,
    ) -> Result<Application, ServerError> {
        self.with_conn(|conn| applications::create_application(conn, new, now))
    }

    fn list_applications(&self) -> Result<Vec<Application>, ServerError> {
        self.with_conn(|conn| applications::list_applications(conn))
    }

    fn get_user(&self, id: i64) -> Result<Option<User>, ServerError> {
        self.with_conn(|conn| users::get_user(conn, id))
    }
}
