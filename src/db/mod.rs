pub mod applications;
pub mod change_requests;
pub mod connection;
pub mod sqlite_store;
pub mod users;
pub mod validations;
