// src/domain/mod.rs
pub mod access;
pub mod aggregate;
pub mod models;
pub mod query;
pub mod schedule;
pub mod service;
pub mod stats;
pub mod status;
pub mod store;
