pub mod export_xlsx;

pub use export_xlsx::export_change_requests_xlsx;
