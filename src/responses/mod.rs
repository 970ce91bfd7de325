pub mod errors;
pub mod html;
pub mod json;
pub mod xlsx;

pub use errors::{html_error_response, json_error_response};
pub use html::{html_response, redirect, redirect_with_cookie};
pub use json::{json_response, no_content};
pub use xlsx::xlsx_response;
