mod auth_tests;
mod change_request_tests;
mod page_tests;
mod validation_tests;
mod visibility_tests;
