pub mod change_request;
pub mod dashboard;
pub mod login;
pub mod my_applications;

pub use change_request::{change_request_page, ChangeRequestVm};
pub use dashboard::{dashboard_page, DashboardVm, RoleStats};
pub use login::login_page;
pub use my_applications::{my_applications_page, MyApplicationsVm};
