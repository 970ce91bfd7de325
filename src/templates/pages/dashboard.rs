use crate::domain::access;
use crate::domain::models::{Application, ChangeRequest, User, Viewer};
use crate::domain::query::ListFilters;
use crate::domain::schedule::ChangeWindow;
use crate::domain::service::ChangeRequestView;
use crate::domain::stats::{ManagerStats, OwnerStats};
use crate::domain::status::ChangeType;
use crate::templates::components::{
    card, change_type_badge, filter_form, overall_badge, progress_bar, stat,
};
use crate::templates::desktop_layout;
use chrono::NaiveDateTime;
use maud::{html, Markup};

pub enum RoleStats {
    Manager(ManagerStats),
    Owner(OwnerStats),
}

pub struct DashboardVm {
    pub user: User,
    pub filters: ListFilters,
    pub requests: Vec<ChangeRequestView>,
    pub alerts: Vec<ChangeRequest>,
    pub stats: RoleStats,
    pub applications: Vec<Application>,
    /// Candidate owners for the catalog form; empty unless admin.
    pub users: Vec<User>,
    pub export_href: String,
    pub now: NaiveDateTime,
}

pub fn dashboard_page(vm: &DashboardVm) -> Markup {
    let viewer = Viewer::from(&vm.user);

    desktop_layout(
        "Dashboard",
        Some(&vm.user),
        html! {
            main class="container" {
                h1 { "Dashboard" }
                p { "Signed in as " strong { (vm.user.name) } }

                (stats_row(&vm.stats))

                @if !vm.alerts.is_empty() {
                    (alerts_card(&vm.alerts, vm.now))
                }

                section class="card" {
                    h3 { "Change requests" }
                    (filter_form(&vm.filters))
                    p { a href=(vm.export_href) { "Export to Excel" } }
                    (requests_table(&vm.requests, vm.now))
                }

                @if access::can_create_change_request(&viewer) {
                    (new_change_request_form(&vm.applications))
                }

                @if access::can_manage_catalog(&viewer) {
                    (new_application_form(&vm.users))
                }
            }
        },
    )
}

fn stats_row(stats: &RoleStats) -> Markup {
    html! {
        div class="stats" {
            @match stats {
                RoleStats::Manager(s) => {
                    (stat("Total", s.total))
                    (stat("Active", s.active))
                    (stat("Completed", s.completed))
                    (stat("In progress", s.in_progress))
                    (stat("Pending", s.pending))
                    (stat("No applications", s.no_applications))
                }
                RoleStats::Owner(s) => {
                    (stat("Assigned", s.total))
                    (stat("Pending", s.pending))
                    (stat("Completed today", s.completed_today))
                }
            }
        }
    }
}

fn alerts_card(alerts: &[ChangeRequest], now: NaiveDateTime) -> Markup {
    card(
        "Priority alerts",
        html! {
            ul class="alerts" {
                @for cr in alerts {
                    li {
                        (change_type_badge(cr.change_type)) " "
                        a href=(format!("/change-requests/{}", cr.id)) { (cr.change_id) }
                        " " (cr.title) " · starts " (cr.start_time.format("%Y-%m-%d %H:%M"))
                        " · " (ChangeWindow::of(cr, now).label())
                    }
                }
            }
        },
    )
}

fn requests_table(requests: &[ChangeRequestView], now: NaiveDateTime) -> Markup {
    html! {
        @if requests.is_empty() {
            p class="empty" { "No change requests match." }
        } @else {
            table class="requests" {
                thead {
                    tr {
                        th { "CR" } th { "Title" } th { "Type" } th { "Window" }
                        th { "Applications" } th { "Validation" } th { "Progress" }
                    }
                }
                tbody {
                    @for v in requests {
                        @let cr = &v.change_request;
                        tr {
                            td { a href=(format!("/change-requests/{}", cr.id)) { (cr.change_id) } }
                            td { (cr.title) }
                            td { (change_type_badge(cr.change_type)) }
                            td {
                                (cr.start_time.format("%Y-%m-%d %H:%M")) " – "
                                (cr.end_time.format("%Y-%m-%d %H:%M"))
                                br;
                                small { (ChangeWindow::of(cr, now).label()) }
                            }
                            td { (v.applications.len()) }
                            td { (overall_badge(v.validation.overall)) }
                            td { (progress_bar(v.validation.completion)) }
                        }
                    }
                }
            }
        }
    }
}

fn new_change_request_form(applications: &[Application]) -> Markup {
    card(
        "New change request",
        html! {
            form method="post" action="/change-requests" class="stacked" {
                label for="title" { "Title" }
                input type="text" id="title" name="title" required;

                label for="description" { "Description" }
                textarea id="description" name="description" rows="3" {}

                label for="changeType" { "Type" }
                select id="changeType" name="changeType" {
                    @for t in ChangeType::ALL {
                        option value=(t.as_str()) { (t.as_str()) }
                    }
                }

                label for="startTime" { "Start" }
                input type="datetime-local" id="startTime" name="startTime" required;
                label for="endTime" { "End" }
                input type="datetime-local" id="endTime" name="endTime" required;

                label for="applicationIds" { "Applications" }
                select id="applicationIds" name="applicationIds" multiple {
                    @for app in applications {
                        option value=(app.id) { (app.name) }
                    }
                }

                button type="submit" class="primary" { "Create" }
            }
        },
    )
}

fn new_application_form(users: &[User]) -> Markup {
    card(
        "New application",
        html! {
            form method="post" action="/applications" class="stacked" {
                label for="name" { "Name" }
                input type="text" id="name" name="name" required;

                label for="app-description" { "Description" }
                input type="text" id="app-description" name="description";

                label for="ownerId" { "Owner (SPOC)" }
                select id="ownerId" name="ownerId" {
                    option value="" { "Unassigned" }
                    @for u in users {
                        option value=(u.id) { (u.name) " (" (u.role.label()) ")" }
                    }
                }

                button type="submit" { "Add application" }
            }
        },
    )
}
