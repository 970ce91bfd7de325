use crate::domain::access::can_mutate;
use crate::domain::aggregate::{record_status, SideSummary};
use crate::domain::models::{Application, AttachedApplication, User, Viewer};
use crate::domain::schedule::ChangeWindow;
use crate::domain::service::ChangeRequestView;
use crate::templates::components::{
    card, change_type_badge, overall_badge, progress_bar, validation_badge,
};
use crate::templates::desktop_layout;
use chrono::NaiveDateTime;
use maud::{html, Markup};

pub struct ChangeRequestVm {
    pub user: User,
    pub view: ChangeRequestView,
    /// Shown to change managers and admins.
    pub attachable: Vec<Application>,
    pub now: NaiveDateTime,
}

fn side_line(name: &str, s: &SideSummary) -> Markup {
    html! {
        p {
            strong { (name) ": " } (s.label.as_str())
            " (" (s.completed) "/" (s.applicable()) " applicable completed"
            @if s.not_applicable > 0 { ", " (s.not_applicable) " N/A" }
            ")"
        }
    }
}

pub fn change_request_page(vm: &ChangeRequestVm) -> Markup {
    let cr = &vm.view.change_request;
    let report = &vm.view.validation;
    let viewer = Viewer::from(&vm.user);

    desktop_layout(
        &cr.change_id,
        Some(&vm.user),
        html! {
            main class="container" {
                p { a href="/dashboard" { "← Dashboard" } }
                h1 { (cr.change_id) " · " (cr.title) }
                p {
                    (change_type_badge(cr.change_type)) " "
                    (overall_badge(report.overall)) " "
                    span class="badge" { (cr.status.as_str()) }
                }
                @if let Some(d) = &cr.description {
                    p class="description" { (d) }
                }
                p {
                    (cr.start_time.format("%Y-%m-%d %H:%M")) " – " (cr.end_time.format("%Y-%m-%d %H:%M"))
                    " · " (ChangeWindow::of(cr, vm.now).label())
                }

                (card("Validation", html! {
                    (progress_bar(report.completion))
                    (side_line("Pre-change", &report.pre_summary))
                    (side_line("Post-change", &report.post_summary))
                    @if let Some(done) = report.completed_at {
                        p { "All validations completed at " (done.format("%Y-%m-%d %H:%M")) }
                    }
                }))

                section class="card" {
                    h3 { "Applications" }
                    @if vm.view.applications.is_empty() {
                        p class="empty" { "No applications attached yet." }
                    } @else {
                        table {
                            thead {
                                tr {
                                    th { "Application" } th { "Owner" } th { "Pre" } th { "Post" }
                                    th { "Status" } th { "Comments" } th {}
                                }
                            }
                            tbody {
                                @for a in &vm.view.applications {
                                    (application_row(a, can_mutate(&viewer, &a.application)))
                                }
                            }
                        }
                    }
                }

                @if !vm.attachable.is_empty() {
                    (card("Attach applications", html! {
                        form method="post" action=(format!("/change-requests/{}/applications", cr.id)) {
                            select name="applicationIds" multiple required {
                                @for app in &vm.attachable {
                                    option value=(app.id) { (app.name) }
                                }
                            }
                            button type="submit" { "Attach" }
                        }
                    }))
                }
            }
        },
    )
}

fn application_row(a: &AttachedApplication, editable: bool) -> Markup {
    let r = &a.record;
    html! {
        tr {
            td { (a.application.name) }
            td {
                @match &a.owner {
                    Some(o) => (o.name),
                    None => em { "unassigned" },
                }
            }
            td { (validation_badge(r.pre_status)) }
            td { (validation_badge(r.post_status)) }
            td { (record_status(r).label()) }
            td {
                @if let Some(c) = &r.pre_comments { p { "Pre: " (c) } }
                @if let Some(c) = &r.post_comments { p { "Post: " (c) } }
            }
            td {
                @if editable { a href="/my-applications" { "Update" } }
            }
        }
    }
}
