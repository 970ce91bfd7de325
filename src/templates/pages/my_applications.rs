use crate::domain::models::{OwnerAssignment, User};
use crate::domain::schedule::ChangeWindow;
use crate::domain::stats::OwnerStats;
use crate::domain::status::{Side, ValidationStatus};
use crate::templates::components::{change_type_badge, stat, validation_badge};
use crate::templates::desktop_layout;
use chrono::NaiveDateTime;
use maud::{html, Markup};

pub struct MyApplicationsVm {
    pub user: User,
    pub assignments: Vec<OwnerAssignment>,
    pub stats: OwnerStats,
    pub now: NaiveDateTime,
}

pub fn my_applications_page(vm: &MyApplicationsVm) -> Markup {
    desktop_layout(
        "My applications",
        Some(&vm.user),
        html! {
            main class="container" {
                h1 { "My applications" }
                div class="stats" {
                    (stat("Assigned", vm.stats.total))
                    (stat("Pending", vm.stats.pending))
                    (stat("Completed today", vm.stats.completed_today))
                }

                @if vm.assignments.is_empty() {
                    p class="empty" { "Nothing to validate right now." }
                }
                @for a in &vm.assignments {
                    (assignment_card(a, vm.now))
                }
            }
        },
    )
}

fn assignment_card(a: &OwnerAssignment, now: NaiveDateTime) -> Markup {
    let cr = &a.change_request;
    html! {
        section class="card" {
            h3 {
                a href=(format!("/change-requests/{}", cr.id)) { (cr.change_id) }
                " · " (a.application.name)
            }
            p {
                (change_type_badge(cr.change_type)) " " (cr.title)
                " · " (cr.start_time.format("%Y-%m-%d %H:%M"))
                " · " (ChangeWindow::of(cr, now).label())
                @if let Some(m) = &a.manager { " · manager " (m.name) }
            }
            div class="sides" {
                (side_form(a, Side::Pre))
                (side_form(a, Side::Post))
            }
        }
    }
}

fn side_form(a: &OwnerAssignment, side: Side) -> Markup {
    let r = &a.record;
    let (title, status, comments, attachments) = match side {
        Side::Pre => ("Pre-change", r.pre_status, &r.pre_comments, &r.pre_attachments),
        Side::Post => ("Post-change", r.post_status, &r.post_comments, &r.post_attachments),
    };
    let action = format!(
        "/change-requests/{}/applications/{}/validation",
        r.change_request_id, r.application_id
    );

    html! {
        form method="post" action=(action) class="side" {
            h4 { (title) " " (validation_badge(status)) }
            input type="hidden" name="side" value=(side.as_str());

            select name="status" {
                @for s in ValidationStatus::ALL {
                    option value=(s.as_str()) selected[*s == status] { (s.label()) }
                }
            }
            textarea name="comments" rows="2" placeholder="Comments" {
                (comments.clone().unwrap_or_default())
            }
            textarea name="attachments" rows="2" placeholder="Attachment ids, one per line" {
                (attachments.join("\n"))
            }
            button type="submit" { "Save" }
        }
    }
}
