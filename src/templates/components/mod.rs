use maud::{html, Markup};

pub mod badges;
pub mod error;
pub mod filters;

pub use badges::{change_type_badge, overall_badge, progress_bar, validation_badge};
pub use error::error_page;
pub use filters::filter_form;

pub fn card(title: &str, body: Markup) -> Markup {
    html! {
        section class="card" {
            h3 { (title) }
            div class="card-body" {
                (body)
            }
        }
    }
}

/// Small label/value tile for stat rows.
pub fn stat(label: &str, value: usize) -> Markup {
    html! {
        div class="stat" {
            span class="stat-value" { (value) }
            span class="stat-label" { (label) }
        }
    }
}
