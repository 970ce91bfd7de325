use crate::domain::aggregate::{CompletionRatio, OverallStatus};
use crate::domain::status::{ChangeType, ValidationStatus};
use maud::{html, Markup};

pub fn overall_badge(status: OverallStatus) -> Markup {
    html! {
        span class={ "badge badge-" (status.as_str()) } { (status.label()) }
    }
}

pub fn validation_badge(status: ValidationStatus) -> Markup {
    html! {
        span class={ "badge badge-" (status.as_str()) } { (status.label()) }
    }
}

pub fn change_type_badge(change_type: ChangeType) -> Markup {
    html! {
        span class={ "badge" @if change_type.is_priority() { " badge-priority" } } {
            (change_type.as_str())
        }
    }
}

pub fn progress_bar(completion: CompletionRatio) -> Markup {
    let pct = |r: f64| (r * 100.0).round() as u32;
    html! {
        div class="progress" {
            span { "Pre " (pct(completion.pre)) "%" }
            progress max="100" value=(pct(completion.pre)) {}
            span { "Post " (pct(completion.post)) "%" }
            progress max="100" value=(pct(completion.post)) {}
        }
    }
}
