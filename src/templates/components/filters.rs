use crate::domain::aggregate::OverallStatus;
use crate::domain::query::ListFilters;
use crate::domain::status::{ChangeType, LifecycleStatus};
use maud::{html, Markup};

/// GET form driving the dashboard list; the same query string feeds the
/// spreadsheet export link.
pub fn filter_form(filters: &ListFilters) -> Markup {
    let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();

    html! {
        form class="filters" method="get" action="/dashboard" {
            input type="search" name="search" placeholder="Search CR id, title, description"
                value=(filters.search.clone().unwrap_or_default());

            select name="type" {
                option value="all" { "All types" }
                @for t in ChangeType::ALL {
                    option value=(t.as_str()) selected[filters.change_type == Some(*t)] { (t.as_str()) }
                }
            }

            select name="status" {
                option value="all" { "Any validation status" }
                @for s in OverallStatus::ALL {
                    option value=(s.as_str()) selected[filters.status == Some(*s)] { (s.label()) }
                }
            }

            select name="lifecycle" {
                option value="all" { "Any lifecycle" }
                @for l in LifecycleStatus::ALL {
                    option value=(l.as_str()) selected[filters.lifecycle == Some(*l)] { (l.as_str()) }
                }
            }

            input type="text" name="application" placeholder="Application"
                value=(filters.application.clone().unwrap_or_default());
            input type="date" name="dateFrom" value=(date(filters.date_from));
            input type="date" name="dateTo" value=(date(filters.date_to));

            button type="submit" { "Filter" }
            a href="/dashboard" { "Reset" }
        }
    }
}
