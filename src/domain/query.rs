// src/domain/query.rs

//! Turns list parameters into a store predicate plus an in-memory filter.
//!
//! Every filter is ANDed with the others; inside a filter the match fields
//! are ORed. The overall validation status cannot be expressed against the
//! change_requests table, so it is applied after aggregation.

use crate::domain::access::AccessFilter;
use crate::domain::aggregate::{aggregate_records, OverallStatus};
use crate::domain::models::{ChangeRequestDetail, Viewer};
use crate::domain::status::{ChangeType, LifecycleStatus};
use crate::errors::ServerError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Filters as supplied by the caller (query string or form).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListFilters {
    pub search: Option<String>,
    pub change_type: Option<ChangeType>,
    /// Overall validation status.
    pub status: Option<OverallStatus>,
    pub lifecycle: Option<LifecycleStatus>,
    pub application: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl ListFilters {
    /// Parses `search`, `type`, `status`, `lifecycle`, `application`,
    /// `dateFrom`, `dateTo`. Empty values and `all` mean "no filter";
    /// unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ServerError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut f = ListFilters::default();

        for (key, value) in pairs {
            let value = value.as_ref().trim();
            if value.is_empty() || value.eq_ignore_ascii_case("all") {
                continue;
            }

            match key.as_ref() {
                "search" => f.search = Some(value.to_string()),
                "type" => f.change_type = Some(ChangeType::parse(value)?),
                "status" => {
                    f.status = Some(OverallStatus::parse(value).ok_or_else(|| {
                        ServerError::InvalidInput(format!("unknown overall status: '{value}'"))
                    })?)
                }
                "lifecycle" => f.lifecycle = Some(LifecycleStatus::parse(value)?),
                "application" => f.application = Some(value.to_string()),
                "dateFrom" => f.date_from = Some(parse_date("dateFrom", value)?),
                "dateTo" => f.date_to = Some(parse_date("dateTo", value)?),
                _ => {}
            }
        }

        if let (Some(from), Some(to)) = (f.date_from, f.date_to) {
            if from > to {
                return Err(ServerError::InvalidInput(format!(
                    "dateFrom {from} is after dateTo {to}"
                )));
            }
        }

        Ok(f)
    }

    /// Back to query-string pairs, e.g. for export links.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(s) = &self.search {
            out.push(("search", s.clone()));
        }
        if let Some(t) = self.change_type {
            out.push(("type", t.as_str().to_string()));
        }
        if let Some(s) = self.status {
            out.push(("status", s.as_str().to_string()));
        }
        if let Some(l) = self.lifecycle {
            out.push(("lifecycle", l.as_str().to_string()));
        }
        if let Some(a) = &self.application {
            out.push(("application", a.clone()));
        }
        if let Some(d) = self.date_from {
            out.push(("dateFrom", d.to_string()));
        }
        if let Some(d) = self.date_to {
            out.push(("dateTo", d.to_string()));
        }
        out
    }
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, ServerError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| ServerError::InvalidInput(format!("{field} '{raw}': {e}")))
}

/// Predicate the store can evaluate on its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreFilter {
    /// Role scope: at least one attached application owned by this user.
    pub owner_id: Option<i64>,
    /// Role scope: managed by this user.
    pub manager_id: Option<i64>,
    pub search: Option<String>,
    pub change_type: Option<ChangeType>,
    pub lifecycle: Option<LifecycleStatus>,
    pub application: Option<String>,
    /// Inclusive lower bound on `start_time`.
    pub start_from: Option<NaiveDateTime>,
    /// Exclusive upper bound on `start_time`.
    pub start_before: Option<NaiveDateTime>,
}

/// Unicode-aware, so `été` finds `ÉTÉ`.
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl StoreFilter {
    /// Same predicate as the SQL the store builds, for stores that filter in
    /// memory.
    pub fn matches(&self, detail: &ChangeRequestDetail) -> bool {
        let cr = &detail.change_request;

        if let Some(owner) = self.owner_id {
            if !detail.has_application_owned_by(owner) {
                return false;
            }
        }
        if let Some(manager) = self.manager_id {
            if cr.manager_id != manager {
                return false;
            }
        }
        if let Some(q) = &self.search {
            let hit = contains_ci(&cr.change_id, q)
                || contains_ci(&cr.title, q)
                || cr.description.as_deref().is_some_and(|d| contains_ci(d, q));
            if !hit {
                return false;
            }
        }
        if let Some(t) = self.change_type {
            if cr.change_type != t {
                return false;
            }
        }
        if let Some(l) = self.lifecycle {
            if cr.status != l {
                return false;
            }
        }
        if let Some(name) = &self.application {
            if !detail
                .applications
                .iter()
                .any(|a| contains_ci(&a.application.name, name))
            {
                return false;
            }
        }
        if let Some(from) = self.start_from {
            if cr.start_time < from {
                return false;
            }
        }
        if let Some(before) = self.start_before {
            if cr.start_time >= before {
                return false;
            }
        }
        true
    }
}

/// Store predicate plus the filters that need aggregated data.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedQuery {
    pub store: StoreFilter,
    pub status: Option<OverallStatus>,
}

impl ComposedQuery {
    /// Drops candidates whose aggregated status does not match.
    pub fn finish(&self, candidates: Vec<ChangeRequestDetail>) -> Vec<ChangeRequestDetail> {
        match self.status {
            None => candidates,
            Some(wanted) => candidates
                .into_iter()
                .filter(|d| aggregate_records(d.records()) == wanted)
                .collect(),
        }
    }
}

/// Role scope first, then the caller's filters; the scope is set last so no
/// parameter can widen it.
pub fn compose(access: &AccessFilter, viewer: &Viewer, filters: &ListFilters) -> ComposedQuery {
    let mut store = StoreFilter {
        owner_id: None,
        manager_id: None,
        search: filters.search.clone(),
        change_type: filters.change_type,
        lifecycle: filters.lifecycle,
        application: filters.application.clone(),
        start_from: filters.date_from.map(|d| d.and_time(NaiveTime::MIN)),
        // No day after the last representable date: leave the bound open.
        start_before: filters
            .date_to
            .and_then(|d| d.succ_opt())
            .map(|d| d.and_time(NaiveTime::MIN)),
    };
    access.restrict(viewer, &mut store);

    ComposedQuery {
        store,
        status: filters.status,
    }
}
