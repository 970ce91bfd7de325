// src/domain/access.rs

//! Role-scoped visibility and mutation rules.
//!
//! Visibility is decided on the whole change request: a viewer either sees
//! the request with *all* its application rows, or does not see it at all.
//! Mutation is decided per application and only the owner may mutate,
//! whatever their role.

use crate::domain::models::{Application, ChangeRequestDetail, Viewer};
use crate::domain::query::StoreFilter;
use crate::domain::status::Role;
use crate::errors::ServerError;

/// How far a change manager's (and admin's) visibility reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManagerScope {
    /// Every change request, whoever manages it.
    #[default]
    All,
    /// Only requests the viewer manages.
    ManagedOnly,
}

impl ManagerScope {
    pub fn parse(raw: &str) -> Result<Self, ServerError> {
        match raw.trim().to_lowercase().as_str() {
            "all" => Ok(ManagerScope::All),
            "own" | "managed" | "managed_only" => Ok(ManagerScope::ManagedOnly),
            other => Err(ServerError::InvalidInput(format!(
                "unknown manager scope: '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccessFilter {
    manager_scope: ManagerScope,
}

impl AccessFilter {
    pub fn new(manager_scope: ManagerScope) -> Self {
        Self { manager_scope }
    }

    /// Mandatory restriction for listing, merged into the store filter
    /// before any user-supplied filter is considered.
    pub fn restrict(&self, viewer: &Viewer, filter: &mut StoreFilter) {
        match viewer.role {
            Role::ApplicationOwner => {
                filter.owner_id = Some(viewer.user_id);
                filter.manager_id = None;
            }
            Role::ChangeManager | Role::Admin => {
                filter.owner_id = None;
                filter.manager_id = match self.manager_scope {
                    ManagerScope::All => None,
                    ManagerScope::ManagedOnly => Some(viewer.user_id),
                };
            }
        }
    }

    pub fn can_view(&self, viewer: &Viewer, detail: &ChangeRequestDetail) -> bool {
        match viewer.role {
            Role::ApplicationOwner => detail.has_application_owned_by(viewer.user_id),
            Role::ChangeManager | Role::Admin => match self.manager_scope {
                ManagerScope::All => true,
                ManagerScope::ManagedOnly => detail.change_request.manager_id == viewer.user_id,
            },
        }
    }

    /// Returns the request unchanged when visible. Owners keep every row so
    /// they have context beyond their own applications.
    pub fn authorize_view(
        &self,
        viewer: &Viewer,
        detail: ChangeRequestDetail,
    ) -> Result<ChangeRequestDetail, ServerError> {
        if self.can_view(viewer, &detail) {
            Ok(detail)
        } else {
            Err(ServerError::Forbidden(format!(
                "no access to change request {}",
                detail.change_request.change_id
            )))
        }
    }

    pub fn filter_visible(
        &self,
        viewer: &Viewer,
        details: Vec<ChangeRequestDetail>,
    ) -> Vec<ChangeRequestDetail> {
        details
            .into_iter()
            .filter(|d| self.can_view(viewer, d))
            .collect()
    }
}

/// Only the application's current owner may edit its validation records.
pub fn can_mutate(viewer: &Viewer, application: &Application) -> bool {
    application.owner_id == Some(viewer.user_id)
}

pub fn can_create_change_request(viewer: &Viewer) -> bool {
    viewer.role == Role::ChangeManager
}

pub fn can_attach_applications(viewer: &Viewer) -> bool {
    matches!(viewer.role, Role::ChangeManager | Role::Admin)
}

pub fn can_manage_catalog(viewer: &Viewer) -> bool {
    viewer.role == Role::Admin
}

pub fn require(allowed: bool, what: &str) -> Result<(), ServerError> {
    if allowed {
        Ok(())
    } else {
        Err(ServerError::Forbidden(format!("not allowed to {what}")))
    }
}
