// src/domain/status.rs

//! Closed enumerations for every "status-like" string the tracker stores.
//!
//! Each enum has one canonical lowercase/snake_case spelling shared by the
//! database, the JSON API and query parameters. Unknown spellings are
//! rejected with `InvalidInput` instead of flowing through as free text.

use crate::errors::ServerError;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Generates `as_str`, `parse`, `ALL`, `Display` and the rusqlite
/// conversions from a single variant <-> spelling table.
macro_rules! string_enum {
    ($ty:ident, $label:expr, { $($variant:ident => $text:expr),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }

            pub fn parse(raw: &str) -> Result<Self, ServerError> {
                match raw.trim() {
                    $($text => Ok($ty::$variant),)+
                    other => Err(ServerError::InvalidInput(format!(
                        "unknown {}: '{}'",
                        $label, other
                    ))),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let text = value.as_str()?;
                $ty::parse(text).map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

/// State of one side (pre or post) of a validation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Pending,
    InProgress,
    Completed,
    NotApplicable,
    /// Terminal, never counts as completed.
    Failed,
}

string_enum!(ValidationStatus, "validation status", {
    Pending => "pending",
    InProgress => "in_progress",
    Completed => "completed",
    NotApplicable => "not_applicable",
    Failed => "failed",
});

impl ValidationStatus {
    pub fn label(self) -> &'static str {
        match self {
            ValidationStatus::Pending => "Pending",
            ValidationStatus::InProgress => "In Progress",
            ValidationStatus::Completed => "Completed",
            ValidationStatus::NotApplicable => "Not Applicable",
            ValidationStatus::Failed => "Failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeType {
    P1,
    P2,
    Emergency,
    Standard,
}

string_enum!(ChangeType, "change type", {
    P1 => "P1",
    P2 => "P2",
    Emergency => "Emergency",
    Standard => "Standard",
});

impl ChangeType {
    /// P1 and Emergency changes raise start-time alerts.
    pub fn is_priority(self) -> bool {
        matches!(self, ChangeType::P1 | ChangeType::Emergency)
    }
}

/// Coarse lifecycle flag of a change request. Unrelated to the validation
/// aggregate in `aggregate::OverallStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    Active,
    Completed,
    Cancelled,
}

string_enum!(LifecycleStatus, "lifecycle status", {
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    ChangeManager,
    ApplicationOwner,
    Admin,
}

string_enum!(Role, "role", {
    ChangeManager => "change_manager",
    ApplicationOwner => "application_owner",
    Admin => "admin",
});

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::ChangeManager => "Change Manager",
            Role::ApplicationOwner => "Application Owner",
            Role::Admin => "Admin",
        }
    }
}

/// Which half of a validation record an update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Pre,
    Post,
}

string_enum!(Side, "validation side", {
    Pre => "pre",
    Post => "post",
});
