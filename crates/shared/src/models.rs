//! Row shapes of the NexaFlow tables.
//!
//! These mirror the relational schema one-to-one. Lifecycle rules (who may
//! create or update a row) live with the store, not here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Returned when a stored label does not name any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a unit enum stored as a lowercase text label.
macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

labeled_enum! {
    /// Role of a user; selects which dashboard variant they see.
    UserRole ("user role") {
        Admin => "admin",
        Pm => "pm",
        Client => "client",
    }
}

labeled_enum! {
    ProjectStatus ("project status") {
        Planning => "planning",
        Active => "active",
        OnHold => "on_hold",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

labeled_enum! {
    Priority ("priority") {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

labeled_enum! {
    DeliverableStatus ("deliverable status") {
        Draft => "draft",
        Review => "review",
        Approved => "approved",
        Rejected => "rejected",
        Revision => "revision",
    }
}

labeled_enum! {
    VersionStatus ("version status") {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

labeled_enum! {
    /// How an approver was asked for (and answers) an approval.
    ApprovalMethod ("approval method") {
        InApp => "in-app",
        Whatsapp => "whatsapp",
        Email => "email",
    }
}

labeled_enum! {
    ApprovalStatus ("approval status") {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

labeled_enum! {
    /// Delivery channel of a notification.
    Channel ("channel") {
        InApp => "in-app",
        Email => "email",
        Whatsapp => "whatsapp",
    }
}

labeled_enum! {
    NotificationStatus ("notification status") {
        Unread => "unread",
        Read => "read",
    }
}

labeled_enum! {
    Severity ("severity") {
        Info => "info",
        Success => "success",
        Warning => "warning",
        Error => "error",
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Info
    }
}

impl From<ApprovalStatus> for VersionStatus {
    fn from(status: ApprovalStatus) -> Self {
        match status {
            ApprovalStatus::Pending => VersionStatus::Pending,
            ApprovalStatus::Approved => VersionStatus::Approved,
            ApprovalStatus::Rejected => VersionStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub client_id: Option<Uuid>,
    pub manager_id: Option<Uuid>,
    /// Completion percentage, 0–100.
    #[serde(default)]
    pub progress: u8,
    pub budget: Option<f64>,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deliverable {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub status: DeliverableStatus,
    pub requires_review: bool,
    pub current_version_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Version {
    pub id: Uuid,
    pub deliverable_id: Uuid,
    pub version_number: u32,
    pub status: VersionStatus,
    pub file_name: Option<String>,
    pub file_url: Option<String>,
    pub file_size: Option<u64>,
    pub mime_type: Option<String>,
    pub uploaded_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Approval {
    pub id: Uuid,
    pub version_id: Uuid,
    pub approver_id: Uuid,
    pub method: ApprovalMethod,
    pub status: ApprovalStatus,
    /// `APP-XXXXXX` correlation code quoted back in a free-text reply.
    pub token: Option<String>,
    pub comment: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub channel: Channel,
    /// Free-form category, e.g. `approval_request` or `deadline`.
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub action_url: Option<String>,
    pub status: NotificationStatus,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_labels_round_trip() {
        for channel in Channel::ALL {
            assert_eq!(channel.as_str().parse::<Channel>().unwrap(), *channel);
        }
        assert_eq!(serde_json::to_string(&Channel::InApp).unwrap(), "\"in-app\"");
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        let err = "archived".parse::<ProjectStatus>().unwrap_err();
        assert_eq!(err.kind, "project status");
        assert_eq!(err.to_string(), "unknown project status 'archived'");
    }

    #[test]
    fn test_approval_status_maps_onto_version_status() {
        assert_eq!(VersionStatus::from(ApprovalStatus::Approved), VersionStatus::Approved);
        assert_eq!(VersionStatus::from(ApprovalStatus::Rejected), VersionStatus::Rejected);
        assert_eq!(VersionStatus::from(ApprovalStatus::Pending), VersionStatus::Pending);
    }

    #[test]
    fn test_notification_kind_serializes_as_type() {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            channel: Channel::Email,
            kind: "deadline".to_string(),
            title: "Due soon".to_string(),
            message: "Homepage mockups are due tomorrow".to_string(),
            severity: Severity::Warning,
            action_url: None,
            status: NotificationStatus::Unread,
            created_at: None,
        };
        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["type"], "deadline");
        assert_eq!(json["channel"], "email");
        assert_eq!(json["status"], "unread");
    }
}
