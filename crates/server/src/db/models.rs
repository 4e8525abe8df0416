//! Raw SQLite rows and their conversion into the shared schema types.
//!
//! Rows keep every column as stored (ids and labels as TEXT) and are turned
//! into typed values with `TryFrom`, so a corrupt label surfaces as an error
//! instead of a panic.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use shared::{Approval, Deliverable, Notification, Project, User, Version};
use sqlx::FromRow;
use uuid::Uuid;

/// Parse a timestamp written either by us (RFC 3339) or by SQLite's
/// `CURRENT_TIMESTAMP` (`YYYY-MM-DD HH:MM:SS`, UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value.as_deref().and_then(parse_timestamp)
}

fn uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("invalid id '{}'", value))
}

fn optional_uuid(value: Option<String>) -> Result<Option<Uuid>> {
    value.as_deref().map(uuid).transpose()
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub created_at: Option<String>,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: uuid(&row.id)?,
            email: row.email,
            full_name: row.full_name,
            role: row.role.parse()?,
            phone: row.phone,
            whatsapp: row.whatsapp,
            created_at: timestamp(row.created_at),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub client_id: Option<String>,
    pub manager_id: Option<String>,
    pub progress: i64,
    pub budget: Option<f64>,
    pub start_date: Option<String>,
    pub due_date: Option<String>,
    pub created_at: Option<String>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = anyhow::Error;

    fn try_from(row: ProjectRow) -> Result<Self> {
        Ok(Project {
            id: uuid(&row.id)?,
            name: row.name,
            description: row.description,
            status: row.status.parse()?,
            priority: row.priority.parse()?,
            client_id: optional_uuid(row.client_id)?,
            manager_id: optional_uuid(row.manager_id)?,
            progress: row.progress.clamp(0, 100) as u8,
            budget: row.budget,
            start_date: timestamp(row.start_date),
            due_date: timestamp(row.due_date),
            created_at: timestamp(row.created_at),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DeliverableRow {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub status: String,
    pub requires_review: bool,
    pub current_version_id: Option<String>,
    pub due_date: Option<String>,
    pub created_at: Option<String>,
}

impl TryFrom<DeliverableRow> for Deliverable {
    type Error = anyhow::Error;

    fn try_from(row: DeliverableRow) -> Result<Self> {
        Ok(Deliverable {
            id: uuid(&row.id)?,
            project_id: uuid(&row.project_id)?,
            title: row.title,
            status: row.status.parse()?,
            requires_review: row.requires_review,
            current_version_id: optional_uuid(row.current_version_id)?,
            due_date: timestamp(row.due_date),
            created_at: timestamp(row.created_at),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct VersionRow {
    pub id: String,
    pub deliverable_id: String,
    pub version_number: i64,
    pub status: String,
    pub file_name: Option<String>,
    pub file_url: Option<String>,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub uploaded_by: Option<String>,
    pub created_at: Option<String>,
}

impl TryFrom<VersionRow> for Version {
    type Error = anyhow::Error;

    fn try_from(row: VersionRow) -> Result<Self> {
        Ok(Version {
            id: uuid(&row.id)?,
            deliverable_id: uuid(&row.deliverable_id)?,
            version_number: u32::try_from(row.version_number)?,
            status: row.status.parse()?,
            file_name: row.file_name,
            file_url: row.file_url,
            file_size: row.file_size.map(u64::try_from).transpose()?,
            mime_type: row.mime_type,
            uploaded_by: optional_uuid(row.uploaded_by)?,
            created_at: timestamp(row.created_at),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ApprovalRow {
    pub id: String,
    pub version_id: String,
    pub approver_id: String,
    pub method: String,
    pub status: String,
    pub token: Option<String>,
    pub comment: Option<String>,
    pub responded_at: Option<String>,
    pub created_at: Option<String>,
}

impl TryFrom<ApprovalRow> for Approval {
    type Error = anyhow::Error;

    fn try_from(row: ApprovalRow) -> Result<Self> {
        Ok(Approval {
            id: uuid(&row.id)?,
            version_id: uuid(&row.version_id)?,
            approver_id: uuid(&row.approver_id)?,
            method: row.method.parse()?,
            status: row.status.parse()?,
            token: row.token,
            comment: row.comment,
            responded_at: timestamp(row.responded_at),
            created_at: timestamp(row.created_at),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub channel: String,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub severity: String,
    pub action_url: Option<String>,
    pub status: String,
    pub created_at: Option<String>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = anyhow::Error;

    fn try_from(row: NotificationRow) -> Result<Self> {
        Ok(Notification {
            id: uuid(&row.id)?,
            user_id: uuid(&row.user_id)?,
            channel: row.channel.parse()?,
            kind: row.kind,
            title: row.title,
            message: row.message,
            severity: row.severity.parse()?,
            action_url: row.action_url,
            status: row.status.parse()?,
            created_at: timestamp(row.created_at),
        })
    }
}
