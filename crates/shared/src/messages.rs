use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::approval::ApprovalAction;
use crate::models::{ApprovalMethod, Channel, Priority, ProjectStatus, Severity};

// ============================================================================
// Proxy routes: email / WhatsApp / AI
// ============================================================================

/// Body of `POST /api/email/send`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailSendRequest {
    pub to: String,
    pub subject: String,
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Body of `POST /api/whatsapp/send`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WhatsAppSendRequest {
    /// Recipient number in E.164 form, with or without a `whatsapp:` prefix
    pub to: String,
    pub message: String,
}

/// Outcome of a single outbound email or WhatsApp message
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SendResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `POST /api/ai/generate`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiGenerateRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Response of `POST /api/ai/generate`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AiGenerateResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Notifications
// ============================================================================

/// A notification to deliver on one or more channels
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationPayload {
    pub user_id: Uuid,
    /// Address used by the email channel
    #[serde(default)]
    pub email: Option<String>,
    /// Number used by the WhatsApp channel
    #[serde(default)]
    pub whatsapp: Option<String>,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub severity: Severity,
    /// Delivered in this order
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub action_url: Option<String>,
    /// Category stored with the in-app record
    #[serde(default = "default_notification_kind")]
    pub kind: String,
}

fn default_notification_kind() -> String {
    "general".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelResult {
    pub channel: Channel,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-channel outcome of a dispatch. `success` reports that the dispatch
/// ran, not that every channel delivered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchResult {
    pub success: bool,
    pub results: Vec<ChannelResult>,
}

impl DispatchResult {
    pub fn delivered(&self, channel: Channel) -> bool {
        self.results
            .iter()
            .any(|r| r.channel == channel && r.success)
    }
}

// ============================================================================
// AI reports and insights
// ============================================================================

/// Project figures a report or insight is generated from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectSnapshot {
    pub name: String,
    pub status: ProjectStatus,
    pub priority: Priority,
    /// Completion percentage, 0–100
    pub progress: u8,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub spent: Option<f64>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub open_tasks: u32,
    #[serde(default)]
    pub overdue_tasks: u32,
    #[serde(default)]
    pub team_size: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportResult {
    pub success: bool,
    pub summary: String,
    pub actions: Vec<String>,
    pub risk: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsightResult {
    pub success: bool,
    pub insight: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// File import
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportSource {
    GoogleDrive,
    Dropbox,
    Url,
}

/// Metadata of an imported file. The payload itself is not serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportedFile {
    pub name: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub source: ImportSource,
    pub imported_at: DateTime<Utc>,
    #[serde(skip)]
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<ImportedFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Approvals
// ============================================================================

/// Inbound WhatsApp reply, as posted to `POST /api/whatsapp/webhook`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboundReply {
    pub from: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplyOutcome {
    /// True when an approval was updated
    pub handled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ApprovalAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_id: Option<Uuid>,
    pub message: String,
}

/// Body of `POST /api/approvals`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateApprovalRequest {
    pub version_id: Uuid,
    pub approver_id: Uuid,
    pub method: ApprovalMethod,
}

// ============================================================================
// Admin dashboard
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardStat {
    pub label: String,
    pub value: String,
    /// Change against the previous period, e.g. `+12%`
    pub change: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityItem {
    pub actor: String,
    pub action: String,
    pub target: String,
    /// Human-readable age, e.g. `2 hours ago`
    pub time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminDashboard {
    pub total_projects: usize,
    pub active_projects: usize,
    pub stats: Vec<DashboardStat>,
    pub recent_activities: Vec<ActivityItem>,
}

// ============================================================================
// Helper implementations
// ============================================================================

impl SendResult {
    pub fn sent(message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.to_string()),
        }
    }
}

impl AiGenerateResponse {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: Some(content.into()),
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            content: None,
            error: Some(error.to_string()),
        }
    }
}

impl ImportResult {
    pub fn imported(file: ImportedFile) -> Self {
        Self {
            success: true,
            file: Some(file),
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            file: None,
            error: Some(error.to_string()),
        }
    }
}

impl ReplyOutcome {
    pub fn ignored(message: impl Into<String>) -> Self {
        Self {
            handled: false,
            token: None,
            action: None,
            approval_id: None,
            message: message.into(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_result_omits_empty_fields() {
        let json = serde_json::to_string(&SendResult::sent("msg-1")).unwrap();
        assert_eq!(json, r#"{"success":true,"message_id":"msg-1"}"#);

        let json = serde_json::to_string(&SendResult::failed("smtp down")).unwrap();
        assert_eq!(json, r#"{"success":false,"error":"smtp down"}"#);
    }

    #[test]
    fn test_notification_payload_defaults() {
        let json = r#"{
            "user_id": "5b0c3a2e-5a5e-4c1e-9d0a-6f1f4c2b7e11",
            "title": "New version",
            "message": "Logo v3 uploaded",
            "channels": ["in-app", "email"]
        }"#;
        let payload: NotificationPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.severity, Severity::Info);
        assert_eq!(payload.channels, vec![Channel::InApp, Channel::Email]);
        assert_eq!(payload.kind, "general");
        assert!(payload.email.is_none());
        assert!(payload.action_url.is_none());
    }

    #[test]
    fn test_dispatch_result_delivered() {
        let result = DispatchResult {
            success: true,
            results: vec![
                ChannelResult { channel: Channel::InApp, success: true, error: None },
                ChannelResult {
                    channel: Channel::Email,
                    success: false,
                    error: Some("bounced".to_string()),
                },
            ],
        };
        assert!(result.delivered(Channel::InApp));
        assert!(!result.delivered(Channel::Email));
        assert!(!result.delivered(Channel::Whatsapp));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["results"][0]["channel"], "in-app");
        assert_eq!(json["results"][1]["error"], "bounced");
    }

    #[test]
    fn test_imported_file_skips_content() {
        let file = ImportedFile {
            name: "brief.pdf".to_string(),
            size: 3,
            mime_type: Some("application/pdf".to_string()),
            source: ImportSource::GoogleDrive,
            imported_at: Utc::now(),
            content: vec![1, 2, 3],
        };
        let json = serde_json::to_value(ImportResult::imported(file)).unwrap();
        assert_eq!(json["file"]["source"], "google_drive");
        assert!(json["file"].get("content").is_none());
    }

    #[test]
    fn test_reply_outcome_ignored() {
        let outcome = ReplyOutcome::ignored("no approval token found");
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, r#"{"handled":false,"message":"no approval token found"}"#);
    }
}
