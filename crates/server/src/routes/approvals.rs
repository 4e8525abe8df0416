use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use nexaflow_services::email::notification_email;
use serde::Serialize;
use shared::{
    approval_request_message, generate_approval_token, Approval, ApprovalMethod, ApprovalStatus,
    Channel, CreateApprovalRequest, Notification, NotificationPayload, NotificationStatus,
    SendResult, Severity,
};
use uuid::Uuid;

use crate::{error::AppError, routes, state::AppState};

#[derive(Debug, Serialize)]
pub struct CreateApprovalResponse {
    pub approval: Approval,
    /// Outcome of sending the request to the approver
    pub delivery: SendResult,
}

/// Create a pending approval for a version and ask the approver for an answer
/// POST /api/approvals
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateApprovalRequest>,
) -> Result<(StatusCode, Json<CreateApprovalResponse>), AppError> {
    let version = state
        .db
        .get_version(req.version_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Version".to_string()))?;
    let deliverable = state
        .db
        .get_deliverable(version.deliverable_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Deliverable".to_string()))?;
    let approver = state
        .db
        .get_user(req.approver_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Approver".to_string()))?;

    let approval = Approval {
        id: Uuid::new_v4(),
        version_id: version.id,
        approver_id: approver.id,
        method: req.method,
        status: ApprovalStatus::Pending,
        token: Some(generate_approval_token()),
        comment: None,
        responded_at: None,
        created_at: Some(Utc::now()),
    };
    state.db.create_approval(&approval).await?;

    let token = approval.token.as_deref().unwrap_or_default();
    let review_url = format!(
        "{}/deliverables/{}",
        state.config.server.public_url.trim_end_matches('/'),
        deliverable.id
    );
    let text = approval_request_message(
        &deliverable.title,
        version.version_number,
        token,
        Some(&review_url),
    );

    let delivery = match req.method {
        ApprovalMethod::Whatsapp => match &approver.whatsapp {
            Some(number) => routes::whatsapp::deliver_result(&state, number, &text).await,
            None => SendResult::failed("approver has no WhatsApp number"),
        },
        ApprovalMethod::Email => {
            let payload = NotificationPayload {
                user_id: approver.id,
                email: Some(approver.email.clone()),
                whatsapp: None,
                title: format!("Approval needed: {}", deliverable.title),
                message: text,
                severity: Severity::Info,
                channels: vec![Channel::Email],
                action_url: Some(review_url),
                kind: "approval".to_string(),
            };
            let email = notification_email(&approver.email, &payload);
            routes::email::deliver_result(&state.config.smtp, &email).await
        }
        ApprovalMethod::InApp => {
            let notification = Notification {
                id: Uuid::new_v4(),
                user_id: approver.id,
                channel: Channel::InApp,
                kind: "approval".to_string(),
                title: format!("Approval needed: {}", deliverable.title),
                message: text,
                severity: Severity::Info,
                action_url: Some(review_url),
                status: NotificationStatus::Unread,
                created_at: None,
            };
            state.db.create_notification(&notification).await?;
            SendResult::sent(notification.id.to_string())
        }
    };

    tracing::info!(
        approval_id = %approval.id,
        method = %approval.method,
        delivered = delivery.success,
        "Approval requested"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateApprovalResponse { approval, delivery }),
    ))
}

#[cfg(test)]
mod tests {
    use crate::db::fixtures::seed;
    use crate::routes::test_support::{call, test_app};
    use nexaflow_services::transport::{mock::MockTransport, RequestBody};
    use serde_json::json;
    use shared::ApprovalStatus;
    use std::sync::Arc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_whatsapp_approval_sends_token() {
        let transport = Arc::new(MockTransport::json(201, json!({ "sid": "SM999" })));
        let (app, state) = test_app(transport.clone()).await;
        let seeded = seed(&state.db).await;

        let (status, body) = call(
            app,
            "POST",
            "/api/approvals",
            json!({
                "version_id": seeded.version.id,
                "approver_id": seeded.approver.id,
                "method": "whatsapp",
            }),
        )
        .await;

        assert_eq!(status, 201);
        assert_eq!(body["delivery"]["success"], true);
        assert_eq!(body["approval"]["status"], "pending");
        let token = body["approval"]["token"].as_str().unwrap().to_string();
        assert!(token.starts_with("APP-"));

        let RequestBody::Form(fields) = &transport.requests()[0].body else {
            panic!("expected form body");
        };
        let (_, text) = fields.iter().find(|(k, _)| k == "Body").unwrap();
        assert!(text.contains(&format!("APPROVE {}", token)));
        assert!(text.contains("Homepage Mockups"));

        let stored = state.db.get_approval_by_token(&token).await.unwrap().unwrap();
        assert_eq!(stored.status, ApprovalStatus::Pending);
    }

    #[tokio::test]
    async fn test_in_app_approval_records_notification() {
        let transport = Arc::new(MockTransport::failing("should not be called"));
        let (app, state) = test_app(transport.clone()).await;
        let seeded = seed(&state.db).await;

        let (status, body) = call(
            app,
            "POST",
            "/api/approvals",
            json!({
                "version_id": seeded.version.id,
                "approver_id": seeded.approver.id,
                "method": "in-app",
            }),
        )
        .await;

        assert_eq!(status, 201);
        assert_eq!(body["delivery"]["success"], true);
        let inbox = state.db.list_notifications(seeded.approver.id).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, "approval");
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_version_is_not_found() {
        let (app, state) = test_app(Arc::new(MockTransport::failing("unused"))).await;
        let seeded = seed(&state.db).await;

        let (status, body) = call(
            app,
            "POST",
            "/api/approvals",
            json!({
                "version_id": Uuid::new_v4(),
                "approver_id": seeded.approver.id,
                "method": "whatsapp",
            }),
        )
        .await;

        assert_eq!(status, 404);
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["error"], "Version not found");
    }
}
