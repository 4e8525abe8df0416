//! WhatsApp proxy and inbound reply webhook.

use axum::{extract::State, Json};
use nexaflow_services::{HttpRequest, ServiceError};
use serde::Deserialize;
use shared::{
    parse_approval_reply, ApprovalAction, ApprovalStatus, InboundReply, ReplyOutcome, SendResult,
    WhatsAppSendRequest,
};

use crate::{error::AppError, state::AppState};

const ADDRESS_PREFIX: &str = "whatsapp:";

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    sid: String,
}

/// POST /api/whatsapp/send
pub async fn send(
    State(state): State<AppState>,
    Json(req): Json<WhatsAppSendRequest>,
) -> Json<SendResult> {
    Json(deliver_result(&state, &req.to, &req.message).await)
}

pub async fn deliver_result(state: &AppState, to: &str, body: &str) -> SendResult {
    match deliver(state, to, body).await {
        Ok(sid) => {
            tracing::info!(%to, %sid, "WhatsApp message sent");
            SendResult::sent(sid)
        }
        Err(e) => {
            tracing::warn!(%to, error = %e, "WhatsApp delivery failed");
            SendResult::failed(e)
        }
    }
}

async fn deliver(state: &AppState, to: &str, body: &str) -> Result<String, ServiceError> {
    let config = &state.config.whatsapp;
    let sid = config
        .account_sid
        .as_deref()
        .ok_or(ServiceError::Missing("WhatsApp account SID"))?;
    let token = config
        .auth_token
        .as_deref()
        .ok_or(ServiceError::Missing("WhatsApp auth token"))?;
    let from = config
        .from_number
        .as_deref()
        .ok_or(ServiceError::Missing("WhatsApp sender number"))?;

    let url = format!(
        "{}/Accounts/{}/Messages.json",
        config.api_url.trim_end_matches('/'),
        sid
    );
    let request = HttpRequest::post(url).basic_auth(sid, token).form(vec![
        ("From".to_string(), address(from)),
        ("To".to_string(), address(to)),
        ("Body".to_string(), body.to_string()),
    ]);

    let resp = state.transport.send(request).await?.error_for_status()?;
    Ok(resp.json::<CreatedMessage>()?.sid)
}

fn address(number: &str) -> String {
    if number.starts_with(ADDRESS_PREFIX) {
        number.to_string()
    } else {
        format!("{}{}", ADDRESS_PREFIX, number)
    }
}

/// POST /api/whatsapp/webhook
///
/// A reply that cannot be matched to a pending approval is acknowledged
/// with `handled: false`.
pub async fn webhook(
    State(state): State<AppState>,
    Json(reply): Json<InboundReply>,
) -> Result<Json<ReplyOutcome>, AppError> {
    let parsed = parse_approval_reply(&reply.body);

    let Some(token) = parsed.token else {
        tracing::debug!(from = %reply.from, "Ignoring reply without approval token");
        return Ok(Json(ReplyOutcome::ignored("no approval token found")));
    };
    let Some(action) = parsed.action else {
        tracing::debug!(
            from = %reply.from,
            %token,
            "Ignoring reply without approve/reject keyword"
        );
        return Ok(Json(ReplyOutcome::ignored("reply is neither approve nor reject")));
    };

    let status = match action {
        ApprovalAction::Approve => ApprovalStatus::Approved,
        ApprovalAction::Reject => ApprovalStatus::Rejected,
    };

    let resolved = state
        .db
        .resolve_approval(&token, status, Some(reply.body.as_str()))
        .await?;

    let Some(approval) = resolved else {
        let message = match state.db.get_approval_by_token(&token).await? {
            Some(answered) => format!("{} was already {}", token, answered.status),
            None => format!("no pending approval for {}", token),
        };
        tracing::info!(from = %reply.from, %token, "{}", message);
        return Ok(Json(ReplyOutcome::ignored(message)));
    };

    tracing::info!(
        approval_id = %approval.id,
        version_id = %approval.version_id,
        status = %status,
        "Approval resolved over WhatsApp"
    );

    Ok(Json(ReplyOutcome {
        handled: true,
        message: format!("Version marked {}", status),
        token: Some(token),
        action: Some(action),
        approval_id: Some(approval.id),
    }))
}
