//! Multi-channel notification dispatch.

use async_trait::async_trait;
use shared::{
    Channel, ChannelResult, DispatchResult, Notification, NotificationPayload, SendResult,
};
use std::sync::Arc;

use crate::config::{RuntimeMode, ServicesConfig};
use crate::email::{notification_email, EmailService};
use crate::error::ServiceError;
use crate::transport::{HttpRequest, Transport};
use crate::whatsapp::{notification_message, WhatsAppService};

pub const NOTIFICATIONS_PATH: &str = "/api/notifications";

/// Where in-app notifications are recorded.
#[async_trait]
pub trait InAppInbox: Send + Sync {
    async fn record(&self, payload: &NotificationPayload) -> Result<String, ServiceError>;
}

#[derive(Debug, Clone, Default)]
pub struct DemoInAppInbox;

#[async_trait]
impl InAppInbox for DemoInAppInbox {
    async fn record(&self, payload: &NotificationPayload) -> Result<String, ServiceError> {
        tracing::info!("[demo] in-app notification for {}", payload.user_id);
        Ok(format!("in-app-{}", payload.user_id))
    }
}

/// Stores the record through the server's `/api/notifications` route.
pub struct LiveInAppInbox {
    transport: Arc<dyn Transport>,
    endpoint: String,
}

impl LiveInAppInbox {
    pub fn new(transport: Arc<dyn Transport>, endpoint: String) -> Self {
        Self { transport, endpoint }
    }
}

#[async_trait]
impl InAppInbox for LiveInAppInbox {
    async fn record(&self, payload: &NotificationPayload) -> Result<String, ServiceError> {
        let in_app = NotificationPayload {
            channels: vec![Channel::InApp],
            ..payload.clone()
        };
        let req = HttpRequest::post_json(&self.endpoint, &in_app)?;
        let stored: Vec<Notification> =
            self.transport.send(req).await?.error_for_status()?.json()?;

        stored
            .first()
            .map(|n| n.id.to_string())
            .ok_or(ServiceError::Missing("stored notification"))
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    email: EmailService,
    whatsapp: WhatsAppService,
    inbox: Arc<dyn InAppInbox>,
}

impl NotificationDispatcher {
    pub fn new(
        config: &ServicesConfig,
        transport: Arc<dyn Transport>,
        email: EmailService,
        whatsapp: WhatsAppService,
    ) -> Self {
        let inbox: Arc<dyn InAppInbox> = match config.mode {
            RuntimeMode::Demo => Arc::new(DemoInAppInbox),
            RuntimeMode::Live => Arc::new(LiveInAppInbox::new(
                transport,
                config.endpoint(NOTIFICATIONS_PATH),
            )),
        };
        Self::with_inbox(email, whatsapp, inbox)
    }

    pub fn with_inbox(
        email: EmailService,
        whatsapp: WhatsAppService,
        inbox: Arc<dyn InAppInbox>,
    ) -> Self {
        Self {
            email,
            whatsapp,
            inbox,
        }
    }

    /// Deliver `payload` on each requested channel, one after another.
    ///
    /// A failing channel does not stop the remaining ones.
    pub async fn dispatch(&self, payload: &NotificationPayload) -> DispatchResult {
        let mut results = Vec::with_capacity(payload.channels.len());

        for &channel in &payload.channels {
            let outcome = match channel {
                Channel::InApp => match self.inbox.record(payload).await {
                    Ok(id) => SendResult::sent(id),
                    Err(e) => SendResult::failed(e.to_string()),
                },
                Channel::Email => match payload.email.as_deref() {
                    Some(to) => self.email.send(&notification_email(to, payload)).await,
                    None => SendResult::failed("recipient has no email address"),
                },
                Channel::Whatsapp => match payload.whatsapp.as_deref() {
                    Some(to) => self.whatsapp.send(&notification_message(to, payload)).await,
                    None => SendResult::failed("recipient has no WhatsApp number"),
                },
            };

            if outcome.success {
                tracing::debug!(
                    channel = %channel,
                    user_id = %payload.user_id,
                    "notification delivered"
                );
            } else {
                tracing::warn!(
                    channel = %channel,
                    user_id = %payload.user_id,
                    error = outcome.error.as_deref().unwrap_or_default(),
                    "notification delivery failed"
                );
            }

            results.push(ChannelResult {
                channel,
                success: outcome.success,
                error: outcome.error,
            });
        }

        DispatchResult {
            success: true,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use crate::transport::HttpResponse;
    use serde_json::json;
    use shared::{NotificationStatus, Severity};

    fn payload(channels: Vec<Channel>) -> NotificationPayload {
        NotificationPayload {
            user_id: uuid::Uuid::new_v4(),
            email: Some("client@example.com".to_string()),
            whatsapp: Some("+15550100".to_string()),
            title: "New version uploaded".to_string(),
            message: "Brand guide v2 is ready for review".to_string(),
            severity: Severity::Info,
            channels,
            action_url: None,
            kind: "version".to_string(),
        }
    }

    fn dispatcher(transport: Arc<MockTransport>, mode: RuntimeMode) -> NotificationDispatcher {
        let config = ServicesConfig::new(mode, "http://nexaflow.test");
        NotificationDispatcher::new(
            &config,
            transport.clone(),
            EmailService::new(&config, transport.clone()),
            WhatsAppService::new(&config, transport),
        )
    }

    /// Answers like the server: a stored record for the inbox route, a
    /// provider id for the send routes.
    fn server_like() -> Arc<MockTransport> {
        Arc::new(MockTransport::new(|req| {
            if req.url.ends_with(NOTIFICATIONS_PATH) {
                let body = req.json_body().cloned().unwrap_or_default();
                let stored = json!([{
                    "id": "6f1c2a80-3b3e-4c0e-9a57-0d1e2f3a4b5c",
                    "user_id": body["user_id"],
                    "channel": body["channels"][0],
                    "type": body["kind"],
                    "title": body["title"],
                    "message": body["message"],
                    "severity": body["severity"],
                    "action_url": null,
                    "status": NotificationStatus::Unread,
                    "created_at": null,
                }]);
                return Ok(HttpResponse::json_value(201, &stored));
            }
            let body = json!({"success": true, "message_id": req.url.clone()});
            Ok(HttpResponse::json_value(200, &body))
        }))
    }

    #[tokio::test]
    async fn test_failed_email_does_not_fail_dispatch() {
        let transport = Arc::new(MockTransport::failing("smtp unreachable"));
        let result = dispatcher(transport, RuntimeMode::Live)
            .dispatch(&payload(vec![Channel::Whatsapp, Channel::Email]))
            .await;

        assert!(result.success);
        assert_eq!(result.results.len(), 2);
        assert_eq!(result.results[0].channel, Channel::Whatsapp);
        assert!(!result.results[0].success);
        assert_eq!(result.results[1].channel, Channel::Email);
        assert!(!result.results[1].success);
        assert!(result.results[1].error.is_some());
    }

    #[tokio::test]
    async fn test_channels_processed_in_request_order() {
        let transport = server_like();
        let result = dispatcher(transport.clone(), RuntimeMode::Live)
            .dispatch(&payload(vec![Channel::Whatsapp, Channel::InApp, Channel::Email]))
            .await;

        let channels: Vec<Channel> = result.results.iter().map(|r| r.channel).collect();
        assert_eq!(channels, vec![Channel::Whatsapp, Channel::InApp, Channel::Email]);
        assert!(result.results.iter().all(|r| r.success));

        let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "http://nexaflow.test/api/whatsapp/send".to_string(),
                "http://nexaflow.test/api/notifications".to_string(),
                "http://nexaflow.test/api/email/send".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_live_in_app_is_recorded_on_server() {
        let transport = server_like();
        let p = payload(vec![Channel::InApp, Channel::Email]);
        let result = dispatcher(transport.clone(), RuntimeMode::Live).dispatch(&p).await;
        assert!(result.results[0].success);

        let requests = transport.requests();
        let body = requests[0].json_body().unwrap();
        assert_eq!(body["user_id"], json!(p.user_id));
        assert_eq!(body["channels"], json!(["in-app"]));
        assert_eq!(body["title"], "New version uploaded");
    }

    #[tokio::test]
    async fn test_unreachable_inbox_fails_in_app_channel() {
        let transport = Arc::new(MockTransport::failing("connection refused"));
        let result = dispatcher(transport, RuntimeMode::Live)
            .dispatch(&payload(vec![Channel::InApp]))
            .await;

        assert!(result.success);
        assert!(!result.results[0].success);
        assert!(result.results[0].error.is_some());
    }

    #[tokio::test]
    async fn test_missing_contact_fails_only_that_channel() {
        let transport = server_like();
        let mut p = payload(vec![Channel::Whatsapp, Channel::InApp]);
        p.whatsapp = None;

        let result = dispatcher(transport.clone(), RuntimeMode::Live).dispatch(&p).await;
        assert!(!result.results[0].success);
        assert_eq!(result.results[0].error.as_deref(), Some("recipient has no WhatsApp number"));
        assert!(result.results[1].success);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_demo_mode_delivers_everything_offline() {
        let transport = Arc::new(MockTransport::failing("should not be called"));
        let result = dispatcher(transport.clone(), RuntimeMode::Demo)
            .dispatch(&payload(vec![Channel::InApp, Channel::Email, Channel::Whatsapp]))
            .await;

        assert!(result.results.iter().all(|r| r.success));
        assert_eq!(transport.calls(), 0);
    }
}
