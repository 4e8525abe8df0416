//! Outbound email.

use async_trait::async_trait;
use shared::{EmailSendRequest, NotificationPayload, SendResult};
use std::sync::Arc;

use crate::config::{RuntimeMode, ServicesConfig};
use crate::error::ServiceError;
use crate::transport::{HttpRequest, Transport};

pub const EMAIL_SEND_PATH: &str = "/api/email/send";

#[async_trait]
pub trait EmailGateway: Send + Sync {
    /// Deliver one email and return the provider's message id.
    async fn send(&self, request: &EmailSendRequest) -> Result<String, ServiceError>;
}

/// Accepts every email without sending anything.
#[derive(Debug, Clone, Default)]
pub struct DemoEmailGateway;

#[async_trait]
impl EmailGateway for DemoEmailGateway {
    async fn send(&self, request: &EmailSendRequest) -> Result<String, ServiceError> {
        tracing::info!("[demo] email to {}: {}", request.to, request.subject);
        Ok(format!("demo-email-{}", uuid::Uuid::new_v4()))
    }
}

/// Posts to the server's `/api/email/send` route.
pub struct LiveEmailGateway {
    transport: Arc<dyn Transport>,
    endpoint: String,
}

impl LiveEmailGateway {
    pub fn new(transport: Arc<dyn Transport>, endpoint: String) -> Self {
        Self { transport, endpoint }
    }
}

#[async_trait]
impl EmailGateway for LiveEmailGateway {
    async fn send(&self, request: &EmailSendRequest) -> Result<String, ServiceError> {
        let req = HttpRequest::post_json(&self.endpoint, request)?;
        let result: SendResult = self.transport.send(req).await?.error_for_status()?.json()?;

        if !result.success {
            return Err(ServiceError::Rejected(
                result.error.unwrap_or_else(|| "email provider rejected the message".to_string()),
            ));
        }
        Ok(result.message_id.unwrap_or_default())
    }
}

#[derive(Clone)]
pub struct EmailService {
    gateway: Arc<dyn EmailGateway>,
}

impl EmailService {
    pub fn new(config: &ServicesConfig, transport: Arc<dyn Transport>) -> Self {
        let gateway: Arc<dyn EmailGateway> = match config.mode {
            RuntimeMode::Demo => Arc::new(DemoEmailGateway),
            RuntimeMode::Live => Arc::new(LiveEmailGateway::new(
                transport,
                config.endpoint(EMAIL_SEND_PATH),
            )),
        };
        Self::with_gateway(gateway)
    }

    pub fn with_gateway(gateway: Arc<dyn EmailGateway>) -> Self {
        Self { gateway }
    }

    pub async fn send(&self, request: &EmailSendRequest) -> SendResult {
        match self.gateway.send(request).await {
            Ok(message_id) => SendResult::sent(message_id),
            Err(e) => {
                tracing::warn!("Failed to send email to {}: {}", request.to, e);
                SendResult::failed(e)
            }
        }
    }
}

/// Build the email for a notification addressed to `to`.
pub fn notification_email(to: &str, payload: &NotificationPayload) -> EmailSendRequest {
    let button = payload
        .action_url
        .as_deref()
        .map(|url| {
            format!(
                r#"
    <p style="text-align: center; margin: 30px 0;">
        <a href="{}" style="background-color: #4f46e5; color: white; padding: 12px 24px; text-decoration: none; border-radius: 6px; display: inline-block;">View in NexaFlow</a>
    </p>"#,
                url
            )
        })
        .unwrap_or_default();

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2 style="color: #4f46e5;">{title}</h2>
    <p>{message}</p>{button}
    <p style="margin-top: 30px; color: #666; font-size: 14px;">You are receiving this because of your NexaFlow notification settings.</p>
</body>
</html>"#,
        title = payload.title,
        message = payload.message,
        button = button,
    );

    let mut text = format!("{}\n\n{}", payload.title, payload.message);
    if let Some(url) = &payload.action_url {
        text.push_str(&format!("\n\n{}", url));
    }

    EmailSendRequest {
        to: to.to_string(),
        subject: format!("[NexaFlow] {}", payload.title),
        html,
        text: Some(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use shared::{Channel, Severity};

    fn request() -> EmailSendRequest {
        EmailSendRequest {
            to: "client@example.com".to_string(),
            subject: "Hello".to_string(),
            html: "<p>Hi</p>".to_string(),
            text: None,
        }
    }

    #[tokio::test]
    async fn test_demo_mode_never_touches_transport() {
        let transport = Arc::new(MockTransport::failing("should not be called"));
        let service = EmailService::new(&ServicesConfig::default(), transport.clone());

        let result = service.send(&request()).await;
        assert!(result.success);
        assert!(result.message_id.unwrap().starts_with("demo-email-"));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_live_mode_posts_to_proxy_route() {
        let transport = Arc::new(MockTransport::json(
            200,
            serde_json::json!({"success": true, "message_id": "smtp-42"}),
        ));
        let config = ServicesConfig::new(RuntimeMode::Live, "http://nexaflow.test");
        let service = EmailService::new(&config, transport.clone());

        let result = service.send(&request()).await;
        assert_eq!(result, SendResult::sent("smtp-42"));

        let sent = transport.requests();
        assert_eq!(sent[0].url, "http://nexaflow.test/api/email/send");
        assert_eq!(sent[0].json_body().unwrap()["to"], "client@example.com");
    }

    #[tokio::test]
    async fn test_live_mode_reports_rejection() {
        let transport = Arc::new(MockTransport::json(
            200,
            serde_json::json!({"success": false, "error": "email delivery is disabled"}),
        ));
        let config = ServicesConfig::new(RuntimeMode::Live, "http://nexaflow.test");
        let result = EmailService::new(&config, transport).send(&request()).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("email delivery is disabled"));
    }

    #[tokio::test]
    async fn test_live_mode_converts_transport_error() {
        let transport = Arc::new(MockTransport::failing("connection refused"));
        let config = ServicesConfig::new(RuntimeMode::Live, "http://nexaflow.test");
        let result = EmailService::new(&config, transport).send(&request()).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("connection refused"));
    }

    #[test]
    fn test_notification_email_includes_action_link() {
        let payload = NotificationPayload {
            user_id: uuid::Uuid::new_v4(),
            email: Some("pm@example.com".to_string()),
            whatsapp: None,
            title: "Version approved".to_string(),
            message: "Logo v3 was approved".to_string(),
            severity: Severity::Success,
            channels: vec![Channel::Email],
            action_url: Some("https://app.nexaflow.test/d/1".to_string()),
            kind: "approval".to_string(),
        };
        let email = notification_email("pm@example.com", &payload);
        assert_eq!(email.subject, "[NexaFlow] Version approved");
        assert!(email.html.contains("https://app.nexaflow.test/d/1"));
        assert!(email.text.unwrap().ends_with("https://app.nexaflow.test/d/1"));
    }
}
