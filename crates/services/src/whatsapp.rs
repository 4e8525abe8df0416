//! Outbound WhatsApp messages.

use async_trait::async_trait;
use shared::{approval_request_message, NotificationPayload, SendResult, WhatsAppSendRequest};
use std::sync::Arc;

use crate::config::{RuntimeMode, ServicesConfig};
use crate::error::ServiceError;
use crate::transport::{HttpRequest, Transport};

pub const WHATSAPP_SEND_PATH: &str = "/api/whatsapp/send";

#[async_trait]
pub trait WhatsAppGateway: Send + Sync {
    async fn send(&self, request: &WhatsAppSendRequest) -> Result<String, ServiceError>;
}

#[derive(Debug, Clone, Default)]
pub struct DemoWhatsAppGateway;

#[async_trait]
impl WhatsAppGateway for DemoWhatsAppGateway {
    async fn send(&self, request: &WhatsAppSendRequest) -> Result<String, ServiceError> {
        tracing::info!("[demo] whatsapp to {} ({} chars)", request.to, request.message.len());
        Ok(format!("demo-whatsapp-{}", uuid::Uuid::new_v4()))
    }
}

/// Posts to the server's `/api/whatsapp/send` route.
pub struct LiveWhatsAppGateway {
    transport: Arc<dyn Transport>,
    endpoint: String,
}

impl LiveWhatsAppGateway {
    pub fn new(transport: Arc<dyn Transport>, endpoint: String) -> Self {
        Self { transport, endpoint }
    }
}

#[async_trait]
impl WhatsAppGateway for LiveWhatsAppGateway {
    async fn send(&self, request: &WhatsAppSendRequest) -> Result<String, ServiceError> {
        let req = HttpRequest::post_json(&self.endpoint, request)?;
        let result: SendResult = self.transport.send(req).await?.error_for_status()?.json()?;

        if !result.success {
            return Err(ServiceError::Rejected(result.error.unwrap_or_else(|| {
                "messaging provider rejected the message".to_string()
            })));
        }
        Ok(result.message_id.unwrap_or_default())
    }
}

#[derive(Clone)]
pub struct WhatsAppService {
    gateway: Arc<dyn WhatsAppGateway>,
}

impl WhatsAppService {
    pub fn new(config: &ServicesConfig, transport: Arc<dyn Transport>) -> Self {
        let gateway: Arc<dyn WhatsAppGateway> = match config.mode {
            RuntimeMode::Demo => Arc::new(DemoWhatsAppGateway),
            RuntimeMode::Live => Arc::new(LiveWhatsAppGateway::new(
                transport,
                config.endpoint(WHATSAPP_SEND_PATH),
            )),
        };
        Self::with_gateway(gateway)
    }

    pub fn with_gateway(gateway: Arc<dyn WhatsAppGateway>) -> Self {
        Self { gateway }
    }

    pub async fn send(&self, request: &WhatsAppSendRequest) -> SendResult {
        match self.gateway.send(request).await {
            Ok(message_id) => SendResult::sent(message_id),
            Err(e) => {
                tracing::warn!("Failed to send WhatsApp message to {}: {}", request.to, e);
                SendResult::failed(e)
            }
        }
    }

    /// Ask an approver to answer with `APPROVE <token>` or `REJECT <token>`.
    pub async fn send_approval_request(
        &self,
        to: &str,
        deliverable_title: &str,
        version_number: u32,
        token: &str,
        review_url: Option<&str>,
    ) -> SendResult {
        let request = WhatsAppSendRequest {
            to: to.to_string(),
            message: approval_request_message(deliverable_title, version_number, token, review_url),
        };
        self.send(&request).await
    }
}

/// Build the WhatsApp text for a notification.
pub fn notification_message(to: &str, payload: &NotificationPayload) -> WhatsAppSendRequest {
    let mut message = format!("*{}*\n\n{}", payload.title, payload.message);
    if let Some(url) = &payload.action_url {
        message.push_str(&format!("\n\n{}", url));
    }
    WhatsAppSendRequest {
        to: to.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    #[tokio::test]
    async fn test_demo_mode_never_touches_transport() {
        let transport = Arc::new(MockTransport::failing("should not be called"));
        let service = WhatsAppService::new(&ServicesConfig::default(), transport.clone());

        let result = service
            .send_approval_request("+15550100", "Homepage", 1, "APP-AB12C9", None)
            .await;
        assert!(result.success);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_live_approval_request_carries_token() {
        let transport = Arc::new(MockTransport::json(
            200,
            serde_json::json!({"success": true, "message_id": "SM123"}),
        ));
        let config = ServicesConfig::new(RuntimeMode::Live, "http://nexaflow.test");
        let service = WhatsAppService::new(&config, transport.clone());

        let result = service
            .send_approval_request(
                "+15550100",
                "Homepage",
                3,
                "APP-AB12C9",
                Some("https://x.test/r"),
            )
            .await;
        assert_eq!(result.message_id.as_deref(), Some("SM123"));

        let body = transport.requests()[0].json_body().cloned().unwrap();
        assert_eq!(body["to"], "+15550100");
        assert!(body["message"].as_str().unwrap().contains("APPROVE APP-AB12C9"));
    }

    #[tokio::test]
    async fn test_live_mode_reports_http_error() {
        let transport = Arc::new(MockTransport::new(|_| {
            Ok(crate::transport::HttpResponse::bytes(500, None, "boom"))
        }));
        let config = ServicesConfig::new(RuntimeMode::Live, "http://nexaflow.test");
        let result = WhatsAppService::new(&config, transport)
            .send(&WhatsAppSendRequest {
                to: "+15550100".to_string(),
                message: "hi".to_string(),
            })
            .await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("unexpected status 500: boom"));
    }

    #[test]
    fn test_notification_message_format() {
        let payload = NotificationPayload {
            user_id: uuid::Uuid::new_v4(),
            email: None,
            whatsapp: Some("+15550100".to_string()),
            title: "Deadline".to_string(),
            message: "Homepage due tomorrow".to_string(),
            severity: shared::Severity::Warning,
            channels: vec![shared::Channel::Whatsapp],
            action_url: None,
            kind: "deadline".to_string(),
        };
        let msg = notification_message("+15550100", &payload);
        assert_eq!(msg.message, "*Deadline*\n\nHomepage due tomorrow");
    }
}
