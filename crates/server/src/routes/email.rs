//! Email proxy: delivers through an SMTP relay or the local sendmail binary.

use axum::{extract::State, Json};
use lettre::{
    message::{header::ContentType, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSendmailTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use shared::{EmailSendRequest, SendResult};
use uuid::Uuid;

use crate::{config::SmtpConfig, state::AppState};

/// POST /api/email/send
pub async fn send(
    State(state): State<AppState>,
    Json(req): Json<EmailSendRequest>,
) -> Json<SendResult> {
    Json(deliver_result(&state.config.smtp, &req).await)
}

pub async fn deliver_result(smtp: &SmtpConfig, req: &EmailSendRequest) -> SendResult {
    if !smtp.enabled {
        return SendResult::failed("email delivery is disabled");
    }

    match deliver(smtp, req).await {
        Ok(message_id) => {
            tracing::info!(to = %req.to, %message_id, "Email sent");
            SendResult::sent(message_id)
        }
        Err(e) => {
            tracing::warn!(to = %req.to, error = %e, "Email delivery failed");
            SendResult::failed(e)
        }
    }
}

async fn deliver(
    smtp: &SmtpConfig,
    req: &EmailSendRequest,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let message_id = format!("<{}@{}>", Uuid::new_v4(), sender_domain(&smtp.from_email));

    let builder = Message::builder()
        .from(format!("{} <{}>", smtp.from_name, smtp.from_email).parse()?)
        .to(req.to.parse()?)
        .subject(req.subject.clone())
        .message_id(Some(message_id.clone()));

    let email = match &req.text {
        Some(text) => builder.multipart(MultiPart::alternative_plain_html(
            text.clone(),
            req.html.clone(),
        ))?,
        None => builder.header(ContentType::TEXT_HTML).body(req.html.clone())?,
    };

    if smtp.use_sendmail {
        let mailer = AsyncSendmailTransport::<Tokio1Executor>::new();
        mailer.send(email).await?;
    } else {
        let creds = Credentials::new(smtp.username.clone(), smtp.password.clone());
        let mailer: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)?
                .credentials(creds)
                .port(smtp.port)
                .build();
        mailer.send(email).await?;
    }

    Ok(message_id)
}

fn sender_domain(address: &str) -> &str {
    address
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .filter(|domain| !domain.is_empty())
        .unwrap_or("localhost")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(to: &str) -> EmailSendRequest {
        EmailSendRequest {
            to: to.to_string(),
            subject: "[NexaFlow] Hello".to_string(),
            html: "<p>Hello</p>".to_string(),
            text: Some("Hello".to_string()),
        }
    }

    #[tokio::test]
    async fn test_disabled_email_reports_failure() {
        let smtp = SmtpConfig {
            enabled: false,
            ..SmtpConfig::default()
        };
        let result = deliver_result(&smtp, &request("client@acme.test")).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("email delivery is disabled"));
    }

    #[tokio::test]
    async fn test_invalid_recipient_fails_before_sending() {
        let result = deliver_result(&SmtpConfig::default(), &request("not an address")).await;
        assert!(!result.success);
        assert!(result.message_id.is_none());
        assert!(result.error.is_some());
    }

    #[test]
    fn test_sender_domain() {
        assert_eq!(sender_domain("noreply@nexaflow.app"), "nexaflow.app");
        assert_eq!(sender_domain("noreply"), "localhost");
    }
}
