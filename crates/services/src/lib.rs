//! NexaFlow integration services.
//!
//! Each capability (email, WhatsApp, AI, file import) picks its demo or
//! live strategy once, when [`Services::new`] runs. Every operation returns
//! a result value carrying `success` and an optional `error` string; none of
//! them fail outright.

pub mod ai;
pub mod config;
pub mod dashboard;
pub mod email;
pub mod error;
pub mod import;
pub mod notifications;
pub mod transport;
pub mod whatsapp;

use std::sync::Arc;

pub use ai::AiService;
pub use config::{RuntimeMode, ServicesConfig};
pub use email::EmailService;
pub use error::ServiceError;
pub use import::ImportService;
pub use notifications::NotificationDispatcher;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Transport, TransportError};
pub use whatsapp::WhatsAppService;

#[derive(Clone)]
pub struct Services {
    pub mode: RuntimeMode,
    pub email: EmailService,
    pub whatsapp: WhatsAppService,
    pub ai: AiService,
    pub import: ImportService,
    pub notifications: NotificationDispatcher,
}

impl Services {
    pub fn new(config: &ServicesConfig, transport: Arc<dyn Transport>) -> Self {
        let email = EmailService::new(config, transport.clone());
        let whatsapp = WhatsAppService::new(config, transport.clone());

        tracing::debug!("Services initialized in {:?} mode", config.mode);

        Self {
            mode: config.mode,
            notifications: NotificationDispatcher::new(
                config,
                transport.clone(),
                email.clone(),
                whatsapp.clone(),
            ),
            ai: AiService::new(config, transport.clone()),
            import: ImportService::new(config, transport),
            email,
            whatsapp,
        }
    }

    /// Services talking to the real network through `reqwest`.
    pub fn with_http(config: &ServicesConfig) -> Self {
        Self::new(config, Arc::new(HttpTransport::new()))
    }
}
