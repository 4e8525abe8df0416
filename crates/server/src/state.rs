use crate::{config::Config, db::Database};
use nexaflow_services::{HttpTransport, Transport};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    /// Outbound HTTP to the WhatsApp and AI providers
    pub transport: Arc<dyn Transport>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        Self::with_transport(db, config, Arc::new(HttpTransport::new()))
    }

    pub fn with_transport(db: Database, config: Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            db,
            config,
            transport,
        }
    }
}
