use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod ai;
mod approvals;
mod email;
mod health;
mod notifications;
mod projects;
mod whatsapp;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Provider proxies
        .route("/api/email/send", post(email::send))
        .route("/api/whatsapp/send", post(whatsapp::send))
        .route("/api/ai/generate", post(ai::generate))
        // Approvals
        .route("/api/approvals", post(approvals::create))
        .route("/api/whatsapp/webhook", post(whatsapp::webhook))
        // Projects and dashboard
        .route("/api/projects", get(projects::list))
        .route("/api/dashboard/admin", get(projects::admin))
        .route(
            "/api/dashboard/admin/actions/:action",
            post(projects::admin_action),
        )
        // In-app notifications
        .route("/api/notifications", post(notifications::create))
        .route("/api/notifications/:id", get(notifications::list))
        .route("/api/notifications/:id/read", post(notifications::mark_read))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use super::test_support::{call, test_app};
    use nexaflow_services::transport::mock::MockTransport;
    use serde_json::Value;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health() {
        let (app, _state) = test_app(Arc::new(MockTransport::failing("unused"))).await;
        let (status, body) = call(app, "GET", "/health", Value::Null).await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "ok");
    }
}
