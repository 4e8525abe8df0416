use axum::{
    extract::{Path, State},
    Json,
};
use nexaflow_services::dashboard::{admin_dashboard, DashboardAction};
use serde_json::{json, Value};
use shared::{AdminDashboard, Project};

use crate::{error::AppError, state::AppState};

/// GET /api/projects
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Project>>, AppError> {
    Ok(Json(state.db.list_projects().await?))
}

/// GET /api/dashboard/admin
pub async fn admin(State(state): State<AppState>) -> Result<Json<AdminDashboard>, AppError> {
    let projects = state.db.list_projects().await?;
    Ok(Json(admin_dashboard(&projects)))
}

/// POST /api/dashboard/admin/actions/:action
///
/// Records the request in the log and does nothing else.
pub async fn admin_action(Path(action): Path<String>) -> Result<Json<Value>, AppError> {
    let action: DashboardAction = action.parse().map_err(AppError::BadRequest)?;
    action.trigger();
    Ok(Json(json!({ "success": true, "action": action })))
}

#[cfg(test)]
mod tests {
    use crate::db::fixtures::project;
    use crate::routes::test_support::{call, test_app};
    use nexaflow_services::transport::mock::MockTransport;
    use serde_json::{json, Value};
    use shared::ProjectStatus;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_admin_dashboard_counts_stored_projects() {
        let (app, state) = test_app(Arc::new(MockTransport::failing("unused"))).await;
        for (name, status) in [
            ("Website Redesign", ProjectStatus::Active),
            ("Mobile App", ProjectStatus::Active),
            ("Brand Refresh", ProjectStatus::Completed),
        ] {
            state.db.create_project(&project(name, status)).await.unwrap();
        }

        let (status, body) = call(app.clone(), "GET", "/api/dashboard/admin", Value::Null).await;
        assert_eq!(status, 200);
        assert_eq!(body["total_projects"], 3);
        assert_eq!(body["active_projects"], 2);
        assert_eq!(body["stats"][1]["value"], "2");
        assert_eq!(body["recent_activities"].as_array().unwrap().len(), 5);

        let (_, projects) = call(app, "GET", "/api/projects", Value::Null).await;
        assert_eq!(projects.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_dashboard_actions_only_acknowledge() {
        let (app, _state) = test_app(Arc::new(MockTransport::failing("unused"))).await;

        let (status, body) = call(
            app.clone(),
            "POST",
            "/api/dashboard/admin/actions/export-report",
            Value::Null,
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({ "success": true, "action": "export-report" }));

        let (status, body) = call(
            app,
            "POST",
            "/api/dashboard/admin/actions/drop-tables",
            Value::Null,
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["code"], "BAD_REQUEST");
    }
}
