//! Client commands: drive the integration services and render their results.

use anyhow::{Context, Result};
use nexaflow_services::dashboard::{admin_dashboard, sample_projects};
use nexaflow_services::{HttpRequest, RuntimeMode, ServicesConfig, Transport};
use shared::{
    AdminDashboard, ApprovalReply, DispatchResult, ImportResult, InsightResult, Project,
    ReportResult,
};
use std::path::Path;

pub const PROJECTS_PATH: &str = "/api/projects";

/// Projects for the admin dashboard: sample data in demo mode, the server's
/// stored projects otherwise.
pub async fn load_projects(
    config: &ServicesConfig,
    transport: &dyn Transport,
) -> Result<Vec<Project>> {
    if config.mode == RuntimeMode::Demo {
        return Ok(sample_projects());
    }

    let url = config.endpoint(PROJECTS_PATH);
    let resp = transport
        .send(HttpRequest::get(&url))
        .await
        .with_context(|| format!("Failed to reach {}", url))?
        .error_for_status()?;
    Ok(resp.json()?)
}

pub async fn dashboard(
    config: &ServicesConfig,
    transport: &dyn Transport,
) -> Result<AdminDashboard> {
    let projects = load_projects(config, transport).await?;
    Ok(admin_dashboard(&projects))
}

/// Write imported content next to the caller, if any was downloaded.
pub fn save_import(result: &ImportResult, output: &Path) -> Result<()> {
    let Some(file) = &result.file else {
        anyhow::bail!("Nothing to save, the import failed");
    };
    std::fs::write(output, &file.content)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(())
}

fn mark(success: bool) -> &'static str {
    if success {
        "✅"
    } else {
        "❌"
    }
}

pub fn render_dispatch(result: &DispatchResult) -> String {
    result
        .results
        .iter()
        .map(|r| match &r.error {
            Some(error) => format!("{} {}: {}", mark(r.success), r.channel, error),
            None => format!("{} {}", mark(r.success), r.channel),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_report(result: &ReportResult) -> String {
    let mut out = format!("Summary\n  {}\n\nNext actions\n", result.summary);
    for (i, action) in result.actions.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, action));
    }
    out.push_str(&format!("\nRisk\n  {}", result.risk));
    if let Some(error) = &result.error {
        out.push_str(&format!("\n\n⚠️  Fallback report shown: {}", error));
    }
    out
}

pub fn render_insight(result: &InsightResult) -> String {
    match &result.error {
        Some(error) => format!("💡 {}\n\n⚠️  Fallback insight shown: {}", result.insight, error),
        None => format!("💡 {}", result.insight),
    }
}

pub fn render_import(result: &ImportResult) -> String {
    match (&result.file, &result.error) {
        (Some(file), _) => format!(
            "✅ Imported {} ({} bytes, {}) from {:?}",
            file.name,
            file.size,
            file.mime_type.as_deref().unwrap_or("unknown type"),
            file.source
        ),
        (None, Some(error)) => format!("❌ Import failed: {}", error),
        (None, None) => "❌ Import failed".to_string(),
    }
}

pub fn render_reply(reply: &ApprovalReply) -> String {
    match (&reply.token, reply.action) {
        (Some(token), Some(action)) => format!("{} → {:?}", token, action),
        (Some(token), None) => format!("{} → no approve/reject keyword, ignored", token),
        (None, _) => "No approval token found, ignored".to_string(),
    }
}

pub fn render_dashboard(dashboard: &AdminDashboard) -> String {
    let mut out = String::from("Admin dashboard\n\n");
    for stat in &dashboard.stats {
        out.push_str(&format!("  {:<16} {:>10}  {}\n", stat.label, stat.value, stat.change));
    }
    out.push_str("\nRecent activity\n");
    for item in &dashboard.recent_activities {
        out.push_str(&format!(
            "  {} {} {} ({})\n",
            item.actor, item.action, item.target, item.time
        ));
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nexaflow_services::transport::mock::MockTransport;
    use serde_json::json;
    use shared::{
        parse_approval_reply, Channel, ChannelResult, ImportSource, ImportedFile,
    };

    #[tokio::test]
    async fn test_demo_dashboard_uses_sample_projects() {
        let transport = MockTransport::failing("should not be called");
        let dashboard = dashboard(&ServicesConfig::default(), &transport).await.unwrap();

        assert_eq!(dashboard.total_projects, 5);
        assert_eq!(dashboard.active_projects, 2);
        assert_eq!(transport.calls(), 0);
        assert!(render_dashboard(&dashboard).contains("Active Projects"));
    }

    #[tokio::test]
    async fn test_live_dashboard_fetches_projects() {
        let project = &sample_projects()[0];
        let transport = MockTransport::json(200, json!([project]));
        let config = ServicesConfig::new(RuntimeMode::Live, "http://nexaflow.test/");

        let dashboard = dashboard(&config, &transport).await.unwrap();

        assert_eq!(dashboard.total_projects, 1);
        assert_eq!(dashboard.active_projects, 1);
        assert_eq!(transport.requests()[0].url, "http://nexaflow.test/api/projects");
    }

    #[tokio::test]
    async fn test_live_dashboard_surfaces_errors() {
        let transport = MockTransport::failing("connection refused");
        let config = ServicesConfig::new(RuntimeMode::Live, "http://nexaflow.test");

        let err = dashboard(&config, &transport).await.unwrap_err();
        assert!(err.to_string().contains("http://nexaflow.test/api/projects"));
    }

    #[test]
    fn test_render_dispatch_lists_each_channel() {
        let result = DispatchResult {
            success: true,
            results: vec![
                ChannelResult {
                    channel: Channel::InApp,
                    success: true,
                    error: None,
                },
                ChannelResult {
                    channel: Channel::Email,
                    success: false,
                    error: Some("recipient has no email address".to_string()),
                },
            ],
        };
        assert_eq!(
            render_dispatch(&result),
            "✅ in-app\n❌ email: recipient has no email address"
        );
    }

    #[test]
    fn test_render_reply() {
        assert_eq!(
            render_reply(&parse_approval_reply("I APPROVE APP-AB12C9 great work")),
            "APP-AB12C9 → Approve"
        );
        assert_eq!(
            render_reply(&parse_approval_reply("no token here")),
            "No approval token found, ignored"
        );
    }

    #[test]
    fn test_save_import_writes_content() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("report.pdf");
        let result = ImportResult::imported(ImportedFile {
            name: "report.pdf".to_string(),
            size: 4,
            mime_type: Some("application/pdf".to_string()),
            source: ImportSource::Url,
            imported_at: Utc::now(),
            content: b"%PDF".to_vec(),
        });

        save_import(&result, &output).unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), b"%PDF");
        assert!(save_import(&ImportResult::failed("boom"), &output).is_err());
        assert!(render_import(&result).starts_with("✅ Imported report.pdf (4 bytes"));
    }
}
