//! AI-generated project reports and insights.
//!
//! Demo mode draws from a small pool of canned texts. Live mode turns the
//! project snapshot into a prompt and sends it to the server's
//! `/api/ai/generate` route. A live failure still produces a usable report:
//! the generic fallback text plus the error string.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::Deserialize;
use shared::{AiGenerateRequest, AiGenerateResponse, InsightResult, ProjectSnapshot, ReportResult};
use std::sync::Arc;

use crate::config::{RuntimeMode, ServicesConfig};
use crate::error::ServiceError;
use crate::transport::{HttpRequest, Transport};

pub const AI_GENERATE_PATH: &str = "/api/ai/generate";

/// Number of recommended actions in every report.
pub const REPORT_ACTIONS: usize = 3;

const FALLBACK_SUMMARY: &str =
    "The project is progressing. Review task completion and budget usage to confirm it is on track.";
const FALLBACK_ACTIONS: [&str; REPORT_ACTIONS] = [
    "Review outstanding tasks with the team",
    "Confirm upcoming deadlines with the client",
    "Check budget usage against the plan",
];
const FALLBACK_RISK: &str = "Unable to assess risk automatically; review the project manually.";
const FALLBACK_INSIGHT: &str =
    "Keep an eye on overdue tasks and client feedback turnaround this week.";

const REPORT_SYSTEM_PROMPT: &str = "You are a project management assistant. \
Respond only with a JSON object of the form \
{\"summary\": string, \"actions\": [string, string, string], \"risk\": string}.";
const INSIGHT_SYSTEM_PROMPT: &str =
    "You are a project management assistant. Respond with one or two sentences of plain text.";

struct CannedReport {
    summary: &'static str,
    actions: [&'static str; REPORT_ACTIONS],
    risk: &'static str,
}

const CANNED_REPORTS: &[CannedReport] = &[
    CannedReport {
        summary: "The project is on schedule with 72% of deliverables complete. Client feedback has been positive and the team is maintaining a steady pace.",
        actions: [
            "Schedule the mid-project review with the client",
            "Start preparing final asset handoff documentation",
            "Reallocate one designer to the remaining landing pages",
        ],
        risk: "Low: minor risk of delay if client review cycles lengthen.",
    },
    CannedReport {
        summary: "Progress has slowed over the last two weeks. Three deliverables are waiting on client approval, which is holding back the development phase.",
        actions: [
            "Send approval reminders for the pending deliverables",
            "Propose a fixed weekly review slot to the client",
            "Re-sequence development tasks that do not depend on approvals",
        ],
        risk: "Medium: the launch date is at risk if approvals are not received within 7 days.",
    },
    CannedReport {
        summary: "Budget usage is at 85% while the project is 60% complete. Scope additions requested mid-project account for most of the overrun.",
        actions: [
            "Review scope changes with the client and agree on a change order",
            "Freeze non-essential feature work until budget is confirmed",
            "Update the forecast with the current burn rate",
        ],
        risk: "High: projected to exceed the budget by roughly 20% without intervention.",
    },
    CannedReport {
        summary: "All milestones to date have been met. The team has capacity to absorb the upcoming content migration ahead of schedule.",
        actions: [
            "Pull the content migration forward by one sprint",
            "Share the early-delivery opportunity with the client",
            "Book QA time for the migrated content",
        ],
        risk: "Low: no significant risks identified.",
    },
];

const CANNED_INSIGHTS: &[&str] = &[
    "Deliverables submitted on Mondays are approved 40% faster than those submitted late in the week.",
    "Two team members carry over half of the open tasks; consider rebalancing assignments.",
    "Client response time has doubled this month, which is the main driver of schedule slip.",
    "Projects with a kickoff checklist completed show 30% fewer revision rounds.",
    "Budget burn is tracking ahead of progress on design-heavy phases; plan extra buffer there.",
];

/// Report body as the model is asked to return it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ReportBody {
    pub summary: String,
    pub actions: Vec<String>,
    pub risk: String,
}

impl ReportBody {
    fn fallback() -> Self {
        Self {
            summary: FALLBACK_SUMMARY.to_string(),
            actions: FALLBACK_ACTIONS.iter().map(|a| a.to_string()).collect(),
            risk: FALLBACK_RISK.to_string(),
        }
    }

    /// Exactly [`REPORT_ACTIONS`] actions: extras are dropped, gaps are
    /// filled from the fallback list.
    fn normalized(mut self) -> Self {
        if self.summary.trim().is_empty() {
            self.summary = FALLBACK_SUMMARY.to_string();
        }
        if self.risk.trim().is_empty() {
            self.risk = FALLBACK_RISK.to_string();
        }
        self.actions.retain(|a| !a.trim().is_empty());
        self.actions.truncate(REPORT_ACTIONS);
        for fallback in FALLBACK_ACTIONS.iter().skip(self.actions.len()) {
            self.actions.push(fallback.to_string());
        }
        self
    }

    fn into_result(self, error: Option<String>) -> ReportResult {
        ReportResult {
            success: error.is_none(),
            summary: self.summary,
            actions: self.actions,
            risk: self.risk,
            error,
        }
    }
}

#[async_trait]
pub trait AiBackend: Send + Sync {
    async fn report(&self, project: &ProjectSnapshot) -> Result<ReportBody, ServiceError>;
    async fn insight(&self, project: &ProjectSnapshot) -> Result<String, ServiceError>;
}

/// Picks canned texts uniformly at random.
#[derive(Debug, Clone, Default)]
pub struct DemoAiBackend;

#[async_trait]
impl AiBackend for DemoAiBackend {
    async fn report(&self, project: &ProjectSnapshot) -> Result<ReportBody, ServiceError> {
        let canned = CANNED_REPORTS
            .choose(&mut rand::thread_rng())
            .ok_or(ServiceError::Missing("canned report"))?;
        tracing::info!("[demo] report for {}", project.name);
        Ok(ReportBody {
            summary: canned.summary.to_string(),
            actions: canned.actions.iter().map(|a| a.to_string()).collect(),
            risk: canned.risk.to_string(),
        })
    }

    async fn insight(&self, project: &ProjectSnapshot) -> Result<String, ServiceError> {
        let canned = CANNED_INSIGHTS
            .choose(&mut rand::thread_rng())
            .ok_or(ServiceError::Missing("canned insight"))?;
        tracing::info!("[demo] insight for {}", project.name);
        Ok(canned.to_string())
    }
}

/// Sends prompts to the server's completion proxy.
pub struct LiveAiBackend {
    transport: Arc<dyn Transport>,
    endpoint: String,
}

impl LiveAiBackend {
    pub fn new(transport: Arc<dyn Transport>, endpoint: String) -> Self {
        Self { transport, endpoint }
    }

    async fn complete(&self, request: &AiGenerateRequest) -> Result<String, ServiceError> {
        let req = HttpRequest::post_json(&self.endpoint, request)?;
        let resp: AiGenerateResponse = self.transport.send(req).await?.error_for_status()?.json()?;

        match resp {
            AiGenerateResponse {
                success: true,
                content: Some(content),
                ..
            } => Ok(content),
            AiGenerateResponse { error, .. } => Err(ServiceError::Rejected(
                error.unwrap_or_else(|| "completion returned no content".to_string()),
            )),
        }
    }
}

#[async_trait]
impl AiBackend for LiveAiBackend {
    async fn report(&self, project: &ProjectSnapshot) -> Result<ReportBody, ServiceError> {
        let content = self
            .complete(&AiGenerateRequest {
                prompt: report_prompt(project),
                system: Some(REPORT_SYSTEM_PROMPT.to_string()),
                max_tokens: Some(600),
            })
            .await?;
        parse_report(&content)
    }

    async fn insight(&self, project: &ProjectSnapshot) -> Result<String, ServiceError> {
        let content = self
            .complete(&AiGenerateRequest {
                prompt: insight_prompt(project),
                system: Some(INSIGHT_SYSTEM_PROMPT.to_string()),
                max_tokens: Some(200),
            })
            .await?;
        let insight = content.trim();
        if insight.is_empty() {
            return Err(ServiceError::Rejected("completion returned an empty insight".to_string()));
        }
        Ok(insight.to_string())
    }
}

#[derive(Clone)]
pub struct AiService {
    backend: Arc<dyn AiBackend>,
}

impl AiService {
    pub fn new(config: &ServicesConfig, transport: Arc<dyn Transport>) -> Self {
        let backend: Arc<dyn AiBackend> = match config.mode {
            RuntimeMode::Demo => Arc::new(DemoAiBackend),
            RuntimeMode::Live => {
                Arc::new(LiveAiBackend::new(transport, config.endpoint(AI_GENERATE_PATH)))
            }
        };
        Self::with_backend(backend)
    }

    pub fn with_backend(backend: Arc<dyn AiBackend>) -> Self {
        Self { backend }
    }

    pub async fn generate_report(&self, project: &ProjectSnapshot) -> ReportResult {
        match self.backend.report(project).await {
            Ok(body) => body.normalized().into_result(None),
            Err(e) => {
                tracing::warn!("Report generation failed for {}: {}", project.name, e);
                ReportBody::fallback().into_result(Some(e.to_string()))
            }
        }
    }

    pub async fn generate_insight(&self, project: &ProjectSnapshot) -> InsightResult {
        match self.backend.insight(project).await {
            Ok(insight) => InsightResult {
                success: true,
                insight,
                error: None,
            },
            Err(e) => {
                tracing::warn!("Insight generation failed for {}: {}", project.name, e);
                InsightResult {
                    success: false,
                    insight: FALLBACK_INSIGHT.to_string(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

fn describe_project(project: &ProjectSnapshot) -> String {
    let mut lines = vec![
        format!("Project: {}", project.name),
        format!("Status: {}", project.status),
        format!("Priority: {}", project.priority),
        format!("Progress: {}%", project.progress),
        format!(
            "Tasks: {} open, {} overdue",
            project.open_tasks, project.overdue_tasks
        ),
        format!("Team size: {}", project.team_size),
    ];
    match (project.budget, project.spent) {
        (Some(budget), Some(spent)) => {
            lines.push(format!("Budget: {:.2} spent of {:.2}", spent, budget))
        }
        (Some(budget), None) => lines.push(format!("Budget: {:.2}", budget)),
        _ => {}
    }
    if let Some(due) = project.due_date {
        lines.push(format!("Due date: {}", due.format("%Y-%m-%d")));
    }
    if let Some(notes) = project.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        lines.push(format!("Notes: {}", notes));
    }
    lines.join("\n")
}

/// Prompt asking for a status report on `project`.
pub fn report_prompt(project: &ProjectSnapshot) -> String {
    format!(
        "Write a short status report for the following project.\n\n{}\n\n\
         Give a two-sentence summary, exactly three recommended next actions, \
         and a one-line risk assessment starting with Low, Medium or High.",
        describe_project(project)
    )
}

/// Prompt asking for a single actionable insight on `project`.
pub fn insight_prompt(project: &ProjectSnapshot) -> String {
    format!(
        "Give one actionable insight for the manager of this project.\n\n{}",
        describe_project(project)
    )
}

/// Parse the model's JSON reply, tolerating a surrounding code fence.
pub fn parse_report(content: &str) -> Result<ReportBody, ServiceError> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    Ok(serde_json::from_str(unfenced.trim())?)
}
