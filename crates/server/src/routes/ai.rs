//! AI proxy: forwards prompts to an OpenAI-compatible chat completion API.

use axum::{extract::State, Json};
use nexaflow_services::{HttpRequest, ServiceError};
use serde::Deserialize;
use serde_json::json;
use shared::{AiGenerateRequest, AiGenerateResponse};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// POST /api/ai/generate
pub async fn generate(
    State(state): State<AppState>,
    Json(req): Json<AiGenerateRequest>,
) -> Json<AiGenerateResponse> {
    match complete(&state, &req).await {
        Ok(content) => Json(AiGenerateResponse::content(content)),
        Err(e) => {
            tracing::warn!(error = %e, "AI completion failed");
            Json(AiGenerateResponse::failed(e))
        }
    }
}

async fn complete(state: &AppState, req: &AiGenerateRequest) -> Result<String, ServiceError> {
    let config = &state.config.ai;
    let api_key = config
        .api_key
        .as_deref()
        .ok_or(ServiceError::Missing("AI API key"))?;

    let mut messages = Vec::new();
    if let Some(system) = &req.system {
        messages.push(json!({ "role": "system", "content": system }));
    }
    messages.push(json!({ "role": "user", "content": req.prompt }));

    let mut body = json!({
        "model": config.model,
        "messages": messages,
    });
    if let Some(max_tokens) = req.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }

    let url = format!("{}/chat/completions", config.api_url.trim_end_matches('/'));
    let request = HttpRequest::post(url).bearer(api_key).json(body);

    let resp = state.transport.send(request).await?.error_for_status()?;
    let completion: Completion = resp.json()?;

    tracing::debug!(model = %config.model, "AI completion received");

    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(ServiceError::Missing("completion content"))
}
