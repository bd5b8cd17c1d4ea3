//! Provider-switched chat calls with structured (schema-validated) output.
//!
//! The pipeline's LLM interactions all follow one pattern: send a system
//! and user prompt, require a JSON object back, and deserialize it into a
//! declared serde type. Schema-validation failure is treated identically
//! to a call failure — callers get an `Err` and apply their own fallback.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

/// Call the LLM and parse its reply into `T`.
///
/// The model is asked for a JSON object (Ollama `format: "json"`, OpenAI
/// `response_format: json_object`); anything that does not deserialize
/// into `T` is an error.
pub async fn call_structured<T: DeserializeOwned>(
    client: &reqwest::Client,
    config: &LlmConfig,
    system: &str,
    user: &str,
) -> Result<T> {
    let content = chat(client, config, system, user, true).await?;
    parse_structured(&content)
}

/// Plain chat completion. With `json_mode`, the provider is instructed to
/// emit a single JSON object.
pub async fn chat(
    client: &reqwest::Client,
    config: &LlmConfig,
    system: &str,
    user: &str,
    json_mode: bool,
) -> Result<String> {
    match config.provider.as_str() {
        "ollama" => call_ollama(client, config, system, user, json_mode).await,
        "openai" => call_openai(client, config, system, user, json_mode).await,
        other => anyhow::bail!("Unknown LLM provider: {other}"),
    }
}

/// Extract and deserialize the JSON object in `content`. Models sometimes
/// wrap the object in prose or a markdown fence even in JSON mode.
pub fn parse_structured<T: DeserializeOwned>(content: &str) -> Result<T> {
    if let Ok(value) = serde_json::from_str(content) {
        return Ok(value);
    }

    let start = content.find('{');
    let end = content.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            return serde_json::from_str(&content[start..=end])
                .context("LLM response did not match the declared schema");
        }
    }
    anyhow::bail!("LLM response contained no JSON object: {content}")
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

fn messages(system: &str, user: &str) -> Vec<Message> {
    vec![
        Message {
            role: "system".to_string(),
            content: system.to_string(),
        },
        Message {
            role: "user".to_string(),
            content: user.to_string(),
        },
    ]
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Message,
}

async fn call_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    system: &str,
    user: &str,
    json_mode: bool,
) -> Result<String> {
    let url = format!("{}/api/chat", config.base_url);

    let req = OllamaChatRequest {
        model: config.chat_model.clone(),
        messages: messages(system, user),
        stream: false,
        format: json_mode.then(|| "json".to_string()),
    };

    let resp = client
        .post(&url)
        .json(&req)
        .send()
        .await
        .context("Failed to call Ollama chat API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Ollama chat API returned {status}: {body}");
    }

    let body: OllamaChatResponse = resp.json().await?;
    Ok(body.message.content)
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: String,
}

async fn call_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    system: &str,
    user: &str,
    json_mode: bool,
) -> Result<String> {
    let url = format!("{}/v1/chat/completions", config.base_url);
    let api_key = config.api_key.as_deref().unwrap_or_default();

    let req = OpenAiChatRequest {
        model: config.chat_model.clone(),
        messages: messages(system, user),
        temperature: 0.3,
        response_format: json_mode.then(|| ResponseFormat {
            kind: "json_object".to_string(),
        }),
    };

    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&req)
        .send()
        .await
        .context("Failed to call OpenAI chat API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("OpenAI chat API returned {status}: {body}");
    }

    let body: OpenAiChatResponse = resp.json().await?;
    Ok(body
        .choices
        .first()
        .map(|c| c.message.content.clone())
        .unwrap_or_default())
}
