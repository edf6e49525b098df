//! HTTP-backed `EnrichmentProvider` against the Anthropic Messages API,
//! forcing the structured extraction schema via a single tool call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::provider::{EnrichmentCallError, EnrichmentProvider, EnrichmentRequest};
use crate::schema::EnrichmentModelResponse;

const API_VERSION: &str = "2023-06-01";
const TOOL_NAME: &str = "submit_job_enrichment";

pub struct AnthropicEnrichmentProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicEnrichmentProvider {
    pub fn new(api_key: String, base_url: String, model: String, timeout_ms: u64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_millis(timeout_ms))
                .build()
                .unwrap_or_default(),
            api_key,
            base_url,
            model,
        }
    }

    fn response_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "ai_job_titles": {"type": "array", "items": {"type": "string"}},
                "ai_required_skills": {"type": "array", "items": {"type": "string"}},
                "ai_preferred_skills": {"type": "array", "items": {"type": "string"}},
                "ai_industry": {"type": "array", "items": {"type": "string"}},
                "ai_job_function": {"type": "string"},
                "ai_job_level": {"type": "array", "items": {"type": "string"}},
                "ai_city": {"type": "string"},
                "ai_state": {"type": "string"},
                "ai_country": {"type": "string"},
                "ai_work_arrangement": {"type": "string", "enum": ["remote", "hybrid", "on-site"]},
                "ai_remote_allowed": {"type": "boolean"},
                "ai_salary_min": {"type": ["integer", "null"]},
                "ai_salary_max": {"type": ["integer", "null"]},
                "ai_salary_currency": {"type": ["string", "null"]},
                "ai_years_experience_min": {"type": ["integer", "null"]},
                "ai_years_experience_max": {"type": ["integer", "null"]},
                "ai_summary": {"type": "string", "maxLength": 280}
            },
            "required": [
                "ai_job_titles", "ai_required_skills", "ai_preferred_skills", "ai_industry",
                "ai_job_function", "ai_job_level", "ai_city", "ai_state", "ai_country",
                "ai_work_arrangement", "ai_remote_allowed", "ai_summary"
            ]
        })
    }

    fn prompt(request: &EnrichmentRequest) -> String {
        let mut parts = Vec::new();
        if let Some(title) = &request.title_hint {
            parts.push(format!("Title hint: {title}"));
        }
        if let Some(company) = &request.company_hint {
            parts.push(format!("Company hint: {company}"));
        }
        parts.push(format!("Raw description:\n{}", request.description));
        if request.raw_payload != serde_json::Value::Null {
            parts.push(format!("Additional raw payload fields: {}", request.raw_payload));
        }
        parts.push(
            "Infer structured job attributes and call submit_job_enrichment with the result."
                .to_string(),
        );
        parts.join("\n\n")
    }
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<MessageIn>,
    tools: Vec<ToolSpec>,
    tool_choice: ToolChoice,
}

#[derive(Serialize)]
struct MessageIn {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ToolSpec {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Serialize)]
struct ToolChoice {
    #[serde(rename = "type")]
    kind: &'static str,
    name: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    ToolUse { input: serde_json::Value },
    #[serde(other)]
    Other,
}

#[async_trait]
impl EnrichmentProvider for AnthropicEnrichmentProvider {
    async fn enrich(
        &self,
        request: &EnrichmentRequest,
    ) -> Result<EnrichmentModelResponse, EnrichmentCallError> {
        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            messages: vec![MessageIn {
                role: "user",
                content: Self::prompt(request),
            }],
            tools: vec![ToolSpec {
                name: TOOL_NAME.to_string(),
                description: "Submit structured job posting enrichment.".to_string(),
                input_schema: Self::response_schema(),
            }],
            tool_choice: ToolChoice {
                kind: "tool",
                name: TOOL_NAME.to_string(),
            },
        };

        debug!(model = %self.model, "sending enrichment request to Anthropic");

        let url = format!("{}/v1/messages", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| EnrichmentCallError::Transient(e.to_string()))?;

        let status = resp.status();
        if status.is_server_error() || status.as_u16() == 429 {
            let text = resp.text().await.unwrap_or_default();
            warn!(%status, "transient enrichment provider error");
            return Err(EnrichmentCallError::Transient(format!("HTTP {status}: {text}")));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(EnrichmentCallError::SchemaViolation(format!(
                "HTTP {status}: {text}"
            )));
        }

        let parsed: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| EnrichmentCallError::Transient(e.to_string()))?;

        let tool_input = parsed
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::ToolUse { input } => Some(input),
                ContentBlock::Other => None,
            })
            .ok_or_else(|| {
                EnrichmentCallError::SchemaViolation("model did not call the enrichment tool".to_string())
            })?;

        serde_json::from_value(tool_input)
            .map_err(|e| EnrichmentCallError::SchemaViolation(e.to_string()))
    }
}
